use clap::{Args, Parser, Subcommand};
use error_stack::{Report, ResultExt};
use sns_server::{db, server, tracing_config::configure_tracing, Error};
use tracing::{event, Level};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),
    /// Database maintenance
    Db(db::DbCommand),
}

#[derive(Args, Debug)]
struct ServeCommand {
    /// The SQLite database to connect to
    #[clap(long = "db", env = "DATABASE_URL")]
    database_url: String,

    /// The IP host to bind to
    #[clap(long, env = "HOST", default_value_t = String::from("127.0.0.1"))]
    host: String,

    /// The TCP port to listen on
    #[clap(long, env = "PORT", default_value_t = 7823)]
    port: u16,

    /// The environment in which this server is running
    #[clap(long = "env", env = "ENV", default_value_t = String::from("development"))]
    env: String,

    /// Request timeout, in seconds
    #[clap(long, env = "REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// How long a login session lasts, in seconds
    #[clap(long, env = "SESSION_EXPIRY", default_value_t = 30 * 24 * 60 * 60)]
    session_expiry: i64,
}

async fn serve(cmd: ServeCommand) -> Result<(), Report<Error>> {
    let pool = db::connect(&cmd.database_url).await?;
    db::prepare(&pool).await?;

    let server = server::create_server(server::Config {
        env: cmd.env,
        host: cmd.host,
        port: cmd.port,
        request_timeout: std::time::Duration::from_secs(cmd.request_timeout),
        db: pool.clone(),
        session_expiry: chrono::Duration::seconds(cmd.session_expiry),
    })
    .await?;

    server.run().await?;

    event!(Level::INFO, "Closing database connections");
    pool.close().await;

    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
pub async fn main() -> Result<(), Report<Error>> {
    dotenvy::dotenv().ok();
    configure_tracing(
        "",
        tracing_subscriber::fmt::time::ChronoUtc::rfc_3339(),
        std::io::stdout,
    )
    .change_context(Error::ServerStart)?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => serve(cmd).await,
        Command::Db(cmd) => cmd.handle().await,
    }
}
