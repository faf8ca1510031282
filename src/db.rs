use std::{str::FromStr, time::Duration};

use clap::{Args, Subcommand};
use error_stack::{Report, ResultExt};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use tracing::{event, Level};

use crate::{auth::sessions, models::post, Error};

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a connection pool, creating the database file if it does not exist yet.
///
/// This pool is for reads. Transactions that write should come from [writer_pool], since SQLite
/// can not upgrade a deferred transaction's read lock to a write lock while another
/// connection is writing.
pub async fn connect(database_url: &str) -> Result<SqlitePool, Report<Error>> {
    let options = SqliteConnectOptions::from_str(database_url)
        .change_context(Error::Db)
        .attach_printable_lazy(|| format!("Parsing database URL {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .change_context(Error::Db)
}

/// Create a single-connection pool on the same database as `db`. All write transactions go
/// through this pool, so they run one at a time and never contend for the write lock.
pub async fn writer_pool(db: &SqlitePool) -> Result<SqlitePool, Report<Error>> {
    let options = (*db.connect_options())
        .clone()
        .busy_timeout(BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .change_context(Error::Db)
}

pub async fn run_migrations(db: &SqlitePool) -> Result<(), Report<Error>> {
    sqlx::migrate!().run(db).await.change_context(Error::Db)
}

/// Run migrations and clear out stale data. This runs at server startup.
pub async fn prepare(db: &SqlitePool) -> Result<(), Report<Error>> {
    run_migrations(db).await?;

    let expired = sessions::delete_expired_sessions(db)
        .await
        .change_context(Error::Db)?;
    event!(Level::INFO, %expired, "Removed expired sessions");
    Ok(())
}

#[derive(Args, Debug)]
pub struct DbCommand {
    /// The SQLite database to connect to
    #[clap(long = "db", env = "DATABASE_URL")]
    database_url: String,

    #[clap(subcommand)]
    pub command: DbSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum DbSubcommand {
    /// Update the database with the latest migrations
    Migrate,
    /// Delete every post, along with all comments and likes
    DeleteAllPosts,
}

impl DbCommand {
    pub async fn handle(self) -> Result<(), Report<Error>> {
        let pool = connect(&self.database_url).await?;

        match self.command {
            DbSubcommand::Migrate => run_migrations(&pool).await?,
            DbSubcommand::DeleteAllPosts => {
                let writer = writer_pool(&pool).await?;
                let mut tx = writer.begin().await.change_context(Error::Db)?;
                let count = post::queries::delete_all(&mut *tx).await?;
                tx.commit().await.change_context(Error::Db)?;
                event!(Level::INFO, %count, "Deleted posts");
            }
        }

        Ok(())
    }
}
