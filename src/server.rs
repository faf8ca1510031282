use std::{future::Future, ops::Deref, sync::Arc, time::Duration};

use axum::{routing, Router};
use error_stack::{Report, ResultExt};
use futures::FutureExt;
use sqlx::SqlitePool;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{event, Level};

use crate::Error;

/// Shared state available to every request handler
pub struct ServerStateInner {
    /// The database connection pool, for reads
    pub db: SqlitePool,
    /// A single-connection pool that every write transaction goes through
    pub db_writer: SqlitePool,
    /// How long a login session lasts
    pub session_expiry: chrono::Duration,
}

#[derive(Clone)]
pub struct ServerState(Arc<ServerStateInner>);

impl Deref for ServerState {
    type Target = ServerStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Configuration for the server
pub struct Config {
    /// The environment we're running in. This is only reported in the logs.
    pub env: String,
    /// The host to bind to
    pub host: String,
    /// The port to bind to. Use 0 to pick a random port.
    pub port: u16,
    /// The request timeout
    pub request_timeout: Duration,
    /// The database connection pool
    pub db: SqlitePool,
    /// How long a login session lasts
    pub session_expiry: chrono::Duration,
}

/// A bound server, ready to run
pub struct Server {
    /// The host the server is listening on
    pub host: String,
    /// The port the server is listening on
    pub port: u16,
    /// The state shared with the request handlers
    pub state: ServerState,
    app: Router,
    listener: TcpListener,
}

impl Server {
    /// Run the server until SIGINT or SIGTERM is received
    pub async fn run(self) -> Result<(), Report<Error>> {
        self.run_with_shutdown_signal(shutdown_signal()).await
    }

    /// Run the server until the `shutdown` future resolves
    pub async fn run_with_shutdown_signal(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Report<Error>> {
        event!(Level::INFO, host = %self.host, port = %self.port, "Starting server");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .change_context(Error::Shutdown)?;

        event!(Level::INFO, "Server shut down");
        Ok(())
    }
}

pub async fn create_server(config: Config) -> Result<Server, Report<Error>> {
    event!(Level::INFO, env = %config.env, "Configuring server");

    let db_writer = crate::db::writer_pool(&config.db).await?;
    let state = ServerState(Arc::new(ServerStateInner {
        db: config.db,
        db_writer,
        session_expiry: config.session_expiry,
    }));

    let app = Router::new()
        .route("/healthz", routing::get(|| async { "OK" }))
        .nest("/api/v1", crate::models::create_routes())
        .with_state(state.clone())
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(TimeoutLayer::new(config.request_timeout)),
        );

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .change_context(Error::ServerStart)
        .attach_printable_lazy(|| format!("Binding to {}:{}", config.host, config.port))?;
    let port = listener
        .local_addr()
        .change_context(Error::ServerStart)?
        .port();

    Ok(Server {
        host: config.host,
        port,
        state,
        app,
        listener,
    })
}

/// Create a future which will resolve when receiving SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::task::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                event!(Level::ERROR, error = %e, "Failed to listen for ctrl+c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut s) => {
                    s.recv().await;
                }
                Err(e) => {
                    event!(Level::ERROR, error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        shutdown_tx.send(()).ok();
    });

    shutdown_rx.map(|_| ()).await
}
