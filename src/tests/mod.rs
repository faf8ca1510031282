use async_trait::async_trait;
use error_stack::Report;
use futures::FutureExt;
use reqwest::header::HeaderMap;
use sqlx::SqlitePool;
use tracing::{event, Level};

use crate::{
    auth::sessions,
    models::{
        post::testing::make_user,
        user::{User, UserId},
    },
    Error,
};

/// A password to use by default for users in unit tests.
pub const TEST_PASSWORD: &str = "the-password";
/// A hash created from [TEST_PASSWORD]
pub const TEST_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$7Pdxrl3fSrSIelBARWvE5g$0D8uG+7ezAU7CWbIZZ+IbrL3QrEXNZOAI4oYM5mWijk";

/// An HTTP client set up for ease of use in tests. It takes a base URL when constructed and
/// makes all requests relative to that base.
#[derive(Clone, Debug)]
pub struct TestClient {
    /// The base URL prepended to all requests
    pub base: String,
    /// The HTTP client actually used to make requests
    pub client: reqwest::Client,
}

impl TestClient {
    pub fn new(base: impl Into<String>) -> TestClient {
        TestClient {
            base: base.into(),
            client: new_client_builder().build().expect("Building client"),
        }
    }

    /// Create a new TestClient from this one that passes the given session token
    /// as a Bearer token.
    pub fn with_token(&self, token: &str) -> TestClient {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );

        TestClient {
            base: self.base.clone(),
            client: new_client_builder()
                .default_headers(headers)
                .build()
                .expect("Building client"),
        }
    }

    pub fn get(&self, url: impl AsRef<str>) -> reqwest::RequestBuilder {
        self.client.get(format!("{}/{}", self.base, url.as_ref()))
    }

    pub fn post(&self, url: impl AsRef<str>) -> reqwest::RequestBuilder {
        self.client.post(format!("{}/{}", self.base, url.as_ref()))
    }

    pub fn put(&self, url: impl AsRef<str>) -> reqwest::RequestBuilder {
        self.client.put(format!("{}/{}", self.base, url.as_ref()))
    }

    pub fn delete(&self, url: impl AsRef<str>) -> reqwest::RequestBuilder {
        self.client.delete(format!("{}/{}", self.base, url.as_ref()))
    }
}

fn new_client_builder() -> reqwest::ClientBuilder {
    reqwest::ClientBuilder::new().timeout(std::time::Duration::from_secs(30))
}

/// Extensions for reqwest::Response
#[async_trait]
pub trait ResponseExt {
    /// If the response is an error, log it. This can be used in place of `error_for_status`.
    async fn log_error(self) -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl ResponseExt for reqwest::Response {
    async fn log_error(self) -> Result<reqwest::Response, reqwest::Error> {
        if let Err(e) = self.error_for_status_ref() {
            let status = self.status().as_u16();
            let url = self.url().clone();
            let text = self.text().await.unwrap_or_default();
            event!(Level::ERROR, url=%url, %status, response=text);
            Err(e)
        } else {
            Ok(self)
        }
    }
}

/// A user with a live session
pub struct TestUser {
    pub user_id: UserId,
    pub user_name: String,
    pub token: String,
    /// A client which sends this user's session token
    pub client: TestClient,
}

pub struct TestApp {
    /// Hold on to the shutdown signal so the server stays alive
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    /// A client with no credentials
    pub client: TestClient,
    /// The server root, without the API prefix
    pub base_url: String,
    /// Owns most of the posts in tests
    pub alice: TestUser,
    /// Interacts with alice's posts
    pub bob: TestUser,
    pub pool: SqlitePool,
    pub server_task: tokio::task::JoinHandle<Result<(), Report<Error>>>,
}

impl TestApp {
    /// Stop the server and wait for it to finish.
    pub async fn shutdown(self) -> Result<(), Report<Error>> {
        self.shutdown_tx.send(()).ok();
        self.server_task.await.expect("server task panicked")
    }
}

async fn bootstrap_user(pool: &SqlitePool, client: &TestClient, user_name: &str) -> TestUser {
    let user: User = make_user(pool, user_name).await;
    let token = sessions::create_session(pool, user.id, chrono::Duration::hours(1))
        .await
        .expect("Creating session");

    TestUser {
        user_id: user.id,
        user_name: user.user_name,
        client: client.with_token(&token),
        token,
    }
}

pub async fn start_app(pool: SqlitePool) -> TestApp {
    crate::tracing_config::test::init();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    // Make the shutdown future resolve to () so the type matches what Axum expects.
    let shutdown_rx = shutdown_rx.map(|_| ());

    let config = crate::server::Config {
        env: "test".into(),
        host: "127.0.0.1".into(),
        // Bind to a random port
        port: 0,
        request_timeout: std::time::Duration::from_secs(30),
        db: pool.clone(),
        session_expiry: chrono::Duration::hours(1),
    };

    let server = crate::server::create_server(config)
        .await
        .expect("creating server");

    let base_url = format!("http://{}:{}", server.host, server.port);
    let client = TestClient::new(format!("{base_url}/api/v1"));

    let alice = bootstrap_user(&pool, &client, "alice").await;
    let bob = bootstrap_user(&pool, &client, "bob").await;

    let server_task = tokio::task::spawn(server.run_with_shutdown_signal(shutdown_rx));

    TestApp {
        shutdown_tx,
        client,
        base_url,
        alice,
        bob,
        pool,
        server_task,
    }
}
