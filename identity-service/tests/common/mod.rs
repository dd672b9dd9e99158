use std::sync::Arc;
use std::time::Duration;

use auth::Argon2Hasher;
use auth::JwtIssuer;
use identity_service::identity::service::AuthService;
use identity_service::inbound::http::router::create_router;
use identity_service::repositories::InMemoryIdentityRepository;
use serde_json::json;

pub const TEST_JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const TEST_ISSUER: &str = "identity-service-test";

/// Test application that spawns a real server backed by the in-memory store
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub token_issuer: Arc<JwtIssuer>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryIdentityRepository::new());
        let password_hasher = Arc::new(Argon2Hasher::new());
        let token_issuer = Arc::new(
            JwtIssuer::new(TEST_JWT_SECRET, TEST_ISSUER, chrono::Duration::hours(24))
                .expect("Failed to create token issuer"),
        );

        let auth_service = Arc::new(AuthService::new(
            repository,
            password_hasher,
            Arc::clone(&token_issuer),
        ));

        let router = create_router(auth_service, Duration::from_secs(30));

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            token_issuer,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register an identity through the API
    pub async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/register")
            .json(&json!({
                "username": username,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in through the API
    pub async fn login(&self, username_or_email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({
                "usernameOrEmail": username_or_email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in and return the access token, panicking if login fails
    pub async fn access_token(&self, username_or_email: &str, password: &str) -> String {
        let response = self.login(username_or_email, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["accessToken"]
            .as_str()
            .expect("Missing accessToken")
            .to_string()
    }
}
