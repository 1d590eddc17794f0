#![allow(dead_code)]

use blog_server::auth::{AccessTokenIssuer, InMemoryKeyValueStore};
use blog_server::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, PasswordSettings, RedisSettings,
    RefreshTokenSettings, Settings,
};
use blog_server::domain::UserRole;
use blog_server::startup::{run, AppContext};
use blog_server::users::{InMemoryUserDirectory, UserDirectory};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub users: Arc<InMemoryUserDirectory>,
    pub store: Arc<InMemoryKeyValueStore>,
    pub client: reqwest::Client,
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_settings() -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "blog".to_string(),
        },
        redis: RedisSettings {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "test".to_string(),
        },
        jwt: JwtSettings {
            secret: "integration-test-secret-with-enough-length".to_string(),
            issuer: "blog-server".to_string(),
            audience: "blog-clients".to_string(),
            access_token_minutes: 15,
            clock_skew_seconds: 30,
        },
        refresh_tokens: RefreshTokenSettings { expiration_days: 14 },
        password: PasswordSettings { bcrypt_cost: 4 },
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let users = Arc::new(InMemoryUserDirectory::new());
    let store = Arc::new(InMemoryKeyValueStore::new());
    let context = AppContext::new(&test_settings(), users.clone(), store.clone());

    let server = run(listener, context).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        users,
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn signup(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/signup", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn signin(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/signin", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refreshToken": refresh_token }))
            .await
    }

    /// Sign up and return the issued pair.
    pub async fn signup_pair(&self, email: &str) -> TokenPair {
        let response = self.signup(email, "password1").await;
        assert_eq!(200, response.status().as_u16());
        token_pair(response).await
    }

    /// Sign up, promote the account directly in the directory, and sign in
    /// again so the access token carries `role`.
    pub async fn signup_with_role(&self, email: &str, role: UserRole) -> TokenPair {
        self.signup_pair(email).await;
        let mut user = self
            .users
            .get_by_email(email)
            .await
            .unwrap()
            .expect("user exists");
        user.change_role(role);
        self.users.save(&user).await.unwrap();

        let response = self.signin(email, "password1").await;
        assert_eq!(200, response.status().as_u16());
        token_pair(response).await
    }

    /// A correctly signed access token for `email` that expired an hour ago.
    pub async fn expired_access_token(&self, email: &str) -> String {
        let user = self
            .users
            .get_by_email(email)
            .await
            .unwrap()
            .expect("user exists");
        let issued_at = chrono::Utc::now() - chrono::Duration::minutes(75);
        AccessTokenIssuer::new(&test_settings().jwt)
            .issue_at(&user, issued_at)
            .unwrap()
            .token
    }
}

pub async fn token_pair(response: reqwest::Response) -> TokenPair {
    let body: Value = response.json().await.expect("Failed to parse response");
    TokenPair {
        access_token: body["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
    }
}
