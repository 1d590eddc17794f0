use blog_server::auth::RedisKeyValueStore;
use blog_server::configuration::get_configuration;
use blog_server::startup::{run, AppContext};
use blog_server::telemetry::init_telemetry;
use blog_server::users::PgUserDirectory;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let store = RedisKeyValueStore::connect(&configuration.redis.url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Redis connection error")
        })?;
    tracing::info!("Refresh token store connected");

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let context = AppContext::new(
        &configuration,
        Arc::new(PgUserDirectory::new(pool)),
        Arc::new(store),
    );

    run(listener, context)?.await
}
