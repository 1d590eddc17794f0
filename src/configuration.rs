use config::ConfigError;

/// Upper bound for the verifier's clock-skew tolerance.
pub const MAX_CLOCK_SKEW_SECONDS: u64 = 30;
/// Access tokens live at most one day.
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 24 * 60;
/// Refresh tokens live at most one year.
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub refresh_tokens: RefreshTokenSettings,
    #[serde(default)]
    pub password: PasswordSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

/// Access token signing and verification settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_minutes: i64,
    #[serde(default = "default_clock_skew")]
    pub clock_skew_seconds: u64,
}

impl JwtSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ACCESS_TOKEN_MINUTES).contains(&self.access_token_minutes) {
            return Err(ConfigError::Message(format!(
                "jwt.access_token_minutes must be between 1 and {}, got {}",
                MAX_ACCESS_TOKEN_MINUTES, self.access_token_minutes
            )));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::Message("jwt.secret must not be empty".to_string()));
        }
        Ok(())
    }

    /// Skew tolerance actually applied by the verifier.
    pub fn effective_clock_skew(&self) -> u64 {
        self.clock_skew_seconds.min(MAX_CLOCK_SKEW_SECONDS)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct RefreshTokenSettings {
    pub expiration_days: i64,
}

impl RefreshTokenSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&self.expiration_days) {
            return Err(ConfigError::Message(format!(
                "refresh_tokens.expiration_days must be between 1 and {}, got {}",
                MAX_REFRESH_TOKEN_DAYS, self.expiration_days
            )));
        }
        Ok(())
    }
}

impl Default for RefreshTokenSettings {
    fn default() -> Self {
        Self { expiration_days: 14 }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    pub bcrypt_cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

fn default_key_prefix() -> String {
    "v1".to_string()
}

fn default_clock_skew() -> u64 {
    MAX_CLOCK_SKEW_SECONDS
}

/// Load settings from the optional `configuration` file, then apply
/// `APP__SECTION__KEY` environment overrides on top.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Reject token lifetimes that would issue already-expired tokens or
    /// overflow date arithmetic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        self.refresh_tokens.validate()
    }
}
