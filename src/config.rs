use anyhow::{Result, anyhow};
use chrono::Duration;
use chrono_tz::Tz;
use std::env;

const DEFAULT_JWT_SECRET: &str = "change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub http_addr: String,
    pub app_tz: String,
    pub database: DatabaseConfig,
    pub cors_allow_origins: Vec<String>,
    pub auth: AuthConfig,
    pub leave_scheduler_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub params: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub cookie_secure: bool,
    pub cookie_same_site: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    pub fn from_env_only() -> Result<Self> {
        let config = Config {
            environment: var_or("ENV", "development"),
            http_addr: var_or("HTTP_ADDR", ":8080"),
            app_tz: var_or("APP_TZ", "Asia/Ho_Chi_Minh"),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
                host: var_or("DB_HOST", "127.0.0.1"),
                port: var_or("DB_PORT", "5432").parse().unwrap_or(5432),
                user: var_or("DB_USER", "postgres"),
                password: var_or("DB_PASSWORD", ""),
                name: var_or("DB_NAME", "time_attendance"),
                params: var_or("DB_PARAMS", ""),
            },
            cors_allow_origins: var_or("CORS_ALLOW_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            auth: AuthConfig {
                jwt_secret: var_or("AUTH_JWT_SECRET", DEFAULT_JWT_SECRET),
                access_token_ttl: parse_duration(&var_or("AUTH_ACCESS_TOKEN_TTL", "15m"))
                    .unwrap_or_else(|| Duration::minutes(15)),
                refresh_token_ttl: parse_duration(&var_or("AUTH_REFRESH_TOKEN_TTL", "168h"))
                    .unwrap_or_else(|| Duration::hours(168)),
                cookie_secure: parse_bool(&var_or("AUTH_COOKIE_SECURE", "false")),
                cookie_same_site: var_or("AUTH_COOKIE_SAME_SITE", "Lax"),
            },
            leave_scheduler_enabled: parse_bool(&var_or("LEAVE_SCHEDULER_ENABLED", "true")),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.business_zone()?;

        if self.is_production() && self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(anyhow!("AUTH_JWT_SECRET must be set in production"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn business_zone(&self) -> Result<Tz> {
        self.app_tz
            .parse::<Tz>()
            .map_err(|_| anyhow!("Unknown APP_TZ zone: {}", self.app_tz))
    }

    /// `:8080` binds every interface.
    pub fn server_address(&self) -> String {
        match self.http_addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => self.http_addr.clone(),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database.url {
            return url.clone();
        }

        let db = &self.database;
        let credentials = if db.password.is_empty() {
            db.user.clone()
        } else {
            format!("{}:{}", db.user, db.password)
        };
        let mut url = format!(
            "postgres://{}@{}:{}/{}",
            credentials, db.host, db.port, db.name
        );
        if !db.params.is_empty() {
            url.push('?');
            url.push_str(db.params.trim_start_matches('?'));
        }
        url
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parses `90s`, `15m`, `168h` and combinations such as `1h30m`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let amount: i64 = digits.parse().ok()?;
        digits.clear();
        total += match ch {
            'h' => Duration::hours(amount),
            'm' => Duration::minutes(amount),
            's' => Duration::seconds(amount),
            _ => return None,
        };
    }

    if !digits.is_empty() {
        return None;
    }
    Some(total)
}
