use crate::error::AppError;
use std::env;
use tracing::warn;

const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://portfolio.db";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_RESUME_PATH: &str = "static/resume.pdf";

/// Runtime configuration, read once at startup.
///
/// | Variable         | Fallback                  |
/// |------------------|---------------------------|
/// | `SERVER_ADDRESS` | `0.0.0.0:8080`            |
/// | `DATABASE_URL`   | `sqlite://portfolio.db`   |
/// | `PUBLIC_BASE_URL`| `http://localhost:8080`   |
/// | `ADMIN_USERNAME` | `admin` (dev only)        |
/// | `ADMIN_PASSWORD` | `admin123` (dev only)     |
/// | `SMTP_HOST`      | `smtp.gmail.com`          |
/// | `SMTP_PORT`      | `587`                     |
/// | `SMTP_USER`      | none, mail fails fast     |
/// | `SMTP_PASS`      | none, mail fails fast     |
/// | `TO_EMAIL`       | `SMTP_USER`               |
/// | `RESUME_PATH`    | `static/resume.pdf`       |
/// | `EPHEMERAL_LINKS`| `false`                   |
#[derive(Clone)]
pub struct AppConfig {
    pub server_address: String,
    pub database_url: String,
    pub public_base_url: String,
    pub admin_username: String,
    pub admin_password: String,
    pub resume_path: String,
    /// Keep short links in memory instead of SQLite. They vanish on
    /// restart; visitor records stay persistent either way.
    pub ephemeral_links: bool,
    pub mail: MailConfig,
}

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub to_email: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server_address: env_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            public_base_url: env_or("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL),
            admin_username: credential_or("ADMIN_USERNAME", DEFAULT_ADMIN_USERNAME),
            admin_password: credential_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            resume_path: env_or("RESUME_PATH", DEFAULT_RESUME_PATH),
            ephemeral_links: env_flag("EPHEMERAL_LINKS"),
            mail: MailConfig::from_env(),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.into(),
            database_url: "sqlite::memory:".into(),
            public_base_url: "http://short.test".into(),
            admin_username: "admin".into(),
            admin_password: "hunter2".into(),
            resume_path: DEFAULT_RESUME_PATH.into(),
            ephemeral_links: false,
            mail: MailConfig {
                smtp_host: DEFAULT_SMTP_HOST.into(),
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_user: None,
                smtp_pass: None,
                to_email: None,
            },
        }
    }
}

impl MailConfig {
    fn from_env() -> Self {
        Self {
            smtp_host: env_or("SMTP_HOST", DEFAULT_SMTP_HOST),
            smtp_port: env_port("SMTP_PORT", DEFAULT_SMTP_PORT),
            smtp_user: env_opt("SMTP_USER"),
            smtp_pass: env_opt("SMTP_PASS"),
            to_email: env_opt("TO_EMAIL"),
        }
    }

    /// SMTP credentials, or a configuration error when they are absent.
    /// Missing credentials must surface as an error, never as a silently
    /// dropped message.
    pub fn credentials(&self) -> Result<(&str, &str), AppError> {
        match (&self.smtp_user, &self.smtp_pass) {
            (Some(user), Some(pass)) => Ok((user, pass)),
            _ => Err(AppError::Configuration(
                "SMTP_USER and SMTP_PASS must be set to send contact mail".into(),
            )),
        }
    }

    /// Recipient address; falls back to sending to the SMTP account itself.
    pub fn recipient(&self) -> Result<&str, AppError> {
        self.to_email
            .as_deref()
            .or(self.smtp_user.as_deref())
            .ok_or_else(|| {
                AppError::Configuration("TO_EMAIL or SMTP_USER must be set to send contact mail".into())
            })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn env_port(name: &str, default: u16) -> u16 {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("invalid {name} value {value:?}, falling back to {default}");
            default
        }),
        Err(_) => default,
    }
}

fn credential_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{name} not set, using the development default");
        default.to_string()
    })
}
