use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use nutrisaur_db::resolve_db_path;

/// Session secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-here",
];

const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// First-run admin account, created only when both variables are set.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub session_ttl: chrono::Duration,
    pub admin: Option<AdminBootstrap>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_secret = lookup("NUTRISAUR_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("NUTRISAUR_SESSION_SECRET is unset or still a placeholder");
        }

        let host = lookup("NUTRISAUR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("NUTRISAUR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NUTRISAUR_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("NUTRISAUR_HOST must be an IP address")?;

        let ttl_hours: i64 = match lookup("NUTRISAUR_SESSION_TTL_HOURS") {
            Some(raw) => raw
                .parse()
                .context("NUTRISAUR_SESSION_TTL_HOURS must be a whole number")?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };
        if ttl_hours <= 0 {
            bail!("NUTRISAUR_SESSION_TTL_HOURS must be positive");
        }

        let db_path = resolve_db_path(
            lookup("NUTRISAUR_DB_PATH").as_deref(),
            lookup("MYSQL_PUBLIC_URL").as_deref(),
        )?;

        let admin = match (
            lookup("NUTRISAUR_ADMIN_EMAIL"),
            lookup("NUTRISAUR_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap {
                    username: lookup("NUTRISAUR_ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
                    email,
                    password,
                })
            }
            _ => None,
        };

        Ok(Self {
            addr,
            db_path,
            session_secret,
            session_ttl: chrono::Duration::hours(ttl_hours),
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[("NUTRISAUR_SESSION_SECRET", "s3cret-value")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("nutrisaur.db"));
        assert_eq!(config.session_ttl, chrono::Duration::hours(24));
        assert!(config.admin.is_none());
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("NUTRISAUR_SESSION_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn connection_url_names_the_store() {
        let config = config(&[
            ("NUTRISAUR_SESSION_SECRET", "s3cret-value"),
            ("MYSQL_PUBLIC_URL", "mysql://root:pw@db.internal:3306/railway"),
        ])
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("railway.db"));
    }

    #[test]
    fn admin_bootstrap_needs_email_and_password() {
        let partial = config(&[
            ("NUTRISAUR_SESSION_SECRET", "s3cret-value"),
            ("NUTRISAUR_ADMIN_EMAIL", "chief@example.com"),
        ])
        .unwrap();
        assert!(partial.admin.is_none());

        let full = config(&[
            ("NUTRISAUR_SESSION_SECRET", "s3cret-value"),
            ("NUTRISAUR_ADMIN_EMAIL", "chief@example.com"),
            ("NUTRISAUR_ADMIN_PASSWORD", "secret123"),
        ])
        .unwrap();
        let admin = full.admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.email, "chief@example.com");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("NUTRISAUR_SESSION_SECRET", "x1"), ("NUTRISAUR_PORT", "http")]).is_err());
    }
}
