use std::env;
use std::path::PathBuf;

use anyhow::{Context, bail};

use libris_api::AuthConfig;

const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Process settings, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("LIBRIS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LIBRIS_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let access_minutes: i64 = parse_var("LIBRIS_ACCESS_TOKEN_MINUTES", "30")?;
        let refresh_days: i64 = parse_var("LIBRIS_REFRESH_TOKEN_DAYS", "7")?;
        if access_minutes <= 0 || refresh_days <= 0 {
            bail!("token lifetimes must be positive");
        }

        Ok(Self {
            db_path: PathBuf::from(env::var("LIBRIS_DB_PATH").unwrap_or_else(|_| "libris.db".into())),
            host: env::var("LIBRIS_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("LIBRIS_PORT", "8000")?,
            auth: AuthConfig::new(jwt_secret, access_minutes, refresh_days),
        })
    }
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse()
        .with_context(|| format!("{name} is not a valid value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variables_fall_back_to_default() {
        let port: u16 = parse_var("LIBRIS_TEST_UNSET_PORT", "8000").unwrap();
        assert_eq!(port, 8000);
    }

    #[test]
    fn unparsable_default_reports_variable_name() {
        let err = parse_var::<u16>("LIBRIS_TEST_UNSET_PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("LIBRIS_TEST_UNSET_PORT"));
    }
}
