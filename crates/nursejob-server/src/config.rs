use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Read `NURSEJOB_*` variables, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("NURSEJOB_JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.into());
        let db_path = lookup("NURSEJOB_DB_PATH").unwrap_or_else(|| "nursejob.db".into());
        let host = lookup("NURSEJOB_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("NURSEJOB_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NURSEJOB_PORT must be a port number")?;

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(db_path),
            host,
            port,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.uses_dev_secret());
        assert_eq!(config.db_path, PathBuf::from("nursejob.db"));
        assert_eq!(config.addr().unwrap().port(), 3000);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("NURSEJOB_JWT_SECRET", "s3cret"),
            ("NURSEJOB_HOST", "127.0.0.1"),
            ("NURSEJOB_PORT", "8080"),
        ]))
        .unwrap();
        assert!(!config.uses_dev_secret());
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("NURSEJOB_PORT", "eighty")])).is_err());
    }
}
