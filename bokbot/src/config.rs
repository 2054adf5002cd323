//! Environment-sourced configuration.
//!
//! Every required value is validated up front so a misconfigured process dies
//! at startup with a diagnostic instead of failing mid-session.

use std::env;

use url::Url;

use crate::error::{Error, Result};

/// Redirect bound applied when `MAX_REDIRECTS` is not set.
const DEFAULT_MAX_REDIRECTS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// Entry point of the login redirect chain.
    pub auth_url: Url,
    /// Host (with port, if any) the login chain must land on.
    pub homepage_host: String,
    /// Path the login chain must land on.
    pub homepage_path: String,
    /// Path of the command endpoint (book, unbook, listBookings).
    pub command_path: String,
    /// Account name sent as the only login parameter.
    pub username: String,
    /// Upper bound on followed redirects, login and ordinary alike.
    pub max_redirects: u64,
}

impl Config {
    /// Read and validate the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let auth_url = required("AUTH_URL")?;
        let auth_url = Url::parse(&auth_url)
            .map_err(|e| Error::Config(format!("AUTH_URL is not a valid URL: {e}")))?;

        let max_redirects = match env::var("MAX_REDIRECTS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .map(i64::unsigned_abs)
                .map_err(|_| {
                    Error::Config(format!("MAX_REDIRECTS must be an integer, got {raw:?}"))
                })?,
            Err(_) => DEFAULT_MAX_REDIRECTS,
        };

        let config = Self {
            auth_url,
            homepage_host: required("HOMEPAGE_HOST")?,
            homepage_path: required("HOMEPAGE_PATH")?,
            command_path: required("COMMAND_PATH")?,
            username: required("USERNAME")?,
            max_redirects,
        };
        config.homepage_url()?;
        config.command_url()?;
        Ok(config)
    }

    /// The homepage as an absolute URL.
    pub fn homepage_url(&self) -> Result<Url> {
        self.host_url(&self.homepage_path)
    }

    /// The command endpoint as an absolute URL.
    pub fn command_url(&self) -> Result<Url> {
        self.host_url(&self.command_path)
    }

    fn host_url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("https://{}{}", self.homepage_host, path)).map_err(|e| {
            Error::Config(format!(
                "HOMEPAGE_HOST {:?} and path {path:?} do not form a valid URL: {e}",
                self.homepage_host
            ))
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "{name} environment variable is required"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so the env mutations cannot race each other.
    #[test]
    fn reads_and_validates_the_environment() {
        env::set_var("AUTH_URL", "https://login.example.com/auth?first=1");
        env::set_var("HOMEPAGE_HOST", "booking.example.com");
        env::set_var("HOMEPAGE_PATH", "/default.aspx");
        env::set_var("COMMAND_PATH", "/command.aspx");
        env::set_var("USERNAME", "tester");
        env::set_var("MAX_REDIRECTS", "-7");

        let config = Config::from_env().unwrap();
        assert_eq!(config.auth_url.as_str(), "https://login.example.com/auth?first=1");
        assert_eq!(config.max_redirects, 7);
        assert_eq!(
            config.homepage_url().unwrap().as_str(),
            "https://booking.example.com/default.aspx"
        );

        env::set_var("MAX_REDIRECTS", "many");
        assert!(matches!(Config::from_env(), Err(Error::Config(msg)) if msg.contains("MAX_REDIRECTS")));
        env::remove_var("MAX_REDIRECTS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.max_redirects, 5);

        env::remove_var("USERNAME");
        assert!(matches!(Config::from_env(), Err(Error::Config(msg)) if msg.contains("USERNAME")));
    }
}
