use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_TEMPERATURE: f64 = 0.0;
const DEFAULT_TOP_P: f64 = 1.0;
const DEFAULT_MAX_TOKENS: u32 = 1500;
const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;
const DEFAULT_LOG_FILE: &str = "cv_reader.log";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    pub deployment_name: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub presence_penalty: f64,
    /// Azure AD token. Takes precedence over `api_key` when set.
    pub ad_token: Option<String>,
    pub request_timeout: Option<Duration>,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration against an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let api_key = get("AZURE_OPENAI_KEY")
            .or_else(|| get("AZURE_OPENAI_API_KEY"))
            .or_else(|| get("OPENAI_API_KEY"))
            .context(
                "Required environment variable 'AZURE_OPENAI_KEY' is not set \
                 (also checked AZURE_OPENAI_API_KEY and OPENAI_API_KEY)",
            )?;

        let endpoint = require("AZURE_OPENAI_ENDPOINT")?.trim().to_string();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            bail!("AZURE_OPENAI_ENDPOINT must be an http(s) URL, got '{endpoint}'");
        }

        let temperature = parse_or("AZURE_OPENAI_TEMPERATURE", get, DEFAULT_TEMPERATURE)?;
        check_range("AZURE_OPENAI_TEMPERATURE", temperature, 0.0, 2.0)?;

        let top_p = parse_or("AZURE_OPENAI_TOP_P", get, DEFAULT_TOP_P)?;
        check_range("AZURE_OPENAI_TOP_P", top_p, 0.0, 1.0)?;

        let presence_penalty = parse_or(
            "AZURE_OPENAI_PRESENCE_PENALTY",
            get,
            DEFAULT_PRESENCE_PENALTY,
        )?;
        check_range("AZURE_OPENAI_PRESENCE_PENALTY", presence_penalty, -2.0, 2.0)?;

        let max_tokens = parse_or("AZURE_OPENAI_MAX_TOKENS", get, DEFAULT_MAX_TOKENS)?;
        if max_tokens == 0 {
            bail!("AZURE_OPENAI_MAX_TOKENS must be greater than zero");
        }

        let request_timeout = get("AZURE_OPENAI_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| {
                        format!("AZURE_OPENAI_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'")
                    })
            })
            .transpose()?;

        Ok(Config {
            api_key,
            endpoint,
            api_version: require("AZURE_OPENAI_API_VERSION")?,
            deployment_name: require("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            temperature,
            top_p,
            max_tokens,
            presence_penalty,
            ad_token: get("AZURE_OPENAI_AD_TOKEN"),
            request_timeout,
            log_file: get("CV_READER_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        })
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("deployment_name", &self.deployment_name)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("presence_penalty", &self.presence_penalty)
            .field("ad_token", &self.ad_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("log_file", &self.log_file)
            .finish()
    }
}

fn parse_or<T, G>(key: &str, get: G, default: T) -> Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}

fn check_range(key: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        bail!("{key} must be between {min} and {max}, got {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> HashMap<String, String> {
        env(&[
            ("AZURE_OPENAI_KEY", "secret-key"),
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com/"),
            ("AZURE_OPENAI_API_VERSION", "2023-06-01-preview"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4o"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config> {
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults_applied_when_optional_vars_absent() {
        let config = load(&required()).unwrap();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.top_p, 1.0);
        assert_eq!(config.max_tokens, 1500);
        assert_eq!(config.presence_penalty, 0.0);
        assert!(config.ad_token.is_none());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.log_file, PathBuf::from("cv_reader.log"));
    }

    #[test]
    fn test_each_required_var_fails_loudly_when_missing() {
        for key in [
            "AZURE_OPENAI_ENDPOINT",
            "AZURE_OPENAI_API_VERSION",
            "AZURE_OPENAI_DEPLOYMENT_NAME",
        ] {
            let mut vars = required();
            vars.remove(key);
            let err = load(&vars).unwrap_err().to_string();
            assert!(err.contains(key), "error for {key} was: {err}");
        }
    }

    #[test]
    fn test_missing_key_names_variable() {
        let mut vars = required();
        vars.remove("AZURE_OPENAI_KEY");
        let err = load(&vars).unwrap_err().to_string();
        assert!(err.contains("AZURE_OPENAI_KEY"));
    }

    #[test]
    fn test_blank_required_var_counts_as_missing() {
        let mut vars = required();
        vars.insert("AZURE_OPENAI_DEPLOYMENT_NAME".into(), "   ".into());
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_key_falls_back_to_alternate_names() {
        let mut vars = required();
        vars.remove("AZURE_OPENAI_KEY");
        vars.insert("OPENAI_API_KEY".into(), "fallback".into());
        assert_eq!(load(&vars).unwrap().api_key, "fallback");
    }

    #[test]
    fn test_sampling_overrides_parsed() {
        let mut vars = required();
        vars.insert("AZURE_OPENAI_TEMPERATURE".into(), "0.7".into());
        vars.insert("AZURE_OPENAI_TOP_P".into(), "0.95".into());
        vars.insert("AZURE_OPENAI_TIMEOUT_SECS".into(), "30".into());
        let config = load(&vars).unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 0.95);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_unparseable_temperature_rejected() {
        let mut vars = required();
        vars.insert("AZURE_OPENAI_TEMPERATURE".into(), "warm".into());
        let err = load(&vars).unwrap_err().to_string();
        assert!(err.contains("AZURE_OPENAI_TEMPERATURE"));
    }

    #[test]
    fn test_out_of_range_top_p_rejected() {
        let mut vars = required();
        vars.insert("AZURE_OPENAI_TOP_P".into(), "1.5".into());
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_endpoint_must_be_url() {
        let mut vars = required();
        vars.insert("AZURE_OPENAI_ENDPOINT".into(), "example.openai.azure.com".into());
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut vars = required();
        vars.insert("AZURE_OPENAI_AD_TOKEN".into(), "ad-secret".into());
        let rendered = format!("{:?}", load(&vars).unwrap());
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("ad-secret"));
    }
}
