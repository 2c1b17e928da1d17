use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "pixabot.json";
const DEFAULT_API_URL: &str = "https://pixabay.com/api/";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Required environment variable is unset or empty.
    #[error("environment variable {0} is required")]
    MissingEnv(&'static str),
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Directory for logs. Defaults to current directory.
    data_dir: Option<String>,
    /// Chat that receives log lines.
    log_chat_id: Option<i64>,
    #[serde(default = "default_page_size")]
    page_size: u32,
    #[serde(default = "default_session_capacity")]
    session_capacity: u64,
    #[serde(default = "default_session_idle_minutes")]
    session_idle_minutes: u64,
    #[serde(default = "default_search_timeout_secs")]
    search_timeout_secs: u64,
    pixabay_api_url: Option<String>,
    /// Use `largeImageURL` when a hit has no full HD url.
    #[serde(default)]
    large_image_fallback: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_chat_id: None,
            page_size: default_page_size(),
            session_capacity: default_session_capacity(),
            session_idle_minutes: default_session_idle_minutes(),
            search_timeout_secs: default_search_timeout_secs(),
            pixabay_api_url: None,
            large_image_fallback: false,
        }
    }
}

fn default_page_size() -> u32 {
    5
}

fn default_session_capacity() -> u64 {
    10_000
}

fn default_session_idle_minutes() -> u64 {
    24 * 60
}

fn default_search_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub pixabay_access_key: String,
    pub pixabay_api_url: String,
    pub log_chat_id: Option<ChatId>,
    pub data_dir: PathBuf,
    /// Images per page; also sent to the provider as `per_page`.
    pub page_size: u32,
    pub session_capacity: u64,
    pub session_idle: Duration,
    pub search_timeout: Duration,
    pub large_image_fallback: bool,
}

impl Config {
    /// Load `.env`, then the JSON file (if any) and the environment.
    ///
    /// `path` is the file named on the command line. Without one, the
    /// default `pixabot.json` is read only if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let file = match path {
            Some(p) => Some(read_file(p)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() { Some(read_file(default)?) } else { None }
            }
        };
        Self::build(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    fn build<F>(file: ConfigFile, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv(key))
        };

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let pixabay_access_key = required("PIXABAY_ACCESS_KEY")?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TELEGRAM_BOT_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        // Pixabay's per_page minimum is 3; a Telegram album holds at most 10
        if !(3..=10).contains(&file.page_size) {
            return Err(ConfigError::Validation(format!(
                "page_size must be between 3 and 10, got {}",
                file.page_size
            )));
        }
        if file.session_capacity == 0 {
            return Err(ConfigError::Validation("session_capacity must be positive".into()));
        }

        Ok(Self {
            telegram_bot_token,
            pixabay_access_key,
            pixabay_api_url: file.pixabay_api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir: file.data_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            page_size: file.page_size,
            session_capacity: file.session_capacity,
            session_idle: Duration::from_secs(file.session_idle_minutes * 60),
            search_timeout: Duration::from_secs(file.search_timeout_secs),
            large_image_fallback: file.large_image_fallback,
        })
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadFile { path: path.to_path_buf(), source: e })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson { path: path.to_path_buf(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn env_with(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn valid_env() -> impl Fn(&str) -> Option<String> {
        env_with(&[
            ("TELEGRAM_BOT_TOKEN", "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"),
            ("PIXABAY_ACCESS_KEY", "pixabay-key"),
        ])
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_defaults_from_env_only() {
        let config = Config::build(ConfigFile::default(), valid_env()).expect("should build");
        assert_eq!(config.pixabay_access_key, "pixabay-key");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.session_capacity, 10_000);
        assert_eq!(config.session_idle, Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.pixabay_api_url, DEFAULT_API_URL);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert!(config.log_chat_id.is_none());
        assert!(!config.large_image_fallback);
    }

    #[test]
    fn test_missing_access_key() {
        let env = env_with(&[("TELEGRAM_BOT_TOKEN", "123456789:ABCdef")]);
        let err = assert_err(Config::build(ConfigFile::default(), env));
        assert!(matches!(err, ConfigError::MissingEnv("PIXABAY_ACCESS_KEY")));
        assert!(err.to_string().contains("PIXABAY_ACCESS_KEY"));
    }

    #[test]
    fn test_blank_access_key_is_missing() {
        let env = env_with(&[
            ("TELEGRAM_BOT_TOKEN", "123456789:ABCdef"),
            ("PIXABAY_ACCESS_KEY", "   "),
        ]);
        let err = assert_err(Config::build(ConfigFile::default(), env));
        assert!(matches!(err, ConfigError::MissingEnv("PIXABAY_ACCESS_KEY")));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let env = env_with(&[
            ("TELEGRAM_BOT_TOKEN", "invalid_token_no_colon"),
            ("PIXABAY_ACCESS_KEY", "k"),
        ]);
        let err = assert_err(Config::build(ConfigFile::default(), env));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let env = env_with(&[("TELEGRAM_BOT_TOKEN", "123456789:"), ("PIXABAY_ACCESS_KEY", "k")]);
        let err = assert_err(Config::build(ConfigFile::default(), env));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_file_overrides() {
        let file = write_config(r#"{
            "page_size": 10,
            "log_chat_id": -100123,
            "session_idle_minutes": 5,
            "large_image_fallback": true
        }"#);
        let parsed = read_file(file.path()).expect("should parse");
        let config = Config::build(parsed, valid_env()).expect("should build");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.log_chat_id, Some(ChatId(-100123)));
        assert_eq!(config.session_idle, Duration::from_secs(300));
        assert!(config.large_image_fallback);
    }

    #[test]
    fn test_page_size_out_of_range() {
        let file = write_config(r#"{ "page_size": 2 }"#);
        let parsed = read_file(file.path()).unwrap();
        let err = assert_err(Config::build(parsed, valid_env()));
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_page_size_above_album_limit() {
        let file = write_config(r#"{ "page_size": 11 }"#);
        let parsed = read_file(file.path()).unwrap();
        let err = assert_err(Config::build(parsed, valid_env()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("between 3 and 10, got 11"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let file = write_config(r#"{ "pages_size": 5 }"#);
        let err = assert_err(read_file(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load(Some(Path::new("/nonexistent/path/config.json"))));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(read_file(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
