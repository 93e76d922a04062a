use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::history::DEFAULT_HISTORY_LIMIT;
use crate::utils::url::construct_api_url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_PATH: &str = "api/chat";
pub const DEFAULT_HEALTH_PATH: &str = "api/health";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const BASE_URL_ENV: &str = "PALAVER_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub chat_path: Option<String>,
    pub health_path: Option<String>,
    pub history_limit: Option<usize>,
    pub history_file: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    /// Pick the backend base URL: explicit override, then the environment,
    /// then the config file, then the built-in default.
    pub fn resolve_base_url(&self, cli_override: Option<&str>, env_value: Option<&str>) -> String {
        cli_override
            .or(env_value)
            .or(self.base_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    pub fn chat_url(&self, base_url: &str) -> String {
        construct_api_url(
            base_url,
            self.chat_path.as_deref().unwrap_or(DEFAULT_CHAT_PATH),
        )
    }

    pub fn health_url(&self, base_url: &str) -> String {
        construct_api_url(
            base_url,
            self.health_path.as_deref().unwrap_or(DEFAULT_HEALTH_PATH),
        )
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
    }

    /// Where the transcript snapshot lives, if a location can be determined.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file
            .clone()
            .or_else(|| Self::data_dir().map(|dir| dir.join("history.json")))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Assign one setting from its command-line spelling.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "chat-path" => self.chat_path = Some(value.to_string()),
            "health-path" => self.health_path = Some(value.to_string()),
            "history-file" => self.history_file = Some(PathBuf::from(value)),
            "history-limit" => {
                let limit = value
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(|| format!("history-limit must be a positive number, got '{value}'"))?;
                self.history_limit = Some(limit);
            }
            "connect-timeout" => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| format!("connect-timeout must be a number of seconds, got '{value}'"))?;
                self.connect_timeout_secs = Some(secs);
            }
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = None,
            "chat-path" => self.chat_path = None,
            "health-path" => self.health_path = None,
            "history-file" => self.history_file = None,
            "history-limit" => self.history_limit = None,
            "connect-timeout" => self.connect_timeout_secs = None,
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        let unset = "(unset)".to_string();
        println!("base-url:        {}", self.base_url.clone().unwrap_or_else(|| unset.clone()));
        println!("chat-path:       {}", self.chat_path.clone().unwrap_or_else(|| unset.clone()));
        println!("health-path:     {}", self.health_path.clone().unwrap_or_else(|| unset.clone()));
        println!("history-limit:   {}", self.history_limit());
        println!(
            "history-file:    {}",
            self.history_path()
                .map(path_display)
                .unwrap_or_else(|| unset.clone())
        );
        println!("connect-timeout: {}s", self.connect_timeout().as_secs());
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
