//! Configuration loaded from `config.toml`, every field defaulted

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Lowercase reference phrases that wake the assistant
    #[serde(default = "default_wake_phrases")]
    pub wake_phrases: Vec<String>,
    /// Similarity above this value counts as a wake-phrase match
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Delay between waking up and starting command capture
    #[serde(default = "default_wake_timeout_ms")]
    pub wake_timeout_ms: u64,
    /// Backoff before restarting the wake listener, and post-execution
    /// display time
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// How long results stay on screen before going back to idle
    #[serde(default = "default_result_display_ms")]
    pub result_display_ms: u64,
    #[serde(default = "default_max_command_length")]
    pub max_command_length: usize,
    /// Bounded restarts for a wake listener that fails to start
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Recognition language tag
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wake_phrases: default_wake_phrases(),
            similarity_threshold: default_similarity_threshold(),
            wake_timeout_ms: default_wake_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            result_display_ms: default_result_display_ms(),
            max_command_length: default_max_command_length(),
            max_retries: default_max_retries(),
            language: default_language(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_wake_phrases() -> Vec<String> {
    [
        "inventario activar",
        "inventario activa",
        "activar inventario",
        "asistente activar",
        "asistente activa",
        "hola inventario",
        "ok inventario",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_similarity_threshold() -> f64 {
    0.8
}
fn default_wake_timeout_ms() -> u64 {
    500
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_result_display_ms() -> u64 {
    3000
}
fn default_max_command_length() -> usize {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_language() -> String {
    "es-ES".into()
}
fn default_base_url() -> String {
    "http://localhost:5000".into()
}

impl Config {
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            fs::read_to_string(path)
                .ok()
                .and_then(|s| toml::from_str(&s).ok())
                .unwrap_or_default()
        } else {
            Config::default()
        }
    }

    pub fn wake_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn result_display(&self) -> Duration {
        Duration::from_millis(self.result_display_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.wake_phrases.len(), 7);
        assert_eq!(config.similarity_threshold, 0.8);
        assert_eq!(config.max_command_length, 500);
        assert_eq!(config.language, "es-ES");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            wake_phrases = ["hola inventario"]

            [backend]
            base_url = "http://10.0.0.2:8080"
            "#,
        )
        .unwrap();
        assert_eq!(config.wake_phrases, vec!["hola inventario"]);
        assert_eq!(config.backend.base_url, "http://10.0.0.2:8080");
        assert_eq!(config.result_display_ms, 3000);
    }
}
