//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! The legacy `ES_HOST`, `ES_USERNAME` and `ES_PASSWORD` variables are mapped
//! onto the `elasticsearch` section. Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::dataset::DatasetSpec;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(
                Env::raw()
                    .only(&["ES_HOST", "ES_USERNAME", "ES_PASSWORD"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("ES_HOST") {
                            "elasticsearch.url".into()
                        } else if key.as_str().eq_ignore_ascii_case("ES_USERNAME") {
                            "elasticsearch.username".into()
                        } else {
                            "elasticsearch.password".into()
                        }
                    }),
            )
            .merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wraps an already assembled figment; used by tests and embedders.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Like [`Config::get`], but an absent key yields `T::default()`.
    pub fn get_or_default<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match self.figment.find_value(key) {
            Ok(_) => self.get(key),
            Err(_) => Ok(T::default()),
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings = Settings {
            elasticsearch: self.get_or_default("elasticsearch")?,
            knowledge_base: self.get_or_default("knowledge_base")?,
            action: self.get_or_default("action")?,
            server: self.get_or_default("server")?,
            loader: self.get_or_default("loader")?,
            assistant: self.get_or_default("assistant")?,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> Result<()> {
        match env {
            "prod" | "production" => {
                // Production must not silently fall back to a local cluster.
                if self.figment.find_value("elasticsearch.url").is_err() {
                    return Err(Error::InvalidConfig(
                        "elasticsearch.url must be set in production".to_string(),
                    ));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub elasticsearch: ElasticsearchConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub action: ActionConfig,
    pub server: ServerConfig,
    pub loader: LoaderConfig,
    pub assistant: AssistantConfig,
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.action.default_limit == 0 {
            return Err(Error::InvalidConfig("action.default_limit must be positive".into()));
        }
        if self.loader.batch_size == 0 {
            return Err(Error::InvalidConfig("loader.batch_size must be positive".into()));
        }
        if self.knowledge_base.backend == Backend::Memory && self.knowledge_base.memory_dir.is_none() {
            return Err(Error::InvalidConfig(
                "knowledge_base.memory_dir is required for the memory backend".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Elasticsearch,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub backend: Backend,
    /// Directory of `<index>.ndjson` bulk files served by the memory backend.
    pub memory_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub default_limit: usize,
    pub use_last_object_mention: bool,
    /// Slot receiving the outcome of every invocation; empty disables it.
    pub outcome_slot: Option<String>,
}

impl ActionConfig {
    pub fn outcome_slot(&self) -> Option<&str> {
        self.outcome_slot.as_deref().filter(|s| !s.is_empty())
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            use_last_object_mention: true,
            outcome_slot: Some("kb_outcome".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5055 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub output_dir: String,
    pub datasets: Vec<DatasetSpec>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            output_dir: "data/bulk".to_string(),
            datasets: DatasetSpec::defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub dir: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { dir: "assistant".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(toml: &str) -> Config {
        Config::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let settings = config_from("").settings().unwrap();
        assert_eq!(settings.elasticsearch.url, "http://localhost:9200");
        assert_eq!(settings.action.default_limit, 5);
        assert_eq!(settings.action.outcome_slot(), Some("kb_outcome"));
        assert_eq!(settings.server.port, 5055);
        assert_eq!(settings.loader.datasets.len(), 3);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let settings = config_from(
            r#"
            [elasticsearch]
            url = "http://es:9200"
            [action]
            outcome_slot = ""
            "#,
        )
        .settings()
        .unwrap();
        assert_eq!(settings.elasticsearch.url, "http://es:9200");
        assert_eq!(settings.elasticsearch.timeout_secs, 30);
        assert_eq!(settings.action.outcome_slot(), None);
        assert!(settings.action.use_last_object_mention);
    }

    #[test]
    fn memory_backend_requires_directory() {
        let err = config_from("[knowledge_base]\nbackend = \"memory\"").settings().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn get_reports_missing_key() {
        let err = config_from("").get::<String>("server.host").unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn resolve_with_base_keeps_absolute_paths() {
        let base = Path::new("/srv/assistant");
        assert_eq!(resolve_with_base(base, "data/books.csv"), base.join("data/books.csv"));
        assert_eq!(resolve_with_base(base, "/tmp/x.csv"), PathBuf::from("/tmp/x.csv"));
    }
}
