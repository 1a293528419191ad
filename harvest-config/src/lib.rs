//! Loader for collector configuration with YAML + environment overlays.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults (credential keys point at `${REDDIT_CLIENT_ID}`,
//!    `${REDDIT_SECRET}` and `${YOUTUBE_API_KEY}`)
//! 2. YAML snippets and files, in the order they were added
//! 3. `HARVEST__SECTION__KEY` environment variables
//!
//! After merging, every string is run through `${VAR}` expansion (bounded to
//! a fixed depth so cycles terminate) and the result is deserialized into
//! [`HarvestConfig`]. Call the matching `validate_*` method before starting a
//! pipeline so missing credentials fail before any network call.
use config::{Config, ConfigError, Environment, File, FileFormat};
use harvest_common::observability::LogFormat;
use harvest_common::{FailurePolicy, HarvestError};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

const REDDIT_CLIENT_ID_ENV: &str = "REDDIT_CLIENT_ID";
const REDDIT_SECRET_ENV: &str = "REDDIT_SECRET";
const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Root under which `reddit/` and `youtube/` output folders are created.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub expansion: ExpansionSettings,
    pub reddit: RedditConfig,
    pub youtube: YoutubeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_true")]
    pub stderr: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: default_log_filter(),
            stderr: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for 429/5xx and network errors. Zero means fail fast.
    #[serde(default)]
    pub retries: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionSettings {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Parents expanded at once; 1 keeps the run strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Skip,
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_reddit_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_reddit_api_url")]
    pub api_url: String,
    /// Cap on "load more" fetches per post; `None` resolves everything.
    #[serde(default)]
    pub max_more_requests: Option<usize>,
    /// Placeholders nested deeper than this are left unresolved.
    #[serde(default)]
    pub max_more_depth: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeConfig {
    pub api_key: String,
    #[serde(default = "default_youtube_api_url")]
    pub api_url: String,
    #[serde(default = "default_max_comments_per_video")]
    pub max_comments_per_video: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_concurrency() -> usize {
    1
}
fn default_user_agent() -> String {
    concat!("harvest/", env!("CARGO_PKG_VERSION"), " comment collector").into()
}
fn default_subreddit() -> String {
    "all".into()
}
fn default_sort() -> String {
    "relevance".into()
}
fn default_reddit_auth_url() -> String {
    "https://www.reddit.com".into()
}
fn default_reddit_api_url() -> String {
    "https://oauth.reddit.com".into()
}
fn default_youtube_api_url() -> String {
    "https://www.googleapis.com/youtube/v3/".into()
}
fn default_max_comments_per_video() -> usize {
    10_000
}

impl HarvestConfig {
    /// Fail fast unless Reddit credentials and settings are usable.
    pub fn validate_reddit(&self) -> Result<(), HarvestError> {
        self.validate_common()?;
        require("reddit.client_id", REDDIT_CLIENT_ID_ENV, &self.reddit.client_id)?;
        require("reddit.client_secret", REDDIT_SECRET_ENV, &self.reddit.client_secret)?;
        if self.reddit.user_agent.trim().is_empty() {
            return Err(HarvestError::Config(
                "reddit.user_agent must not be empty".into(),
            ));
        }
        if self.reddit.subreddit.trim().is_empty() {
            return Err(HarvestError::Config(
                "reddit.subreddit must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Fail fast unless the YouTube key and settings are usable.
    pub fn validate_youtube(&self) -> Result<(), HarvestError> {
        self.validate_common()?;
        require("youtube.api_key", YOUTUBE_API_KEY_ENV, &self.youtube.api_key)?;
        if self.youtube.max_comments_per_video == 0 {
            return Err(HarvestError::Config(
                "youtube.max_comments_per_video must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn validate_common(&self) -> Result<(), HarvestError> {
        if self.expansion.concurrency == 0 {
            return Err(HarvestError::Config(
                "expansion.concurrency must be at least 1".into(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(HarvestError::Config(
                "http.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn require(key: &str, env_var: &str, value: &str) -> Result<(), HarvestError> {
    let value = value.trim();
    if value.is_empty() || value.contains("${") {
        return Err(HarvestError::Config(format!(
            "{key} is not set; export {env_var} or set {key} in harvest.yaml"
        )));
    }
    Ok(())
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (defaults + YAML + env overrides).
pub struct HarvestConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for HarvestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestConfigLoader {
    /// Start from built-in defaults; env overrides are applied in [`load`](Self::load).
    ///
    /// ```
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str("reddit: { client_id: abc, client_secret: xyz }\nyoutube: { api_key: k }")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.reddit.subreddit, "all");
    /// assert_eq!(config.youtube.max_comments_per_video, 10_000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is merged only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, and deserialize.
    ///
    /// ```
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_YT_KEY", "injected-from-env"); }
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// youtube:
    ///   api_key: "${DOC_YT_KEY}"
    ///   max_comments_per_video: 50
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.youtube.api_key, "injected-from-env");
    /// assert_eq!(config.youtube.max_comments_per_video, 50);
    /// assert!(config.validate_youtube().is_ok());
    ///
    /// unsafe { std::env::remove_var("DOC_YT_KEY"); }
    /// ```
    pub fn load(self) -> Result<HarvestConfig, ConfigError> {
        let cfg = self
            .builder
            .set_default("reddit.client_id", format!("${{{REDDIT_CLIENT_ID_ENV}}}"))?
            .set_default("reddit.client_secret", format!("${{{REDDIT_SECRET_ENV}}}"))?
            .set_default("youtube.api_key", format!("${{{YOUTUBE_API_KEY_ENV}}}"))?
            .add_source(Environment::with_prefix("HARVEST").separator("__"))
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // Round-trip through `config` so env-provided strings still coerce
        // into numeric and boolean fields.
        Config::try_from(&v)?.try_deserialize()
    }
}
