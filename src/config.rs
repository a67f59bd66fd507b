//! Configuration for autopilot paths and providers.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (AUTOPILOT_HOME, AUTOPILOT_OUTPUT, GROQ_API_KEY,
//!    AUTOPILOT_MODEL, AUTOPILOT_API_URL)
//! 2. Config file (.autopilot/config.yaml)
//! 3. Defaults (~/.autopilot)
//!
//! Config file discovery:
//! - Searches current directory and parents for .autopilot/config.yaml
//! - `paths.home` is relative to the .autopilot/ directory, `paths.output`
//!   to the directory containing it

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to .autopilot/)
    pub home: Option<String>,
    /// Generated projects root (relative to the config's project directory)
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub blueprint_timeout_seconds: Option<u64>,
    pub blueprint_temperature: Option<f32>,
    pub content_timeout_seconds: Option<u64>,
    pub content_temperature: Option<f32>,
    pub optimize_timeout_seconds: Option<u64>,
    pub optimize_temperature: Option<f32>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to autopilot home (engine state)
    pub home: PathBuf,
    /// Root directory for generated projects
    pub output: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Chat-completions provider settings
    pub provider: ProviderSettings,
}

impl ResolvedConfig {
    /// Per-project state directory ($AUTOPILOT_HOME/projects)
    pub fn projects_dir(&self) -> PathBuf {
        self.home.join("projects")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_url: String,
    pub model: String,
    /// Never printed; see [`ProviderSettings::redacted_key`]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub blueprint_timeout_seconds: u64,
    pub blueprint_temperature: f32,
    pub content_timeout_seconds: u64,
    pub content_temperature: f32,
    pub optimize_timeout_seconds: u64,
    pub optimize_temperature: f32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: 4096,
            blueprint_timeout_seconds: 60,
            blueprint_temperature: 0.3,
            content_timeout_seconds: 90,
            content_temperature: 0.2,
            optimize_timeout_seconds: 60,
            optimize_temperature: 0.2,
        }
    }
}

impl ProviderSettings {
    fn with_file(mut self, file: Option<&ProviderConfig>) -> Self {
        let Some(file) = file else {
            return self;
        };

        if let Some(ref url) = file.api_url {
            self.api_url = url.clone();
        }
        if let Some(ref model) = file.model {
            self.model = model.clone();
        }
        self.max_tokens = file.max_tokens.unwrap_or(self.max_tokens);
        self.blueprint_timeout_seconds = file
            .blueprint_timeout_seconds
            .unwrap_or(self.blueprint_timeout_seconds);
        self.blueprint_temperature = file.blueprint_temperature.unwrap_or(self.blueprint_temperature);
        self.content_timeout_seconds = file
            .content_timeout_seconds
            .unwrap_or(self.content_timeout_seconds);
        self.content_temperature = file.content_temperature.unwrap_or(self.content_temperature);
        self.optimize_timeout_seconds = file
            .optimize_timeout_seconds
            .unwrap_or(self.optimize_timeout_seconds);
        self.optimize_temperature = file.optimize_temperature.unwrap_or(self.optimize_temperature);
        self
    }

    /// Whether an API key is available
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Key with everything but the last four characters masked
    pub fn redacted_key(&self) -> String {
        match self.api_key.as_deref() {
            Some(key) if key.len() > 4 => format!("****{}", &key[key.len() - 4..]),
            Some(key) if !key.is_empty() => "****".to_string(),
            _ => "(not set)".to_string(),
        }
    }
}

/// Environment variable values taken into account during resolution
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub output: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_url: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment (empty values are ignored)
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            home: var("AUTOPILOT_HOME"),
            output: var("AUTOPILOT_OUTPUT"),
            api_key: var("GROQ_API_KEY"),
            model: var("AUTOPILOT_MODEL"),
            api_url: var("AUTOPILOT_API_URL"),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".autopilot").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine defaults, an optional config file and environment overrides
pub fn resolve_config(
    default_home: PathBuf,
    config: Option<(PathBuf, ConfigFile)>,
    env: &EnvOverrides,
) -> ResolvedConfig {
    let (config_file, file) = match config {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };

    // .autopilot/ and the directory containing it
    let autopilot_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let base_dir = autopilot_dir.parent().unwrap_or(Path::new("."));

    let paths = file.as_ref().map(|f| f.paths.clone()).unwrap_or_default();

    let home = if let Some(ref env_home) = env.home {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = paths.home {
        resolve_path(autopilot_dir, home_path)
    } else {
        default_home
    };

    let output = if let Some(ref env_output) = env.output {
        PathBuf::from(env_output)
    } else if let Some(ref output_path) = paths.output {
        resolve_path(base_dir, output_path)
    } else {
        home.join("generated_projects")
    };

    let mut provider =
        ProviderSettings::default().with_file(file.as_ref().and_then(|f| f.provider.as_ref()));
    if let Some(ref url) = env.api_url {
        provider.api_url = url.clone();
    }
    if let Some(ref model) = env.model {
        provider.model = model.clone();
    }
    provider.api_key = env.api_key.clone();

    ResolvedConfig {
        home,
        output,
        config_file,
        provider,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".autopilot");

    let config = match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    Ok(resolve_config(default_home, config, &EnvOverrides::from_env()))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the autopilot home directory (engine state)
pub fn autopilot_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the per-project state directory ($AUTOPILOT_HOME/projects)
pub fn projects_dir() -> Result<PathBuf> {
    Ok(config()?.projects_dir())
}

/// Get the generated projects root
pub fn output_dir() -> Result<PathBuf> {
    Ok(config()?.output.clone())
}
