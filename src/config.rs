//! Configuration loading, validation, and atomic reload.
//!
//! Two layers: [`Settings`] is the on-disk `settings.toml` document, created
//! with defaults on first run; [`Config`] is the validated snapshot the
//! pipeline consumes, with exclude patterns compiled and CLI overrides
//! applied. Snapshots are immutable. [`ConfigHandle`] owns the current
//! snapshot and swaps it atomically on reload, so an operation that grabbed
//! a snapshot keeps exactly the options it started with.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::error::UplinkError;

pub const SETTINGS_FILE: &str = "settings.toml";

/// On-disk settings document. Keys keep the upper-case names the agent has
/// always used so existing files stay readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "BATCH_SIZE", default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(rename = "MAX_LINES_PER_BLOB", default = "default_max_lines_per_blob")]
    pub max_lines_per_blob: usize,
    #[serde(rename = "BASE_URL", default = "default_base_url")]
    pub base_url: String,
    #[serde(rename = "TOKEN", default = "default_token")]
    pub token: String,
    #[serde(rename = "AUTO_INDEX_ON_SEARCH", default = "default_auto_index_on_search")]
    pub auto_index_on_search: bool,
    #[serde(rename = "TEXT_EXTENSIONS", default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
    #[serde(rename = "EXCLUDE_PATTERNS", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(rename = "HIDDEN_WHITELIST", default)]
    pub hidden_whitelist: Vec<String>,
    #[serde(rename = "REQUEST_TIMEOUT_SECS", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(rename = "MAX_RETRIES", default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_lines_per_blob: default_max_lines_per_blob(),
            base_url: default_base_url(),
            token: default_token(),
            auto_index_on_search: default_auto_index_on_search(),
            text_extensions: default_text_extensions(),
            exclude_patterns: default_exclude_patterns(),
            hidden_whitelist: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_max_lines_per_blob() -> usize {
    800
}
fn default_base_url() -> String {
    "https://api.example.com".to_string()
}
fn default_token() -> String {
    "your-token-here".to_string()
}
fn default_auto_index_on_search() -> bool {
    true
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

fn default_text_extensions() -> Vec<String> {
    [
        ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".go", ".rs", ".cpp", ".c", ".h", ".hpp",
        ".cs", ".rb", ".php", ".md", ".txt", ".json", ".yaml", ".yml", ".toml", ".xml", ".html",
        ".css", ".scss", ".sql", ".sh", ".bash",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    [
        ".venv",
        "venv",
        ".env",
        "env",
        "node_modules",
        ".git",
        ".svn",
        ".hg",
        "__pycache__",
        ".pytest_cache",
        ".mypy_cache",
        ".tox",
        ".eggs",
        "*.egg-info",
        "dist",
        "build",
        ".idea",
        ".vscode",
        ".DS_Store",
        "*.pyc",
        "*.pyo",
        "*.pyd",
        ".Python",
        "pip-log.txt",
        "pip-delete-this-directory.txt",
        ".coverage",
        "htmlcov",
        ".gradle",
        "target",
        "bin",
        "obj",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// One exclude rule, compiled once at configuration load.
#[derive(Debug, Clone)]
pub enum ExcludePattern {
    /// Exact name match.
    Literal(String),
    /// Glob match on the name.
    Glob(GlobMatcher),
}

impl ExcludePattern {
    fn compile(raw: &str) -> Result<Self, UplinkError> {
        if raw.contains(['*', '?', '[']) {
            let glob = Glob::new(raw).map_err(|e| {
                UplinkError::ConfigurationInvalid(format!("bad exclude pattern '{}': {}", raw, e))
            })?;
            Ok(Self::Glob(glob.compile_matcher()))
        } else {
            Ok(Self::Literal(raw.to_string()))
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == name,
            Self::Glob(matcher) => matcher.is_match(name),
        }
    }

    /// The pattern text as configured.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Literal(literal) => literal,
            Self::Glob(matcher) => matcher.glob().glob(),
        }
    }
}

/// Values supplied on the command line. They beat the settings file and
/// survive every reload.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Validated snapshot consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub batch_size: usize,
    pub max_lines_per_blob: usize,
    pub base_url: String,
    pub token: String,
    pub auto_index_on_search: bool,
    /// Lower-cased extensions including the leading dot.
    pub text_extensions: HashSet<String>,
    pub exclude_patterns: Vec<ExcludePattern>,
    /// Hidden directory names the scanner may still descend into.
    pub hidden_whitelist: HashSet<String>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Directory holding `projects.json`.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_settings(
        settings: &Settings,
        config_dir: &Path,
        overrides: &Overrides,
    ) -> Result<Self, UplinkError> {
        let base_url = overrides
            .base_url
            .clone()
            .unwrap_or_else(|| settings.base_url.clone());
        let token = overrides
            .token
            .clone()
            .unwrap_or_else(|| settings.token.clone());

        if settings.batch_size == 0 {
            return Err(UplinkError::ConfigurationInvalid(
                "BATCH_SIZE must be greater than 0".to_string(),
            ));
        }
        if settings.max_lines_per_blob == 0 {
            return Err(UplinkError::ConfigurationInvalid(
                "MAX_LINES_PER_BLOB must be greater than 0".to_string(),
            ));
        }
        if settings.request_timeout_secs == 0 {
            return Err(UplinkError::ConfigurationInvalid(
                "REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if base_url.trim().is_empty() {
            return Err(UplinkError::ConfigurationInvalid(
                "BASE_URL must not be empty".to_string(),
            ));
        }
        if token.trim().is_empty() {
            return Err(UplinkError::ConfigurationInvalid(
                "TOKEN must not be empty".to_string(),
            ));
        }

        let exclude_patterns = settings
            .exclude_patterns
            .iter()
            .map(|p| ExcludePattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let text_extensions = settings
            .text_extensions
            .iter()
            .map(|e| {
                let e = e.trim().to_ascii_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .collect();

        Ok(Self {
            batch_size: settings.batch_size,
            max_lines_per_blob: settings.max_lines_per_blob,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            auto_index_on_search: settings.auto_index_on_search,
            text_extensions,
            exclude_patterns,
            hidden_whitelist: settings.hidden_whitelist.iter().cloned().collect(),
            request_timeout_secs: settings.request_timeout_secs,
            max_retries: settings.max_retries,
            config_dir: config_dir.to_path_buf(),
            data_dir: config_dir.join("data"),
        })
    }

    /// True when a directory name matches any exclude pattern.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_patterns.iter().any(|p| p.matches(name))
    }

    pub fn is_hidden_whitelisted(&self, name: &str) -> bool {
        self.hidden_whitelist.contains(name)
    }
}

/// Default config dir: `~/.uplink`.
pub fn default_config_dir() -> Result<PathBuf, UplinkError> {
    dirs::home_dir()
        .map(|home| home.join(".uplink"))
        .ok_or_else(|| {
            UplinkError::ConfigurationInvalid("cannot determine home directory".to_string())
        })
}

/// Create the config dir, the data dir, and a default `settings.toml` on
/// first use.
pub fn ensure_config_files(config_dir: &Path) -> Result<(), UplinkError> {
    std::fs::create_dir_all(config_dir)?;
    std::fs::create_dir_all(config_dir.join("data"))?;

    let settings_path = config_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        let rendered = toml::to_string_pretty(&Settings::default())
            .map_err(|e| UplinkError::ConfigurationInvalid(e.to_string()))?;
        std::fs::write(&settings_path, rendered)?;
    }
    Ok(())
}

fn load(config_dir: &Path, overrides: &Overrides) -> Result<Config, UplinkError> {
    ensure_config_files(config_dir)?;
    let settings_path = config_dir.join(SETTINGS_FILE);
    let text = std::fs::read_to_string(&settings_path)?;
    let settings: Settings = toml::from_str(&text).map_err(|e| {
        UplinkError::ConfigurationInvalid(format!(
            "failed to parse {}: {}",
            settings_path.display(),
            e
        ))
    })?;
    Config::from_settings(&settings, config_dir, overrides)
}

/// Process-wide handle to the current configuration snapshot.
pub struct ConfigHandle {
    config_dir: PathBuf,
    overrides: Overrides,
    current: RwLock<Arc<Config>>,
}

impl ConfigHandle {
    /// Load the configuration (writing defaults on first run) and wrap it.
    pub fn init(config_dir: PathBuf, overrides: Overrides) -> Result<Self, UplinkError> {
        let config = load(&config_dir, &overrides)?;
        Ok(Self {
            config_dir,
            overrides,
            current: RwLock::new(Arc::new(config)),
        })
    }

    pub fn snapshot(&self) -> Arc<Config> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read `settings.toml` and swap the active snapshot. On failure the
    /// previous snapshot stays active.
    pub fn reload(&self) -> Result<Arc<Config>, UplinkError> {
        let fresh = Arc::new(load(&self.config_dir, &self.overrides)?);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = fresh.clone();
        Ok(fresh)
    }

    /// Merge key/value updates into `settings.toml`, then reload.
    ///
    /// The merged document is validated before anything is written, so a bad
    /// update can never leave an unloadable file behind. The write itself
    /// goes through a temp file and rename.
    pub fn update(&self, updates: toml::Table) -> Result<Arc<Config>, UplinkError> {
        let path = self.settings_path();
        let text = std::fs::read_to_string(&path).unwrap_or_default();
        let mut table: toml::Table = toml::from_str(&text).map_err(|e| {
            UplinkError::ConfigurationInvalid(format!("failed to parse {}: {}", path.display(), e))
        })?;
        for (key, value) in updates {
            table.insert(key, value);
        }

        let merged: Settings = table
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| UplinkError::ConfigurationInvalid(e.to_string()))?;
        Config::from_settings(&merged, &self.config_dir, &self.overrides)?;

        let rendered = toml::to_string_pretty(&table)
            .map_err(|e| UplinkError::ConfigurationInvalid(e.to_string()))?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, rendered)?;
        std::fs::rename(&tmp, &path)?;

        self.reload()
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handle_in(dir: &TempDir) -> ConfigHandle {
        ConfigHandle::init(dir.path().to_path_buf(), Overrides::default()).unwrap()
    }

    #[test]
    fn test_first_run_writes_default_settings() {
        let dir = TempDir::new().unwrap();
        let handle = handle_in(&dir);
        assert!(dir.path().join(SETTINGS_FILE).exists());
        assert!(dir.path().join("data").is_dir());

        let config = handle.snapshot();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_lines_per_blob, 800);
        assert!(config.auto_index_on_search);
        assert!(config.text_extensions.contains(".rs"));
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let rendered = toml::to_string_pretty(&Settings::default()).unwrap();
        let parsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.batch_size, 10);
        assert_eq!(parsed.base_url, "https://api.example.com");
        assert_eq!(parsed.exclude_patterns, default_exclude_patterns());
    }

    #[test]
    fn test_partial_settings_get_defaults() {
        let settings: Settings = toml::from_str("BATCH_SIZE = 25").unwrap();
        assert_eq!(settings.batch_size, 25);
        assert_eq!(settings.max_lines_per_blob, 800);
        assert!(settings.hidden_whitelist.is_empty());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let settings = Settings {
            batch_size: 0,
            ..Settings::default()
        };
        let err = Config::from_settings(&settings, Path::new("/tmp"), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, UplinkError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_empty_token_rejected() {
        let settings = Settings {
            token: "  ".to_string(),
            ..Settings::default()
        };
        let err = Config::from_settings(&settings, Path::new("/tmp"), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, UplinkError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_override_beats_empty_token() {
        let settings = Settings {
            token: String::new(),
            ..Settings::default()
        };
        let overrides = Overrides {
            token: Some("cli-token".to_string()),
            ..Overrides::default()
        };
        let config = Config::from_settings(&settings, Path::new("/tmp"), &overrides).unwrap();
        assert_eq!(config.token, "cli-token");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let settings = Settings {
            base_url: "https://api.example.com/".to_string(),
            ..Settings::default()
        };
        let config =
            Config::from_settings(&settings, Path::new("/tmp"), &Overrides::default()).unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
    }

    #[test]
    fn test_extensions_normalized() {
        let settings = Settings {
            text_extensions: vec!["RS".to_string(), ".Md".to_string()],
            ..Settings::default()
        };
        let config =
            Config::from_settings(&settings, Path::new("/tmp"), &Overrides::default()).unwrap();
        assert!(config.text_extensions.contains(".rs"));
        assert!(config.text_extensions.contains(".md"));
    }

    #[test]
    fn test_literal_pattern_matches_exact_name() {
        let config = Config::from_settings(
            &Settings::default(),
            Path::new("/tmp"),
            &Overrides::default(),
        )
        .unwrap();
        assert!(config.is_excluded_dir("node_modules"));
        assert!(!config.is_excluded_dir("node_modules_backup"));
    }

    #[test]
    fn test_glob_pattern_matches_suffix() {
        let config = Config::from_settings(
            &Settings::default(),
            Path::new("/tmp"),
            &Overrides::default(),
        )
        .unwrap();
        assert!(config.is_excluded_dir("mypkg.egg-info"));
        assert!(!config.is_excluded_dir("egg-info"));
    }

    #[test]
    fn test_bad_glob_rejected() {
        let settings = Settings {
            exclude_patterns: vec!["[".to_string()],
            ..Settings::default()
        };
        let err = Config::from_settings(&settings, Path::new("/tmp"), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, UplinkError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_reload_picks_up_file_changes() {
        let dir = TempDir::new().unwrap();
        let handle = handle_in(&dir);
        assert_eq!(handle.snapshot().batch_size, 10);

        let path = dir.path().join(SETTINGS_FILE);
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("BATCH_SIZE = 10", "BATCH_SIZE = 3")).unwrap();

        handle.reload().unwrap();
        assert_eq!(handle.snapshot().batch_size, 3);
    }

    #[test]
    fn test_reload_failure_keeps_old_snapshot() {
        let dir = TempDir::new().unwrap();
        let handle = handle_in(&dir);

        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "BATCH_SIZE = 0").unwrap();

        assert!(handle.reload().is_err());
        assert_eq!(handle.snapshot().batch_size, 10);
    }

    #[test]
    fn test_cli_overrides_survive_reload() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides {
            base_url: Some("http://127.0.0.1:9999".to_string()),
            token: Some("cli-token".to_string()),
        };
        let handle = ConfigHandle::init(dir.path().to_path_buf(), overrides).unwrap();
        handle.reload().unwrap();

        let config = handle.snapshot();
        assert_eq!(config.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.token, "cli-token");
    }

    #[test]
    fn test_update_merges_and_reloads() {
        let dir = TempDir::new().unwrap();
        let handle = handle_in(&dir);

        let mut updates = toml::Table::new();
        updates.insert("BATCH_SIZE".to_string(), toml::Value::Integer(7));
        handle.update(updates).unwrap();

        assert_eq!(handle.snapshot().batch_size, 7);
        let text = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(text.contains("BATCH_SIZE = 7"));
    }

    #[test]
    fn test_invalid_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let handle = handle_in(&dir);
        let before = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();

        let mut updates = toml::Table::new();
        updates.insert("BATCH_SIZE".to_string(), toml::Value::Integer(0));
        assert!(handle.update(updates).is_err());

        let after = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(before, after);
        assert_eq!(handle.snapshot().batch_size, 10);
    }
}
