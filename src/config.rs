//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$CHATSCROLL_CONFIG` (environment variable)
//! 2. `~/.config/chatscroll/config.toml` (Linux/macOS)
//!    `%APPDATA%\chatscroll\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::parser::{ExportDialect, TimestampPolicy};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Chat export parsing.
    pub parser: ParserConfig,
    /// Client-side scrolling and rendering.
    pub viewer: ViewerConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Page size when a request gives no `limit`.
    pub default_limit: usize,
    /// Upper bound applied to every requested `limit`.
    pub max_limit: usize,
}

/// Chat export parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Built-in dialect: "ca", "en", "es" or "all".
    pub dialect: String,
    /// Extra attachment marker labels on top of the dialect's.
    pub extra_attachment_labels: Vec<String>,
    /// Extra system-message keywords on top of the dialect's.
    pub extra_system_keywords: Vec<String>,
    /// Unparseable header timestamps: "now", "previous" or "strict".
    pub timestamp_policy: TimestampPolicy,
}

/// Client-side scrolling and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Height of one rendered message, in surface units.
    pub item_height: u32,
    /// Items rendered above the viewport.
    pub overscan_above: usize,
    /// Items rendered below the viewport.
    pub overscan_below: usize,
    /// Messages requested per fetch.
    pub chunk_size: usize,
    /// Quiet period after the last scroll event before a fetch is considered.
    pub scroll_debounce_ms: u64,
    /// Minimum interval between two renders.
    pub render_throttle_ms: u64,
    /// Quiet period after the last keystroke before the filter is recomputed.
    pub search_debounce_ms: u64,
    /// Fraction of the scroll extent past which the next chunk is fetched.
    pub load_threshold: f64,
}

/// Performance tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Number of attachment metadata lookups kept in the LRU cache.
    pub attachment_cache_size: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            default_limit: 50,
            max_limit: 1000,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dialect: "ca".to_string(),
            extra_attachment_labels: Vec::new(),
            extra_system_keywords: Vec::new(),
            timestamp_policy: TimestampPolicy::Now,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            item_height: 100,
            overscan_above: 10,
            overscan_below: 20,
            chunk_size: 50,
            scroll_debounce_ms: 300,
            render_throttle_ms: 200,
            search_debounce_ms: 300,
            load_threshold: 0.8,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            attachment_cache_size: crate::attachment::DEFAULT_CACHE_SIZE,
        }
    }
}

impl ParserConfig {
    /// The effective dialect: the named preset plus configured extras.
    ///
    /// `override_code` (from the command line) wins over the file. Unknown
    /// codes fall back to Catalan with a warning.
    pub fn dialect(&self, override_code: Option<&str>) -> ExportDialect {
        let code = override_code.unwrap_or(&self.dialect);
        let base = ExportDialect::from_code(code).unwrap_or_else(|| {
            tracing::warn!(dialect = code, "Unknown dialect, using 'ca'");
            ExportDialect::catalan()
        });
        base.with_extra(&self.extra_attachment_labels, &self.extra_system_keywords)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location and return where it went.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("CHATSCROLL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("chatscroll").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatscroll")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("chatscroll.log")
}
