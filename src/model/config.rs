use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the `tasks` and `theme` keys live (default: XDG data dir)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: None,
            log_level: default_log_level(),
            display: DisplayConfig::default(),
            export: ExportConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// chrono format string for due dates, e.g. "Jun 14, 2024"
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Cells reserved for the task text column in list output
    #[serde(default = "default_text_width")]
    pub text_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            date_format: default_date_format(),
            text_width: default_text_width(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export file names are `<prefix>-YYYY-MM-DD.json`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            file_prefix: default_file_prefix(),
        }
    }
}

/// Search-as-you-type settings. Only interactive front ends that feed
/// `Session::push_search` see the debounce window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_date_format() -> String {
    "%b %-d, %Y".to_string()
}

fn default_text_width() -> usize {
    60
}

fn default_file_prefix() -> String {
    "todo-export".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}
