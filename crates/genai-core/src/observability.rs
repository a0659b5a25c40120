use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "genai.logs.jsonl";

/// Where log records go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// Compact lines on stderr. Stdout stays free for chat output.
    Console,
    /// One JSON object per record, appended to `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogTarget {
    fn json_file(raw: &str) -> Self {
        let path = Path::new(raw);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE)
            .to_string();
        Self::JsonFile { dir, file_name }
    }
}

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub enabled: bool,
    /// `EnvFilter` directives such as `info` or `genai_agent_stream=debug`.
    pub filter: String,
    pub target: LogTarget,
}

impl ObservabilityConfig {
    /// Reads settings from the process environment.
    ///
    /// - `GENAI_OBSERVABILITY_ENABLED` / `GENAI_OBSERVABILITY`: enable flag (default enabled).
    /// - `GENAI_LOG_LEVEL`, then `RUST_LOG`: filter directives (default `info`).
    /// - `GENAI_JSON_LOG_PATH`: write JSONL to this file instead of stderr.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = ["GENAI_OBSERVABILITY_ENABLED", "GENAI_OBSERVABILITY"]
            .into_iter()
            .find_map(|key| lookup(key))
            .map(|value| parse_bool(&value).unwrap_or(true))
            .unwrap_or(true);
        let filter = ["GENAI_LOG_LEVEL", "RUST_LOG"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .find(|value| EnvFilter::try_new(value).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let target = lookup("GENAI_JSON_LOG_PATH")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| LogTarget::json_file(raw.trim()))
            .unwrap_or(LogTarget::Console);
        Self {
            enabled,
            filter,
            target,
        }
    }
}

/// Initialize logging once per process from [`ObservabilityConfig::from_env`].
pub fn init_observability() {
    init_with(ObservabilityConfig::from_env());
}

/// Initialize logging once per process. Later calls are no-ops.
///
/// JSON records carry the enclosing span, so every line logged while a
/// response stream runs includes its `session_id`.
pub fn init_with(config: ObservabilityConfig) {
    INIT.get_or_init(|| {
        if !config.enabled {
            return;
        }
        let env_filter =
            EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        match config.target {
            LogTarget::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            LogTarget::Console => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}
