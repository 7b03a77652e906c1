use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use basket_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

struct Sources {
    file_doc: Option<Value>,
    file_path: Option<PathBuf>,
    overridden: Vec<&'static str>,
}

const COMMAND: &str = "config";

/// Effective configuration, one `- key = value (source: ...)` line per setting.
pub fn run(options: LoadOptions) -> CommandResult {
    let sources = Sources::detect(&options);
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let mut lines = vec![
        "effective config (source precedence: flag > env > file > default):".to_string(),
    ];

    let normalize = &config.normalize;
    lines.push(sources.line(
        "normalize.excluded_groups",
        &normalize.excluded_groups.join(", "),
        &["BASKET_NORMALIZE_EXCLUDED_GROUPS"],
    ));
    lines.push(sources.line(
        "normalize.excluded_goods",
        &normalize.excluded_goods.join(", "),
        &["BASKET_NORMALIZE_EXCLUDED_GOODS"],
    ));
    lines.push(sources.line(
        "normalize.min_positions",
        &normalize.min_positions.to_string(),
        &["BASKET_NORMALIZE_MIN_POSITIONS"],
    ));
    lines.push(sources.line(
        "normalize.employee_min_transactions",
        &normalize.employee_min_transactions.to_string(),
        &["BASKET_NORMALIZE_EMPLOYEE_MIN_TRANSACTIONS"],
    ));

    let mining = &config.mining;
    lines.push(sources.line(
        "mining.min_support",
        &mining.min_support.to_string(),
        &["BASKET_MINING_MIN_SUPPORT"],
    ));
    lines.push(sources.line(
        "mining.min_itemset_len",
        &mining.min_itemset_len.to_string(),
        &["BASKET_MINING_MIN_ITEMSET_LEN"],
    ));
    lines.push(sources.line(
        "mining.max_itemset_len",
        &mining.max_itemset_len.map(|len| len.to_string()).unwrap_or_else(|| "<unset>".into()),
        &["BASKET_MINING_MAX_ITEMSET_LEN"],
    ));

    let suggest = &config.suggest;
    lines.push(sources.line(
        "suggest.min_confidence",
        &suggest.min_confidence.to_string(),
        &["BASKET_SUGGEST_MIN_CONFIDENCE"],
    ));
    lines.push(sources.line(
        "suggest.max_suggestions",
        &suggest.max_suggestions.to_string(),
        &["BASKET_SUGGEST_MAX_SUGGESTIONS"],
    ));
    lines.push(sources.line(
        "suggest.candidate_cap",
        &suggest.candidate_cap.to_string(),
        &["BASKET_SUGGEST_CANDIDATE_CAP"],
    ));
    lines.push(sources.line(
        "suggest.employee_affinity",
        &suggest.employee_affinity.to_string(),
        &["BASKET_SUGGEST_EMPLOYEE_AFFINITY"],
    ));

    lines.push(sources.line(
        "artifacts.dir",
        &config.artifacts.dir.display().to_string(),
        &["BASKET_ARTIFACTS_DIR"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["BASKET_LOGGING_LEVEL", "BASKET_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["BASKET_LOGGING_FORMAT", "BASKET_LOG_FORMAT"],
    ));

    CommandResult::success(COMMAND, lines.join("\n"))
}

impl Sources {
    fn detect(options: &LoadOptions) -> Self {
        let file_path = resolve_config_path(options.config_path.as_deref());
        let file_doc = load_config_file_doc(file_path.as_deref());

        let overrides = &options.overrides;
        let mut overridden = Vec::new();
        if overrides.artifacts_dir.is_some() {
            overridden.push("artifacts.dir");
        }
        if overrides.log_level.is_some() {
            overridden.push("logging.level");
        }
        if overrides.log_format.is_some() {
            overridden.push("logging.format");
        }
        if overrides.min_support.is_some() {
            overridden.push("mining.min_support");
        }
        if overrides.employee_affinity.is_some() {
            overridden.push("suggest.employee_affinity");
        }

        Self { file_doc, file_path, overridden }
    }

    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        render_line(key_path, value, self.field_source(key_path, env_keys))
    }

    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if self.overridden.iter().any(|key| *key == key_path) {
            return "flag".to_string();
        }

        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
