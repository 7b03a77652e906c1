use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mining::{DEFAULT_MIN_ITEMSET_LEN, DEFAULT_MIN_SUPPORT};
use crate::normalize::{DEFAULT_EMPLOYEE_MIN_TRANSACTIONS, DEFAULT_MIN_POSITIONS};
use crate::suggestions::{DEFAULT_CANDIDATE_CAP, DEFAULT_MAX_SUGGESTIONS, DEFAULT_MIN_CONFIDENCE};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub normalize: NormalizeConfig,
    pub mining: MiningConfig,
    pub suggest: SuggestConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Sale lines whose group name is listed here never reach a transaction.
    pub excluded_groups: Vec<String>,
    pub excluded_goods: Vec<String>,
    /// A transaction is kept only with strictly more distinct positions than this.
    pub min_positions: usize,
    /// An employee is kept only with strictly more transactions than this.
    pub employee_min_transactions: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MiningConfig {
    /// Minimum support as a fraction of the transaction count.
    pub min_support: f64,
    /// Itemsets are indexed only when strictly longer than this.
    pub min_itemset_len: usize,
    pub max_itemset_len: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SuggestConfig {
    pub min_confidence: f64,
    pub max_suggestions: usize,
    pub candidate_cap: usize,
    pub employee_affinity: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub artifacts_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub min_support: Option<f64>,
    pub employee_affinity: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            excluded_groups: ["Сигареты", "Табачные изделия", "склад"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            excluded_goods: ["Пакет", "Контейнер"].into_iter().map(str::to_owned).collect(),
            min_positions: DEFAULT_MIN_POSITIONS,
            employee_min_transactions: DEFAULT_EMPLOYEE_MIN_TRANSACTIONS,
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            min_itemset_len: DEFAULT_MIN_ITEMSET_LEN,
            max_itemset_len: None,
        }
    }
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            candidate_cap: DEFAULT_CANDIDATE_CAP,
            employee_affinity: false,
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("data") }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("basket.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(normalize) = patch.normalize {
            if let Some(excluded_groups) = normalize.excluded_groups {
                self.normalize.excluded_groups = excluded_groups;
            }
            if let Some(excluded_goods) = normalize.excluded_goods {
                self.normalize.excluded_goods = excluded_goods;
            }
            if let Some(min_positions) = normalize.min_positions {
                self.normalize.min_positions = min_positions;
            }
            if let Some(employee_min_transactions) = normalize.employee_min_transactions {
                self.normalize.employee_min_transactions = employee_min_transactions;
            }
        }

        if let Some(mining) = patch.mining {
            if let Some(min_support) = mining.min_support {
                self.mining.min_support = min_support;
            }
            if let Some(min_itemset_len) = mining.min_itemset_len {
                self.mining.min_itemset_len = min_itemset_len;
            }
            if let Some(max_itemset_len) = mining.max_itemset_len {
                self.mining.max_itemset_len = Some(max_itemset_len);
            }
        }

        if let Some(suggest) = patch.suggest {
            if let Some(min_confidence) = suggest.min_confidence {
                self.suggest.min_confidence = min_confidence;
            }
            if let Some(max_suggestions) = suggest.max_suggestions {
                self.suggest.max_suggestions = max_suggestions;
            }
            if let Some(candidate_cap) = suggest.candidate_cap {
                self.suggest.candidate_cap = candidate_cap;
            }
            if let Some(employee_affinity) = suggest.employee_affinity {
                self.suggest.employee_affinity = employee_affinity;
            }
        }

        if let Some(artifacts) = patch.artifacts {
            if let Some(dir) = artifacts.dir {
                self.artifacts.dir = dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BASKET_NORMALIZE_EXCLUDED_GROUPS") {
            self.normalize.excluded_groups = parse_list(&value);
        }
        if let Some(value) = read_env("BASKET_NORMALIZE_EXCLUDED_GOODS") {
            self.normalize.excluded_goods = parse_list(&value);
        }
        if let Some(value) = read_env("BASKET_NORMALIZE_MIN_POSITIONS") {
            self.normalize.min_positions = parse_usize("BASKET_NORMALIZE_MIN_POSITIONS", &value)?;
        }
        if let Some(value) = read_env("BASKET_NORMALIZE_EMPLOYEE_MIN_TRANSACTIONS") {
            self.normalize.employee_min_transactions =
                parse_usize("BASKET_NORMALIZE_EMPLOYEE_MIN_TRANSACTIONS", &value)?;
        }

        if let Some(value) = read_env("BASKET_MINING_MIN_SUPPORT") {
            self.mining.min_support = parse_f64("BASKET_MINING_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_MIN_ITEMSET_LEN") {
            self.mining.min_itemset_len = parse_usize("BASKET_MINING_MIN_ITEMSET_LEN", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_MAX_ITEMSET_LEN") {
            self.mining.max_itemset_len =
                Some(parse_usize("BASKET_MINING_MAX_ITEMSET_LEN", &value)?);
        }

        if let Some(value) = read_env("BASKET_SUGGEST_MIN_CONFIDENCE") {
            self.suggest.min_confidence = parse_f64("BASKET_SUGGEST_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("BASKET_SUGGEST_MAX_SUGGESTIONS") {
            self.suggest.max_suggestions = parse_usize("BASKET_SUGGEST_MAX_SUGGESTIONS", &value)?;
        }
        if let Some(value) = read_env("BASKET_SUGGEST_CANDIDATE_CAP") {
            self.suggest.candidate_cap = parse_usize("BASKET_SUGGEST_CANDIDATE_CAP", &value)?;
        }
        if let Some(value) = read_env("BASKET_SUGGEST_EMPLOYEE_AFFINITY") {
            self.suggest.employee_affinity =
                parse_bool("BASKET_SUGGEST_EMPLOYEE_AFFINITY", &value)?;
        }

        if let Some(value) = read_env("BASKET_ARTIFACTS_DIR") {
            self.artifacts.dir = PathBuf::from(value);
        }

        let log_level = read_env("BASKET_LOGGING_LEVEL").or_else(|| read_env("BASKET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BASKET_LOGGING_FORMAT").or_else(|| read_env("BASKET_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(artifacts_dir) = overrides.artifacts_dir {
            self.artifacts.dir = artifacts_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(min_support) = overrides.min_support {
            self.mining.min_support = min_support;
        }
        if let Some(employee_affinity) = overrides.employee_affinity {
            self.suggest.employee_affinity = employee_affinity;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_mining(&self.mining)?;
        validate_suggest(&self.suggest)?;
        validate_artifacts(&self.artifacts)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("basket.toml"), PathBuf::from("config/basket.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_mining(mining: &MiningConfig) -> Result<(), ConfigError> {
    if !(mining.min_support > 0.0 && mining.min_support <= 1.0) {
        return Err(ConfigError::Validation(
            "mining.min_support must be a fraction in range (0, 1]".to_string(),
        ));
    }

    if let Some(max_itemset_len) = mining.max_itemset_len {
        if max_itemset_len <= mining.min_itemset_len {
            return Err(ConfigError::Validation(format!(
                "mining.max_itemset_len must exceed mining.min_itemset_len ({})",
                mining.min_itemset_len
            )));
        }
    }

    Ok(())
}

fn validate_suggest(suggest: &SuggestConfig) -> Result<(), ConfigError> {
    if !(0.0..1.0).contains(&suggest.min_confidence) {
        return Err(ConfigError::Validation(
            "suggest.min_confidence must be in range [0, 1)".to_string(),
        ));
    }

    if suggest.max_suggestions == 0 {
        return Err(ConfigError::Validation(
            "suggest.max_suggestions must be greater than zero".to_string(),
        ));
    }

    if suggest.candidate_cap < suggest.max_suggestions {
        return Err(ConfigError::Validation(
            "suggest.candidate_cap must be at least suggest.max_suggestions".to_string(),
        ));
    }

    Ok(())
}

fn validate_artifacts(artifacts: &ArtifactsConfig) -> Result<(), ConfigError> {
    if artifacts.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("artifacts.dir must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    normalize: Option<NormalizePatch>,
    mining: Option<MiningPatch>,
    suggest: Option<SuggestPatch>,
    artifacts: Option<ArtifactsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NormalizePatch {
    excluded_groups: Option<Vec<String>>,
    excluded_goods: Option<Vec<String>>,
    min_positions: Option<usize>,
    employee_min_transactions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct MiningPatch {
    min_support: Option<f64>,
    min_itemset_len: Option<usize>,
    max_itemset_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestPatch {
    min_confidence: Option<f64>,
    max_suggestions: Option<usize>,
    candidate_cap: Option<usize>,
    employee_affinity: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtifactsPatch {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
