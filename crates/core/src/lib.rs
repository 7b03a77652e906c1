pub mod artifacts;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mining;
pub mod normalize;
pub mod stats;
pub mod suggestions;

pub use artifacts::ArtifactStore;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::{Dataset, EmployeeId, Good, GoodId, GroupId, Itemset, Transaction};
pub use errors::{ApplicationError, ArtifactError, DomainError};
pub use mining::{build_index, FpGrowth, FrequentItemsetIndex, ItemsetMiner};
pub use normalize::{NormalizationReport, Normalized, Normalizer, SaleRecord};
pub use stats::{compute_stat, AssociationStat};
pub use suggestions::{Strategy, Suggestion, SuggestionEngine};
