//! Types for the Suggestion Engine

use serde::{Deserialize, Serialize};

use crate::domain::GoodId;
use crate::stats::AssociationStat;

/// A suggested good, with its rule statistic when the strategy computes one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Suggested good
    pub good: GoodId,
    /// Rule statistic; absent for strategies that do not compute one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<AssociationStat>,
}

impl Suggestion {
    /// Suggestion backed by a computed statistic
    pub fn scored(good: GoodId, stat: AssociationStat) -> Self {
        Self { good, stat: Some(stat) }
    }

    /// Suggestion without statistic
    pub fn unscored(good: GoodId) -> Self {
        Self { good, stat: None }
    }
}

/// Strategy used to produce suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Full association statistics over the corpus
    Exact,
    /// Lookup in the frequent itemset index
    Indexed,
    /// Goods the same employee sold earlier
    Affinity,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Indexed => "indexed",
            Self::Affinity => "affinity",
        }
    }

    /// Whether results carry a meaningful statistic
    pub fn computes_stats(&self) -> bool {
        matches!(self, Self::Exact)
    }
}

#[cfg(test)]
mod tests {
    use super::{Strategy, Suggestion};
    use crate::domain::GoodId;
    use crate::stats::AssociationStat;

    #[test]
    fn unscored_suggestion_omits_stat_when_serialized() {
        let json = serde_json::to_value(Suggestion::unscored(GoodId(4))).expect("serialize");
        assert_eq!(json, serde_json::json!({ "good": 4 }));

        let scored = Suggestion::scored(GoodId(4), AssociationStat::from_counts(1, 2, 2, 4));
        let json = serde_json::to_value(scored).expect("serialize");
        assert_eq!(json["stat"]["confidence"], serde_json::json!(0.5));
    }

    #[test]
    fn only_exact_strategy_computes_stats() {
        assert!(Strategy::Exact.computes_stats());
        assert!(!Strategy::Indexed.computes_stats());
        assert!(!Strategy::Affinity.computes_stats());
        assert_eq!(Strategy::Affinity.as_str(), "affinity");
    }
}
