//! Frequent itemset mining
//!
//! The miner itself is an injected capability ([`ItemsetMiner`]); this module owns
//! the post-filter that turns raw oracle output into the [`FrequentItemsetIndex`].

mod fpgrowth;

use std::slice;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MiningConfig;
use crate::domain::{Dataset, GoodId, Itemset};

pub use fpgrowth::{min_count, FpGrowth};

/// Default support fraction handed to the miner; effectively "seen at least once".
pub const DEFAULT_MIN_SUPPORT: f64 = 0.00001;

/// Itemsets are indexed only when they hold strictly more items than this.
pub const DEFAULT_MIN_ITEMSET_LEN: usize = 2;

/// Maximum number of itemsets returned by the browsing filters.
pub const BROWSE_LIMIT: usize = 200;

/// Frequent itemset oracle: given item lists and a support fraction, returns
/// itemsets with their absolute support counts.
pub trait ItemsetMiner {
    fn mine(&self, item_lists: &[Vec<GoodId>], min_support: f64) -> Vec<Itemset>;
}

/// Itemsets sorted by descending support; the order doubles as a relevance ranking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequentItemsetIndex {
    itemsets: Vec<Itemset>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexViolation {
    UnsortedItems { position: usize },
    SupportOrder { position: usize },
    ZeroSupport { position: usize },
}

impl std::fmt::Display for IndexViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsortedItems { position } => {
                write!(f, "itemset #{position} is not strictly ascending")
            }
            Self::SupportOrder { position } => {
                write!(f, "itemset #{position} has more support than its predecessor")
            }
            Self::ZeroSupport { position } => write!(f, "itemset #{position} has zero support"),
        }
    }
}

impl FrequentItemsetIndex {
    /// Applies the index post-filter to raw miner output.
    ///
    /// Keeps itemsets longer than `min_itemset_len` with non-zero support, sorts the
    /// items of each, then stable-sorts the collection by descending support.
    pub fn from_mined(mined: Vec<Itemset>, min_itemset_len: usize) -> Self {
        let mut itemsets: Vec<Itemset> = mined
            .into_iter()
            .filter(|itemset| itemset.len() > min_itemset_len && itemset.support >= 1)
            .map(|mut itemset| {
                itemset.items.sort_unstable();
                itemset.items.dedup();
                itemset
            })
            .collect();
        itemsets.sort_by(|a, b| b.support.cmp(&a.support));

        Self { itemsets }
    }

    /// Wraps an index read back from storage, checking its ordering invariants.
    pub fn from_stored(itemsets: Vec<Itemset>) -> Result<Self, IndexViolation> {
        for (position, itemset) in itemsets.iter().enumerate() {
            if itemset.support == 0 {
                return Err(IndexViolation::ZeroSupport { position });
            }
            if !itemset.items.windows(2).all(|pair| pair[0] < pair[1]) {
                return Err(IndexViolation::UnsortedItems { position });
            }
            if position > 0 && itemsets[position - 1].support < itemset.support {
                return Err(IndexViolation::SupportOrder { position });
            }
        }

        Ok(Self { itemsets })
    }

    pub fn iter(&self) -> slice::Iter<'_, Itemset> {
        self.itemsets.iter()
    }

    pub fn as_slice(&self) -> &[Itemset] {
        &self.itemsets
    }

    pub fn len(&self) -> usize {
        self.itemsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itemsets.is_empty()
    }

    /// Itemsets with exactly `len` items, at most [`BROWSE_LIMIT`].
    pub fn with_len(&self, len: usize) -> Vec<&Itemset> {
        self.itemsets.iter().filter(|itemset| itemset.len() == len).take(BROWSE_LIMIT).collect()
    }

    /// Itemsets containing a good whose name includes one of the comma separated
    /// terms (case-insensitive). Terms of two characters or fewer are ignored.
    pub fn search<'a>(&'a self, dataset: &Dataset, query: &str) -> Vec<&'a Itemset> {
        let terms: Vec<String> = query
            .split(',')
            .map(|term| term.trim().to_lowercase())
            .filter(|term| term.chars().count() > 2)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        self.itemsets
            .iter()
            .filter(|itemset| {
                itemset.items.iter().any(|good| {
                    dataset.good_name(*good).is_some_and(|name| {
                        let name = name.to_lowercase();
                        terms.iter().any(|term| name.contains(term.as_str()))
                    })
                })
            })
            .take(BROWSE_LIMIT)
            .collect()
    }
}

impl<'a> IntoIterator for &'a FrequentItemsetIndex {
    type Item = &'a Itemset;
    type IntoIter = slice::Iter<'a, Itemset>;

    fn into_iter(self) -> Self::IntoIter {
        self.itemsets.iter()
    }
}

/// Runs the miner over the dataset's transactions and builds the index.
pub fn build_index(
    miner: &dyn ItemsetMiner,
    dataset: &Dataset,
    config: &MiningConfig,
) -> FrequentItemsetIndex {
    let item_lists = dataset.item_lists();
    let mined = miner.mine(&item_lists, config.min_support);
    let mined_count = mined.len();
    let index = FrequentItemsetIndex::from_mined(mined, config.min_itemset_len);

    info!(
        event_name = "basket.mine.completed",
        transactions = item_lists.len(),
        min_support = config.min_support,
        min_count = min_count(config.min_support, item_lists.len()),
        mined = mined_count,
        indexed = index.len(),
        "frequent itemset index built"
    );

    index
}
