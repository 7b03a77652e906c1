use serde::{Deserialize, Serialize};

use crate::domain::good::GoodId;

/// A frequent pattern: ascending good ids and the number of transactions containing them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itemset {
    pub items: Vec<GoodId>,
    pub support: u64,
}

impl Itemset {
    pub fn new(items: Vec<GoodId>, support: u64) -> Self {
        Self { items, support }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
