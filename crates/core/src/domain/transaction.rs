use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::good::GoodId;

/// One retained check. `positions` is strictly ascending with no duplicates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    /// Sequence number of the check in ingestion order.
    pub check: u64,
    pub employee: EmployeeId,
    pub positions: Vec<GoodId>,
}

impl Transaction {
    pub fn contains(&self, good: GoodId) -> bool {
        self.positions.binary_search(&good).is_ok()
    }

    pub fn contains_all(&self, goods: &[GoodId]) -> bool {
        goods.iter().all(|good| self.contains(*good))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
