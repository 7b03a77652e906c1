//! Association rule statistics.

use serde::{Deserialize, Serialize};

use crate::domain::{GoodId, Transaction};

/// Counts and derived measures for the rule `antecedent => consequent`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociationStat {
    /// Transactions containing the antecedent.
    pub xc: u64,
    /// Transactions containing antecedent and consequent.
    pub c: u64,
    pub confidence: f64,
    pub lift: f64,
}

impl AssociationStat {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds the statistic from raw counts over `l` transactions.
    ///
    /// Confidence is 0 when `xc == 0`; lift is 0 when `xc == 0` or `yc == 0`.
    pub fn from_counts(c: u64, xc: u64, yc: u64, l: u64) -> Self {
        let confidence = if xc == 0 { 0.0 } else { c as f64 / xc as f64 };
        let lift = if xc == 0 || yc == 0 {
            0.0
        } else {
            (c as f64 * l as f64) / (xc as f64 * yc as f64)
        };

        Self { xc, c, confidence, lift }
    }
}

/// Computes confidence and lift of `antecedent => consequent` over `transactions`.
///
/// Returns the zero statistic when the antecedent already holds the first
/// element of the consequent.
pub fn compute_stat(
    antecedent: &[GoodId],
    consequent: &[GoodId],
    transactions: &[Transaction],
) -> AssociationStat {
    if consequent.first().is_some_and(|first| antecedent.contains(first)) {
        return AssociationStat::zero();
    }

    let mut xc = 0;
    let mut yc = 0;
    let mut c = 0;
    for transaction in transactions {
        let has_x = transaction.contains_all(antecedent);
        let has_y = transaction.contains_all(consequent);
        if has_x {
            xc += 1;
        }
        if has_y {
            yc += 1;
        }
        if has_x && has_y {
            c += 1;
        }
    }

    AssociationStat::from_counts(c, xc, yc, transactions.len() as u64)
}
