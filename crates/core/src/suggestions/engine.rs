//! Suggestion Engine implementation

use std::collections::HashMap;

use tracing::debug;

use super::matching::{collect_candidates, top_by};
use super::types::{Strategy, Suggestion};
use super::SuggestionResult;
use crate::config::SuggestConfig;
use crate::domain::{Dataset, GoodId};
use crate::errors::DomainError;
use crate::mining::FrequentItemsetIndex;
use crate::stats::AssociationStat;

/// Read-only query surface over a loaded corpus and its itemset index.
#[derive(Debug, Clone)]
pub struct SuggestionEngine<'a> {
    dataset: &'a Dataset,
    index: &'a FrequentItemsetIndex,
    config: SuggestConfig,
}

impl<'a> SuggestionEngine<'a> {
    pub fn new(dataset: &'a Dataset, index: &'a FrequentItemsetIndex, config: SuggestConfig) -> Self {
        Self { dataset, index, config }
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    /// Dispatches to the strategy. `tr_num` is ignored by the indexed strategy.
    pub fn suggest(
        &self,
        strategy: Strategy,
        tr_num: usize,
        selected: &[GoodId],
    ) -> SuggestionResult<Vec<Suggestion>> {
        match strategy {
            Strategy::Exact => self.suggest_exact(tr_num, selected),
            Strategy::Indexed => self.suggest_indexed(selected),
            Strategy::Affinity => self.suggest_affinity(tr_num),
        }
    }

    /// Goods most likely to join `selected`, ranked by confidence then lift.
    ///
    /// Transaction `tr_num` is left out of every count.
    pub fn suggest_exact(
        &self,
        tr_num: usize,
        selected: &[GoodId],
    ) -> SuggestionResult<Vec<Suggestion>> {
        if self.dataset.is_empty() {
            return Ok(Vec::new());
        }
        let selected = self.validate_selection(selected)?;
        self.check_transaction(tr_num)?;

        let transactions = &self.dataset.transactions;
        let goods = self.dataset.goods.len();
        let mut xc = 0u64;
        let mut yc = vec![0u64; goods];
        let mut c = vec![0u64; goods];

        for (position, transaction) in transactions.iter().enumerate() {
            if position == tr_num {
                continue;
            }
            let antecedent_hit = transaction.contains_all(&selected);
            if antecedent_hit {
                xc += 1;
            }
            for good in &transaction.positions {
                if let Some(count) = yc.get_mut(good.index()) {
                    *count += 1;
                }
                if antecedent_hit {
                    if let Some(count) = c.get_mut(good.index()) {
                        *count += 1;
                    }
                }
            }
        }

        let counted = transactions.len() as u64 - 1;
        let mut scored: Vec<(GoodId, AssociationStat)> = self
            .dataset
            .goods
            .iter()
            .filter(|good| selected.binary_search(&good.id).is_err())
            .map(|good| {
                let index = good.id.index();
                (good.id, AssociationStat::from_counts(c[index], xc, yc[index], counted))
            })
            .filter(|(_, stat)| stat.confidence > self.config.min_confidence)
            .collect();

        scored.sort_by(|(_, a), (_, b)| {
            b.confidence.total_cmp(&a.confidence).then_with(|| b.lift.total_cmp(&a.lift))
        });
        scored.truncate(self.config.max_suggestions);

        debug!(
            event_name = "basket.suggest.exact",
            tr_num,
            selected = selected.len(),
            antecedent_count = xc,
            returned = scored.len(),
            "exact suggestions computed"
        );

        Ok(scored.into_iter().map(|(good, stat)| Suggestion::scored(good, stat)).collect())
    }

    /// Goods co-occurring with `selected` in the frequent itemset index.
    pub fn suggest_indexed(&self, selected: &[GoodId]) -> SuggestionResult<Vec<Suggestion>> {
        let selected = self.validate_selection(selected)?;
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = collect_candidates(
            &selected,
            self.index.iter().map(|itemset| itemset.items.as_slice()),
            self.config.candidate_cap,
        );
        let candidate_count = candidates.len();
        let ranked =
            top_by(candidates, self.config.max_suggestions, |good| self.dataset.support(good));

        debug!(
            event_name = "basket.suggest.indexed",
            selected = selected.len(),
            candidates = candidate_count,
            returned = ranked.len(),
            "indexed suggestions computed"
        );

        Ok(ranked.into_iter().map(Suggestion::unscored).collect())
    }

    /// Goods the employee of `tr_num` sold most often in earlier transactions.
    ///
    /// Empty unless employee affinity is enabled.
    pub fn suggest_affinity(&self, tr_num: usize) -> SuggestionResult<Vec<Suggestion>> {
        if !self.config.employee_affinity || self.dataset.is_empty() {
            return Ok(Vec::new());
        }
        self.check_transaction(tr_num)?;

        let transactions = &self.dataset.transactions;
        let employee = transactions[tr_num].employee;

        let mut order: Vec<GoodId> = Vec::new();
        let mut frequency: HashMap<GoodId, u64> = HashMap::new();
        for transaction in transactions[..tr_num].iter().filter(|tr| tr.employee == employee) {
            for good in &transaction.positions {
                let count = frequency.entry(*good).or_insert_with(|| {
                    order.push(*good);
                    0
                });
                *count += 1;
            }
        }

        let ranked = top_by(order, self.config.max_suggestions, |good| {
            frequency.get(&good).copied().unwrap_or(0)
        });

        debug!(
            event_name = "basket.suggest.affinity",
            tr_num,
            employee = %employee,
            distinct_goods = frequency.len(),
            returned = ranked.len(),
            "affinity suggestions computed"
        );

        Ok(ranked.into_iter().map(Suggestion::unscored).collect())
    }

    /// Sorted, deduplicated selection; every id must be in the goods dictionary.
    fn validate_selection(&self, selected: &[GoodId]) -> SuggestionResult<Vec<GoodId>> {
        if let Some(unknown) = selected.iter().find(|good| !self.dataset.has_good(**good)) {
            return Err(DomainError::InvalidSelection { good: *unknown });
        }

        let mut sorted = selected.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Ok(sorted)
    }

    fn check_transaction(&self, tr_num: usize) -> SuggestionResult<()> {
        let len = self.dataset.transactions.len();
        if tr_num >= len {
            return Err(DomainError::UnknownTransaction { index: tr_num, len });
        }
        Ok(())
    }
}
