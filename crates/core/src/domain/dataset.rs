use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::good::{Good, GoodId, GroupId};
use crate::domain::transaction::Transaction;

/// Normalized corpus: dictionaries plus the retained transactions.
///
/// `goods` is dense: the good with id `n` sits at index `n`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub employees: BTreeMap<EmployeeId, String>,
    pub groups: BTreeMap<GroupId, String>,
    pub goods: Vec<Good>,
    pub transactions: Vec<Transaction>,
}

impl Dataset {
    pub fn good(&self, id: GoodId) -> Option<&Good> {
        self.goods.get(id.index()).filter(|good| good.id == id)
    }

    pub fn has_good(&self, id: GoodId) -> bool {
        self.good(id).is_some()
    }

    pub fn good_name(&self, id: GoodId) -> Option<&str> {
        self.good(id).map(|good| good.name.as_str())
    }

    pub fn support(&self, id: GoodId) -> u64 {
        self.good(id).map(|good| good.support).unwrap_or(0)
    }

    pub fn support_map(&self) -> BTreeMap<GoodId, u64> {
        self.goods.iter().map(|good| (good.id, good.support)).collect()
    }

    pub fn good_names(&self) -> BTreeMap<GoodId, String> {
        self.goods.iter().map(|good| (good.id, good.name.clone())).collect()
    }

    pub fn goods_to_groups(&self) -> BTreeMap<GoodId, GroupId> {
        self.goods.iter().map(|good| (good.id, good.group)).collect()
    }

    pub fn item_lists(&self) -> Vec<Vec<GoodId>> {
        self.transactions.iter().map(|tr| tr.positions.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
