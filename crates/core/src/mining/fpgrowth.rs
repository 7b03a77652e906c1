//! FP-growth frequent itemset miner.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use crate::domain::{GoodId, Itemset};

use super::ItemsetMiner;

/// Mines every itemset whose absolute support reaches
/// `max(1, ceil(min_support * transactions))`.
#[derive(Clone, Debug, Default)]
pub struct FpGrowth {
    max_len: Option<usize>,
}

struct FpNode {
    item: Option<GoodId>,
    count: u64,
    parent: Option<usize>,
    children: HashMap<GoodId, usize>,
}

struct FpTree {
    nodes: Vec<FpNode>,
    header: BTreeMap<GoodId, Vec<usize>>,
    supports: HashMap<GoodId, u64>,
}

type WeightedLists = Vec<(Vec<GoodId>, u64)>;

impl FpGrowth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops growing patterns once they reach `max_len` items.
    pub fn with_max_len(max_len: Option<usize>) -> Self {
        Self { max_len }
    }

    fn grow(
        &self,
        lists: &[(Vec<GoodId>, u64)],
        suffix: &mut Vec<GoodId>,
        min_count: u64,
        out: &mut Vec<Itemset>,
    ) {
        let tree = FpTree::build(lists, min_count);

        for (item, support) in tree.items_by_ascending_support() {
            suffix.push(item);

            let mut items = suffix.clone();
            items.sort_unstable();
            out.push(Itemset::new(items, support));

            let may_extend = self.max_len.map_or(true, |max| suffix.len() < max);
            if may_extend {
                let conditional = tree.prefix_paths(item);
                if !conditional.is_empty() {
                    self.grow(&conditional, suffix, min_count, out);
                }
            }

            suffix.pop();
        }
    }
}

impl ItemsetMiner for FpGrowth {
    fn mine(&self, item_lists: &[Vec<GoodId>], min_support: f64) -> Vec<Itemset> {
        let min_count = min_count(min_support, item_lists.len());
        let lists: WeightedLists = item_lists.iter().map(|items| (items.clone(), 1)).collect();

        let mut out = Vec::new();
        self.grow(&lists, &mut Vec::new(), min_count, &mut out);
        out
    }
}

/// Absolute count threshold for a support fraction.
pub fn min_count(min_support: f64, transactions: usize) -> u64 {
    let scaled = (min_support * transactions as f64).ceil();
    if scaled.is_finite() && scaled > 1.0 {
        scaled as u64
    } else {
        1
    }
}

impl FpTree {
    fn build(lists: &[(Vec<GoodId>, u64)], min_count: u64) -> Self {
        let mut supports: HashMap<GoodId, u64> = HashMap::new();
        for (items, weight) in lists {
            for item in items {
                *supports.entry(*item).or_default() += weight;
            }
        }
        supports.retain(|_, count| *count >= min_count);

        let root = FpNode { item: None, count: 0, parent: None, children: HashMap::new() };
        let mut tree = Self { nodes: vec![root], header: BTreeMap::new(), supports };

        for (items, weight) in lists {
            let mut path: Vec<GoodId> =
                items.iter().copied().filter(|item| tree.supports.contains_key(item)).collect();
            path.sort_by_key(|item| (Reverse(tree.support(*item)), *item));

            let mut node = 0;
            for item in path {
                node = tree.insert_child(node, item, *weight);
            }
        }

        tree
    }

    fn support(&self, item: GoodId) -> u64 {
        self.supports.get(&item).copied().unwrap_or(0)
    }

    fn insert_child(&mut self, parent: usize, item: GoodId, weight: u64) -> usize {
        if let Some(&child) = self.nodes[parent].children.get(&item) {
            self.nodes[child].count += weight;
            return child;
        }

        let index = self.nodes.len();
        self.nodes.push(FpNode {
            item: Some(item),
            count: weight,
            parent: Some(parent),
            children: HashMap::new(),
        });
        self.nodes[parent].children.insert(item, index);
        self.header.entry(item).or_default().push(index);
        index
    }

    fn items_by_ascending_support(&self) -> Vec<(GoodId, u64)> {
        let mut items: Vec<(GoodId, u64)> =
            self.header.keys().map(|item| (*item, self.support(*item))).collect();
        items.sort_by_key(|(item, support)| (*support, *item));
        items
    }

    /// Conditional pattern base of `item`: each ancestor path weighted by the node count.
    fn prefix_paths(&self, item: GoodId) -> WeightedLists {
        let Some(nodes) = self.header.get(&item) else {
            return Vec::new();
        };

        nodes
            .iter()
            .filter_map(|&index| {
                let count = self.nodes[index].count;
                let mut path = Vec::new();
                let mut cursor = self.nodes[index].parent;
                while let Some(parent) = cursor {
                    if let Some(parent_item) = self.nodes[parent].item {
                        path.push(parent_item);
                    }
                    cursor = self.nodes[parent].parent;
                }
                (!path.is_empty()).then_some((path, count))
            })
            .collect()
    }
}
