use basket_core::artifacts::ArtifactStore;
use basket_core::config::AppConfig;
use basket_core::mining::{build_index, min_count, FpGrowth};
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "mine";

#[derive(Debug, Serialize)]
struct MineSummary {
    transactions: usize,
    min_support: f64,
    min_count: u64,
    itemsets: usize,
    top_support: Option<u64>,
}

pub fn run(config: &AppConfig) -> CommandResult {
    let store = ArtifactStore::new(&config.artifacts.dir);
    let dataset = match store.load_dataset() {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let miner = FpGrowth::with_max_len(config.mining.max_itemset_len);
    let index = build_index(&miner, &dataset, &config.mining);
    if let Err(error) = store.save_index(&index, &dataset) {
        return CommandResult::from_error(COMMAND, error);
    }

    let summary = MineSummary {
        transactions: dataset.transactions.len(),
        min_support: config.mining.min_support,
        min_count: min_count(config.mining.min_support, dataset.transactions.len()),
        itemsets: index.len(),
        top_support: index.iter().next().map(|itemset| itemset.support),
    };
    CommandResult::success_with(
        COMMAND,
        format!("indexed {} frequent itemsets", summary.itemsets),
        summary,
    )
}
