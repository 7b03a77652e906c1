use basket_core::artifacts::ArtifactStore;
use basket_core::config::AppConfig;
use basket_core::domain::{Dataset, GoodId, Itemset};
use basket_core::mining::BROWSE_LIMIT;
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "itemsets";

#[derive(Debug, Serialize)]
struct ItemsetView {
    support: u64,
    items: Vec<GoodId>,
    names: Vec<String>,
}

pub fn run(config: &AppConfig, len: Option<usize>, search: Option<&str>) -> CommandResult {
    let store = ArtifactStore::new(&config.artifacts.dir);
    let dataset = match store.load_dataset() {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };
    let index = match store.load_index() {
        Ok(index) => index,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let selected: Vec<&Itemset> = match (len, search) {
        (Some(len), _) => index.with_len(len),
        (None, Some(query)) => index.search(&dataset, query),
        (None, None) => index.iter().take(BROWSE_LIMIT).collect(),
    };
    let views: Vec<ItemsetView> = selected.into_iter().map(|itemset| view(&dataset, itemset)).collect();

    CommandResult::success_with(
        COMMAND,
        format!("{} of {} itemsets", views.len(), index.len()),
        views,
    )
}

fn view(dataset: &Dataset, itemset: &Itemset) -> ItemsetView {
    ItemsetView {
        support: itemset.support,
        items: itemset.items.clone(),
        names: itemset
            .items
            .iter()
            .map(|good| dataset.good_name(*good).unwrap_or_default().to_string())
            .collect(),
    }
}
