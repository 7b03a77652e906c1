use basket_core::artifacts::ArtifactStore;
use basket_core::config::AppConfig;
use basket_core::domain::GoodId;
use basket_core::mining::FrequentItemsetIndex;
use basket_core::stats::AssociationStat;
use basket_core::suggestions::{Strategy, SuggestionEngine};
use serde::Serialize;

use crate::commands::{parse_good_ids, CommandResult};

const COMMAND: &str = "suggest";

#[derive(Debug, Serialize)]
struct SuggestionView {
    good: GoodId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stat: Option<AssociationStat>,
}

#[derive(Debug, Serialize)]
struct SuggestionReport {
    strategy: Strategy,
    transaction: usize,
    selected: Vec<GoodId>,
    suggestions: Vec<SuggestionView>,
}

pub fn run(
    config: &AppConfig,
    strategy: Strategy,
    transaction: usize,
    selected: &str,
) -> CommandResult {
    let selected = match parse_good_ids(selected) {
        Ok(selected) => selected,
        Err(error) => return CommandResult::invalid_argument(COMMAND, &error),
    };

    let store = ArtifactStore::new(&config.artifacts.dir);
    let dataset = match store.load_dataset() {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };
    let index = if strategy == Strategy::Indexed {
        match store.load_index() {
            Ok(index) => index,
            Err(error) => return CommandResult::from_error(COMMAND, error),
        }
    } else {
        FrequentItemsetIndex::default()
    };

    let engine = SuggestionEngine::new(&dataset, &index, config.suggest.clone());
    let suggestions = match engine.suggest(strategy, transaction, &selected) {
        Ok(suggestions) => suggestions,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let suggestions: Vec<SuggestionView> = suggestions
        .into_iter()
        .map(|suggestion| SuggestionView {
            good: suggestion.good,
            name: dataset.good_name(suggestion.good).unwrap_or_default().to_string(),
            stat: suggestion.stat,
        })
        .collect();

    CommandResult::success_with(
        COMMAND,
        format!("{} {} suggestions", suggestions.len(), strategy.as_str()),
        SuggestionReport { strategy, transaction, selected, suggestions },
    )
}
