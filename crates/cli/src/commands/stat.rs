use basket_core::artifacts::ArtifactStore;
use basket_core::config::AppConfig;
use basket_core::domain::{Dataset, GoodId};
use basket_core::errors::DomainError;
use basket_core::stats::{compute_stat, AssociationStat};
use serde::Serialize;

use crate::commands::{parse_required_good_ids, CommandResult};

const COMMAND: &str = "stat";

#[derive(Debug, Serialize)]
struct NamedGood {
    id: GoodId,
    name: String,
}

#[derive(Debug, Serialize)]
struct RuleStat {
    antecedent: Vec<NamedGood>,
    consequent: Vec<NamedGood>,
    #[serde(flatten)]
    stat: AssociationStat,
}

pub fn run(config: &AppConfig, antecedent: &str, consequent: &str) -> CommandResult {
    let parsed = parse_required_good_ids("antecedent", antecedent)
        .and_then(|x| parse_required_good_ids("consequent", consequent).map(|y| (x, y)));
    let (antecedent, consequent) = match parsed {
        Ok(rule) => rule,
        Err(error) => return CommandResult::invalid_argument(COMMAND, &error),
    };

    let dataset = match ArtifactStore::new(&config.artifacts.dir).load_dataset() {
        Ok(dataset) => dataset,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let (antecedent, consequent) = match (named(&dataset, &antecedent), named(&dataset, &consequent))
    {
        (Ok(antecedent), Ok(consequent)) => (antecedent, consequent),
        (Err(error), _) | (_, Err(error)) => return CommandResult::from_error(COMMAND, error),
    };

    let x: Vec<GoodId> = antecedent.iter().map(|good| good.id).collect();
    let y: Vec<GoodId> = consequent.iter().map(|good| good.id).collect();
    let stat = compute_stat(&x, &y, &dataset.transactions);

    CommandResult::success_with(
        COMMAND,
        format!("confidence {:.4}, lift {:.4}", stat.confidence, stat.lift),
        RuleStat { antecedent, consequent, stat },
    )
}

fn named(dataset: &Dataset, ids: &[GoodId]) -> Result<Vec<NamedGood>, DomainError> {
    ids.iter()
        .map(|id| {
            dataset
                .good_name(*id)
                .map(|name| NamedGood { id: *id, name: name.to_string() })
                .ok_or(DomainError::InvalidSelection { good: *id })
        })
        .collect()
}
