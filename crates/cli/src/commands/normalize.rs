use std::path::Path;

use basket_core::artifacts::ArtifactStore;
use basket_core::config::AppConfig;
use basket_core::normalize::Normalizer;

use crate::commands::CommandResult;

const COMMAND: &str = "normalize";

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let records = match ArtifactStore::read_raw_records(input) {
        Ok(records) => records,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let normalized = match Normalizer::new(&config.normalize).normalize_values(records) {
        Ok(normalized) => normalized,
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let store = ArtifactStore::new(&config.artifacts.dir);
    if let Err(error) = store.save_dataset(&normalized.dataset) {
        return CommandResult::from_error(COMMAND, error);
    }

    let report = normalized.report;
    CommandResult::success_with(
        COMMAND,
        format!(
            "normalized {} sale lines into {} transactions under {}",
            report.raw_records,
            report.transactions,
            store.dir().display()
        ),
        &report,
    )
}
