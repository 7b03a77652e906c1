use basket_core::artifacts::{ArtifactStore, DATASET_FILES, INDEX_FILES};
use basket_core::config::{AppConfig, LoadOptions};
use basket_core::domain::Dataset;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            check_artifacts(&config, &mut checks);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["dataset_artifacts", "dataset_consistency", "index_artifacts", "index_consistency"]
            {
                checks.push(skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all artifact checks passed".to_string()
    } else {
        "doctor: one or more checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_artifacts(config: &AppConfig, checks: &mut Vec<DoctorCheck>) {
    let store = ArtifactStore::new(&config.artifacts.dir);

    let dataset_present = check_presence("dataset_artifacts", &store, &DATASET_FILES);
    let dataset_ready = dataset_present.status == CheckStatus::Pass;
    checks.push(dataset_present);

    let dataset = if dataset_ready {
        match store.load_dataset() {
            Ok(dataset) => {
                checks.push(check_dataset(config, &dataset));
                Some(dataset)
            }
            Err(error) => {
                checks.push(DoctorCheck {
                    name: "dataset_consistency",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                });
                None
            }
        }
    } else {
        checks.push(skipped("dataset_consistency", "dataset artifacts are missing"));
        None
    };

    let index_present = check_presence("index_artifacts", &store, &INDEX_FILES);
    let index_ready = index_present.status == CheckStatus::Pass;
    checks.push(index_present);

    let Some(dataset) = dataset.filter(|_| index_ready) else {
        checks.push(skipped("index_consistency", "dataset or index is unavailable"));
        return;
    };

    let check = match store.load_index() {
        Ok(index) => {
            let unknown = index
                .iter()
                .flat_map(|itemset| itemset.items.iter())
                .find(|good| !dataset.has_good(**good));
            let too_short =
                index.iter().position(|itemset| itemset.len() <= config.mining.min_itemset_len);
            match (unknown, too_short) {
                (Some(good), _) => DoctorCheck {
                    name: "index_consistency",
                    status: CheckStatus::Fail,
                    details: format!("itemset references unknown good {good}"),
                },
                (None, Some(position)) => DoctorCheck {
                    name: "index_consistency",
                    status: CheckStatus::Fail,
                    details: format!(
                        "itemset #{position} has no more than {} goods",
                        config.mining.min_itemset_len
                    ),
                },
                (None, None) => DoctorCheck {
                    name: "index_consistency",
                    status: CheckStatus::Pass,
                    details: format!("{} itemsets sorted by support", index.len()),
                },
            }
        }
        Err(error) => DoctorCheck {
            name: "index_consistency",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    };
    checks.push(check);
}

fn check_presence(name: &'static str, store: &ArtifactStore, files: &[&str]) -> DoctorCheck {
    let missing: Vec<&str> = files.iter().copied().filter(|file| !store.exists(file)).collect();
    if missing.is_empty() {
        DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("{} files present in {}", files.len(), store.dir().display()),
        }
    } else {
        DoctorCheck {
            name,
            status: CheckStatus::Fail,
            details: format!("missing in {}: {}", store.dir().display(), missing.join(", ")),
        }
    }
}

fn check_dataset(config: &AppConfig, dataset: &Dataset) -> DoctorCheck {
    let min_positions = config.normalize.min_positions;
    if let Some(position) =
        dataset.transactions.iter().position(|transaction| transaction.len() <= min_positions)
    {
        return DoctorCheck {
            name: "dataset_consistency",
            status: CheckStatus::Fail,
            details: format!("transaction #{position} has no more than {min_positions} positions"),
        };
    }

    let mut counts = vec![0u64; dataset.goods.len()];
    for good in dataset.transactions.iter().flat_map(|transaction| transaction.positions.iter()) {
        counts[good.index()] += 1;
    }
    if let Some(good) = dataset.goods.iter().find(|good| counts[good.id.index()] != good.support) {
        return DoctorCheck {
            name: "dataset_consistency",
            status: CheckStatus::Fail,
            details: format!(
                "support of good {} is {} but {} transactions contain it",
                good.id,
                good.support,
                counts[good.id.index()]
            ),
        };
    }

    DoctorCheck {
        name: "dataset_consistency",
        status: CheckStatus::Pass,
        details: format!(
            "{} transactions, {} goods, {} employees",
            dataset.transactions.len(),
            dataset.goods.len(),
            dataset.employees.len()
        ),
    }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
