use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use basket_cli::commands::{config, doctor, itemsets, mine, normalize, stat, suggest};
use basket_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use basket_core::suggestions::Strategy;
use serde_json::{json, Value};
use tempfile::TempDir;

#[test]
fn pipeline_commands_succeed_in_order() {
    let temp = TempDir::new().expect("temp dir");
    let config = config_for(temp.path());
    let input = write_sales(temp.path());

    let normalized = normalize::run(&config, &input);
    assert_eq!(normalized.exit_code, 0, "expected successful normalization");
    let payload = parse_payload(&normalized.output);
    assert_eq!(payload["command"], "normalize");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["transactions"], 5);
    assert_eq!(payload["data"]["dropped_short"], 1);

    let mined = mine::run(&config);
    assert_eq!(mined.exit_code, 0, "expected successful mining");
    let payload = parse_payload(&mined.output);
    assert_eq!(payload["command"], "mine");
    assert!(payload["data"]["itemsets"].as_u64().unwrap_or(0) > 0);

    let browsed = itemsets::run(&config, Some(3), None);
    assert_eq!(browsed.exit_code, 0, "expected itemset listing");
    let payload = parse_payload(&browsed.output);
    let listed = payload["data"].as_array().expect("itemset list");
    assert!(!listed.is_empty());
    assert!(listed.iter().all(|itemset| itemset["items"].as_array().map(Vec::len) == Some(3)));

    let searched = itemsets::run(&config, None, Some("milk"));
    let payload = parse_payload(&searched.output);
    let listed = payload["data"].as_array().expect("itemset list");
    assert!(listed.iter().all(|itemset| itemset["names"]
        .as_array()
        .is_some_and(|names| names.iter().any(|name| name == "Milk"))));

    let indexed = suggest::run(&config, Strategy::Indexed, 0, "0,1");
    assert_eq!(indexed.exit_code, 0, "expected indexed suggestions");
    let payload = parse_payload(&indexed.output);
    assert_eq!(payload["data"]["strategy"], "indexed");
    let suggestions = payload["data"]["suggestions"].as_array().expect("suggestions");
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().all(|s| s.get("stat").is_none()));

    let exact = suggest::run(&config, Strategy::Exact, 4, "0");
    assert_eq!(exact.exit_code, 0, "expected exact suggestions");
    let payload = parse_payload(&exact.output);
    let suggestions = payload["data"]["suggestions"].as_array().expect("suggestions");
    assert!(suggestions.iter().all(|s| s["stat"]["confidence"].as_f64().unwrap_or(0.0) > 0.05));

    let rule = stat::run(&config, "0", "1");
    assert_eq!(rule.exit_code, 0, "expected rule statistic");
    let payload = parse_payload(&rule.output);
    assert_eq!(payload["data"]["antecedent"][0]["name"], "Milk");
    assert!(payload["data"]["confidence"].as_f64().is_some());
}

#[test]
fn normalize_rejects_malformed_records() {
    let temp = TempDir::new().expect("temp dir");
    let config = config_for(temp.path());
    let input = temp.path().join("sales.json");
    fs::write(
        &input,
        json!([
            { "check": 1, "date": "2021-03-01 10:00:00", "empl": "Anna", "group": "Dairy", "good": "Milk" },
            { "check": 1, "date": "yesterday", "empl": "Anna", "group": "Dairy", "good": "Kefir" }
        ])
        .to_string(),
    )
    .expect("write sales");

    let result = normalize::run(&config, &input);
    assert_eq!(result.exit_code, 3, "expected malformed record exit code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "malformed_record");
    assert!(!config.artifacts.dir.join("transactions.json").exists());
}

#[test]
fn queries_fail_without_artifacts() {
    let temp = TempDir::new().expect("temp dir");
    let config = config_for(temp.path());

    let result = suggest::run(&config, Strategy::Exact, 0, "1");
    assert_eq!(result.exit_code, 5, "expected artifact failure code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "suggest");
    assert_eq!(payload["error_class"], "artifact");
}

#[test]
fn queries_reject_unknown_goods_and_bad_arguments() {
    let temp = TempDir::new().expect("temp dir");
    let config = config_for(temp.path());
    let input = write_sales(temp.path());
    assert_eq!(normalize::run(&config, &input).exit_code, 0);

    let unknown = suggest::run(&config, Strategy::Exact, 0, "0,900");
    assert_eq!(unknown.exit_code, 4, "expected query failure code");
    assert_eq!(parse_payload(&unknown.output)["error_class"], "invalid_selection");

    let out_of_range = suggest::run(&config, Strategy::Exact, 99, "0");
    assert_eq!(out_of_range.exit_code, 4, "expected query failure code");
    assert_eq!(parse_payload(&out_of_range.output)["error_class"], "unknown_transaction");

    let malformed = stat::run(&config, "zero", "1");
    assert_eq!(malformed.exit_code, 64, "expected invalid argument code");
    assert_eq!(parse_payload(&malformed.output)["error_class"], "invalid_argument");
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("BASKET_SUGGEST_MAX_SUGGESTIONS", "7")], || {
        let options = LoadOptions {
            overrides: ConfigOverrides {
                artifacts_dir: Some(PathBuf::from("/tmp/basket-artifacts")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };

        let result = config::run(options);
        assert_eq!(result.exit_code, 0, "expected config listing");

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains(
            "- suggest.max_suggestions = 7 (source: env (BASKET_SUGGEST_MAX_SUGGESTIONS))"
        ));
        assert!(message.contains("- artifacts.dir = /tmp/basket-artifacts (source: flag)"));
        assert!(message.contains("- suggest.candidate_cap = 100 (source: default)"));
    });
}

#[test]
fn config_returns_validation_failure_for_bad_env() {
    with_env(&[("BASKET_MINING_MIN_SUPPORT", "0")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_tracks_artifact_readiness() {
    with_env(&[], || {
        let temp = TempDir::new().expect("temp dir");
        let options = || LoadOptions {
            overrides: ConfigOverrides {
                artifacts_dir: Some(temp.path().join("data")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };

        let empty = doctor::run(options(), true);
        assert_eq!(empty.exit_code, 1, "expected failing doctor report");
        let report = parse_payload(&empty.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["status"], "pass");
        assert_eq!(report["checks"][1]["name"], "dataset_artifacts");
        assert_eq!(report["checks"][1]["status"], "fail");

        let config = config_for(temp.path());
        let input = write_sales(temp.path());
        assert_eq!(normalize::run(&config, &input).exit_code, 0);
        assert_eq!(mine::run(&config).exit_code, 0);

        let ready = doctor::run(options(), true);
        assert_eq!(ready.exit_code, 0, "expected passing doctor report");
        let report = parse_payload(&ready.output);
        assert_eq!(report["overall_status"], "pass");

        let human = doctor::run(options(), false);
        assert!(human.output.starts_with("doctor: all artifact checks passed"));
    });
}

fn config_for(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.artifacts.dir = root.join("data");
    config
}

fn write_sales(root: &Path) -> PathBuf {
    let baskets: [(i64, &str, &[&str]); 6] = [
        (11, "Anna", &["Milk", "Bread", "Eggs", "Butter"]),
        (12, "Anna", &["Milk", "Bread", "Eggs", "Cheese", "Пакет"]),
        (13, "Boris", &["Milk", "Bread", "Butter", "Tea"]),
        (14, "Boris", &["Tea", "Sugar"]),
        (15, "Anna", &["Milk", "Eggs", "Butter", "Cheese"]),
        (16, "Clara", &["Milk", "Bread", "Eggs", "Butter", "Tea"]),
    ];

    let mut lines = Vec::new();
    for (check, employee, goods) in baskets {
        for good in goods {
            let group = if *good == "Пакет" { "Упаковка" } else { "Grocery" };
            lines.push(json!({
                "check": check,
                "date": format!("2021-03-02T09:{:02}:00", check),
                "empl": employee,
                "group": group,
                "good": good,
            }));
        }
    }

    let path = root.join("sales.json");
    fs::write(&path, Value::Array(lines).to_string()).expect("write sales");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BASKET_NORMALIZE_EXCLUDED_GROUPS",
        "BASKET_NORMALIZE_EXCLUDED_GOODS",
        "BASKET_NORMALIZE_MIN_POSITIONS",
        "BASKET_NORMALIZE_EMPLOYEE_MIN_TRANSACTIONS",
        "BASKET_MINING_MIN_SUPPORT",
        "BASKET_MINING_MIN_ITEMSET_LEN",
        "BASKET_MINING_MAX_ITEMSET_LEN",
        "BASKET_SUGGEST_MIN_CONFIDENCE",
        "BASKET_SUGGEST_MAX_SUGGESTIONS",
        "BASKET_SUGGEST_CANDIDATE_CAP",
        "BASKET_SUGGEST_EMPLOYEE_AFFINITY",
        "BASKET_ARTIFACTS_DIR",
        "BASKET_LOGGING_LEVEL",
        "BASKET_LOGGING_FORMAT",
        "BASKET_LOG_LEVEL",
        "BASKET_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
