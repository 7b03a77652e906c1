//! Sale-line normalization
//!
//! Turns the raw point-of-sale export into a [`Dataset`]: dense dictionaries for
//! employees, groups and goods, the retained transactions, and per-good support.
//! Ids are handed out in first-seen order while walking the export sorted by check.

mod record;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::NormalizeConfig;
use crate::domain::{Dataset, EmployeeId, Good, GoodId, GroupId, Transaction};
use crate::errors::DomainError;

pub use record::{parse_timestamp, SaleRecord};

/// Transactions need strictly more distinct positions than this.
pub const DEFAULT_MIN_POSITIONS: usize = 3;

/// Employees need strictly more retained transactions than this.
pub const DEFAULT_EMPLOYEE_MIN_TRANSACTIONS: usize = 0;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub raw_records: usize,
    pub checks_seen: usize,
    pub dropped_short: usize,
    pub dropped_by_employee: usize,
    pub employees: usize,
    pub groups: usize,
    pub goods: usize,
    pub transactions: usize,
    /// Retained transactions keyed by number of positions.
    pub checks_by_length: BTreeMap<usize, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized {
    pub dataset: Dataset,
    pub report: NormalizationReport,
}

pub struct Normalizer<'a> {
    config: &'a NormalizeConfig,
    excluded_groups: HashSet<&'a str>,
    excluded_goods: HashSet<&'a str>,
}

/// Dense id assignment owned by a single normalization run.
#[derive(Default)]
struct Dictionaries {
    employee_ids: HashMap<String, EmployeeId>,
    employee_names: Vec<String>,
    group_ids: HashMap<String, GroupId>,
    group_names: Vec<String>,
    good_ids: HashMap<String, GoodId>,
    good_entries: Vec<(String, GroupId)>,
}

struct OpenCheck {
    date: DateTime<Utc>,
    check: u64,
    employee: EmployeeId,
    positions: Vec<GoodId>,
}

impl Dictionaries {
    fn employee(&mut self, name: &str) -> EmployeeId {
        if let Some(id) = self.employee_ids.get(name) {
            return *id;
        }
        let id = EmployeeId(self.employee_names.len() as u32);
        self.employee_ids.insert(name.to_owned(), id);
        self.employee_names.push(name.to_owned());
        id
    }

    fn group(&mut self, name: &str) -> GroupId {
        if let Some(id) = self.group_ids.get(name) {
            return *id;
        }
        let id = GroupId(self.group_names.len() as u32);
        self.group_ids.insert(name.to_owned(), id);
        self.group_names.push(name.to_owned());
        id
    }

    fn good(&mut self, name: &str, group: GroupId) -> GoodId {
        if let Some(id) = self.good_ids.get(name) {
            return *id;
        }
        let id = GoodId(self.good_entries.len() as u32);
        self.good_ids.insert(name.to_owned(), id);
        self.good_entries.push((name.to_owned(), group));
        id
    }
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a NormalizeConfig) -> Self {
        Self {
            config,
            excluded_groups: config.excluded_groups.iter().map(String::as_str).collect(),
            excluded_goods: config.excluded_goods.iter().map(String::as_str).collect(),
        }
    }

    /// Validates every raw element first; nothing is normalized if any element is malformed.
    pub fn normalize_values(
        &self,
        values: Vec<serde_json::Value>,
    ) -> Result<Normalized, DomainError> {
        let records = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| SaleRecord::from_value(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.normalize(&records))
    }

    pub fn normalize(&self, records: &[SaleRecord]) -> Normalized {
        let mut sorted: Vec<&SaleRecord> = records.iter().collect();
        sorted.sort_by_key(|record| record.check);

        let mut report = NormalizationReport { raw_records: records.len(), ..Default::default() };
        let mut dictionaries = Dictionaries::default();
        let mut transactions = Vec::new();
        let mut current: Option<OpenCheck> = None;
        let mut previous_check = None;
        let mut sequence = 0u64;

        for record in sorted {
            if previous_check != Some(record.check) {
                if let Some(open) = current.take() {
                    self.close(open, &mut transactions, &mut report);
                }

                current = Some(OpenCheck {
                    date: record.date,
                    check: sequence,
                    employee: dictionaries.employee(&record.employee),
                    positions: Vec::new(),
                });
                sequence += 1;
                previous_check = Some(record.check);
                report.checks_seen += 1;
            }

            if self.is_excluded(record) {
                continue;
            }

            let group = dictionaries.group(&record.group);
            let good = dictionaries.good(&record.good, group);
            if let Some(open) = current.as_mut() {
                open.positions.push(good);
            }
        }

        if let Some(open) = current.take() {
            self.close(open, &mut transactions, &mut report);
        }

        let dataset = self.finish(dictionaries, transactions, &mut report);

        info!(
            event_name = "basket.normalize.completed",
            raw_records = report.raw_records,
            checks_seen = report.checks_seen,
            dropped_short = report.dropped_short,
            dropped_by_employee = report.dropped_by_employee,
            employees = report.employees,
            groups = report.groups,
            goods = report.goods,
            transactions = report.transactions,
            "sale lines normalized"
        );

        Normalized { dataset, report }
    }

    fn is_excluded(&self, record: &SaleRecord) -> bool {
        self.excluded_groups.contains(record.group.as_str())
            || self.excluded_goods.contains(record.good.as_str())
    }

    fn close(
        &self,
        open: OpenCheck,
        transactions: &mut Vec<Transaction>,
        report: &mut NormalizationReport,
    ) {
        let mut positions = open.positions;
        positions.sort_unstable();
        positions.dedup();

        if positions.len() <= self.config.min_positions {
            debug!(
                event_name = "basket.normalize.check_dropped",
                check = open.check,
                positions = positions.len(),
                "check too short to keep"
            );
            report.dropped_short += 1;
            return;
        }

        transactions.push(Transaction {
            date: open.date,
            check: open.check,
            employee: open.employee,
            positions,
        });
    }

    fn finish(
        &self,
        dictionaries: Dictionaries,
        mut transactions: Vec<Transaction>,
        report: &mut NormalizationReport,
    ) -> Dataset {
        let mut per_employee: HashMap<EmployeeId, usize> = HashMap::new();
        for transaction in &transactions {
            *per_employee.entry(transaction.employee).or_default() += 1;
        }

        let threshold = self.config.employee_min_transactions;
        let employees: BTreeMap<EmployeeId, String> = dictionaries
            .employee_names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (EmployeeId(index as u32), name))
            .filter(|(id, _)| per_employee.get(id).copied().unwrap_or(0) > threshold)
            .collect();

        let before = transactions.len();
        transactions.retain(|transaction| employees.contains_key(&transaction.employee));
        report.dropped_by_employee = before - transactions.len();

        let mut support = vec![0u64; dictionaries.good_entries.len()];
        for transaction in &transactions {
            for good in &transaction.positions {
                support[good.index()] += 1;
            }
            *report.checks_by_length.entry(transaction.len()).or_default() += 1;
        }

        let goods: Vec<Good> = dictionaries
            .good_entries
            .into_iter()
            .zip(support)
            .enumerate()
            .map(|(index, ((name, group), support))| Good {
                id: GoodId(index as u32),
                name,
                group,
                support,
            })
            .collect();

        let groups: BTreeMap<GroupId, String> = dictionaries
            .group_names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (GroupId(index as u32), name))
            .collect();

        report.employees = employees.len();
        report.groups = groups.len();
        report.goods = goods.len();
        report.transactions = transactions.len();

        Dataset { employees, groups, goods, transactions }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    use super::{Normalizer, SaleRecord};
    use crate::config::NormalizeConfig;
    use crate::domain::{EmployeeId, GoodId, GroupId};
    use crate::errors::DomainError;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).single().expect("valid date")
            + Duration::minutes(minutes)
    }

    fn line(check: i64, employee: &str, group: &str, good: &str) -> SaleRecord {
        SaleRecord::new(check, at(check), employee, group, good)
    }

    fn basket(check: i64, employee: &str, goods: &[&str]) -> Vec<SaleRecord> {
        goods.iter().map(|good| line(check, employee, "Grocery", good)).collect()
    }

    fn config() -> NormalizeConfig {
        NormalizeConfig {
            excluded_groups: vec!["Tobacco".to_string()],
            excluded_goods: vec!["Bag".to_string()],
            ..NormalizeConfig::default()
        }
    }

    #[test]
    fn excluded_group_position_is_removed_from_transaction() {
        let mut records = basket(1, "anna", &["Milk", "Bread", "Eggs", "Cheese"]);
        records.push(line(1, "anna", "Tobacco", "Cigarettes"));
        records.push(line(1, "anna", "Grocery", "Bag"));

        let config = config();
        let normalized = Normalizer::new(&config).normalize(&records);
        let dataset = &normalized.dataset;

        assert_eq!(dataset.transactions.len(), 1);
        assert_eq!(dataset.transactions[0].positions, vec![GoodId(0), GoodId(1), GoodId(2), GoodId(3)]);
        assert!(dataset.goods.iter().all(|good| good.name != "Cigarettes" && good.name != "Bag"));
        assert!(dataset.groups.values().all(|group| group != "Tobacco"));
    }

    #[test]
    fn short_checks_are_dropped_after_dedup() {
        let mut records = basket(1, "anna", &["Milk", "Bread", "Eggs", "Cheese"]);
        records.extend(basket(2, "anna", &["Milk", "Milk", "Bread", "Eggs", "Bread"]));
        records.extend(basket(3, "anna", &["Milk", "Bread", "Eggs"]));

        let config = config();
        let normalized = Normalizer::new(&config).normalize(&records);

        assert_eq!(normalized.dataset.transactions.len(), 1);
        assert_eq!(normalized.dataset.transactions[0].check, 0);
        assert_eq!(normalized.report.checks_seen, 3);
        assert_eq!(normalized.report.dropped_short, 2);
    }

    #[test]
    fn records_are_grouped_by_check_regardless_of_input_order() {
        let mut records = Vec::new();
        records.push(line(20, "boris", "Grocery", "Tea"));
        records.extend(basket(10, "anna", &["Milk", "Bread", "Eggs", "Cheese"]));
        records.extend(basket(20, "boris", &["Sugar", "Lemon", "Honey"]));

        let config = config();
        let dataset = Normalizer::new(&config).normalize(&records).dataset;

        assert_eq!(dataset.transactions.len(), 2);
        // check 10 sorts first, so its goods get the lowest ids
        assert_eq!(dataset.good_name(GoodId(0)), Some("Milk"));
        assert_eq!(dataset.good_name(GoodId(4)), Some("Tea"));
        assert_eq!(dataset.transactions[1].employee, EmployeeId(1));
        assert_eq!(dataset.transactions[1].date, at(20));
        assert_eq!(dataset.transactions[1].positions.len(), 4);
    }

    #[test]
    fn positions_are_strictly_ascending() {
        let records = basket(1, "anna", &["Eggs", "Milk", "Bread", "Milk", "Cheese", "Apples"]);
        let mut more = basket(2, "anna", &["Apples", "Cheese", "Bread", "Eggs"]);
        more.extend(records);

        let config = config();
        let dataset = Normalizer::new(&config).normalize(&more).dataset;

        for transaction in &dataset.transactions {
            assert!(transaction.positions.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(transaction.positions.len() > 3);
        }
    }

    #[test]
    fn good_group_is_fixed_by_first_sighting() {
        let mut records = vec![
            line(1, "anna", "Dairy", "Milk"),
            line(1, "anna", "Grocery", "Bread"),
            line(1, "anna", "Grocery", "Eggs"),
            line(1, "anna", "Grocery", "Cheese"),
        ];
        records.push(line(2, "anna", "Promo", "Milk"));

        let config = config();
        let dataset = Normalizer::new(&config).normalize(&records).dataset;

        let milk = dataset.good(GoodId(0)).expect("milk is known");
        assert_eq!(milk.group, GroupId(0));
        assert_eq!(dataset.groups.get(&GroupId(2)).map(String::as_str), Some("Promo"));
    }

    #[test]
    fn employee_without_retained_transactions_is_removed() {
        let mut records = basket(1, "anna", &["Milk", "Bread", "Eggs", "Cheese"]);
        records.extend(basket(2, "boris", &["Milk", "Bread"]));
        records.extend(basket(3, "anna", &["Milk", "Bread", "Eggs", "Apples"]));

        let config = config();
        let normalized = Normalizer::new(&config).normalize(&records);
        let dataset = &normalized.dataset;

        assert_eq!(dataset.employees.len(), 1);
        assert_eq!(dataset.employees.get(&EmployeeId(0)).map(String::as_str), Some("anna"));
        assert!(dataset.transactions.iter().all(|tr| tr.employee == EmployeeId(0)));
    }

    #[test]
    fn employee_threshold_drops_their_transactions() {
        let mut records = basket(1, "anna", &["Milk", "Bread", "Eggs", "Cheese"]);
        records.extend(basket(2, "boris", &["Milk", "Bread", "Eggs", "Tea"]));
        records.extend(basket(3, "anna", &["Milk", "Bread", "Eggs", "Apples"]));

        let config = NormalizeConfig { employee_min_transactions: 1, ..config() };
        let normalized = Normalizer::new(&config).normalize(&records);
        let dataset = &normalized.dataset;

        assert!(!dataset.employees.values().any(|name| name == "boris"));
        assert_eq!(dataset.transactions.len(), 2);
        assert_eq!(normalized.report.dropped_by_employee, 1);

        // Tea only appeared in boris's check
        let tea = dataset.goods.iter().find(|good| good.name == "Tea").expect("tea has an id");
        assert_eq!(tea.support, 0);
    }

    #[test]
    fn support_counts_retained_transactions() {
        let mut records = basket(1, "anna", &["Milk", "Bread", "Eggs", "Cheese"]);
        records.extend(basket(2, "anna", &["Milk", "Bread", "Eggs", "Apples"]));
        records.extend(basket(3, "anna", &["Milk", "Tea", "Eggs", "Apples", "Milk"]));

        let config = config();
        let dataset = Normalizer::new(&config).normalize(&records).dataset;

        for good in &dataset.goods {
            let expected =
                dataset.transactions.iter().filter(|tr| tr.contains(good.id)).count() as u64;
            assert_eq!(good.support, expected, "support of {}", good.name);
        }
        assert_eq!(dataset.support(GoodId(0)), 3);
    }

    #[test]
    fn report_histogram_counts_lengths() {
        let mut records = basket(1, "anna", &["Milk", "Bread", "Eggs", "Cheese"]);
        records.extend(basket(2, "anna", &["Milk", "Bread", "Eggs", "Apples", "Tea"]));
        records.extend(basket(3, "anna", &["Milk", "Bread", "Eggs", "Apples"]));

        let config = config();
        let report = Normalizer::new(&config).normalize(&records).report;

        assert_eq!(report.checks_by_length.get(&4), Some(&2));
        assert_eq!(report.checks_by_length.get(&5), Some(&1));
        assert_eq!(report.transactions, 3);
        assert_eq!(report.raw_records, 13);
    }

    #[test]
    fn empty_input_produces_empty_dataset() {
        let config = config();
        let normalized = Normalizer::new(&config).normalize(&[]);

        assert!(normalized.dataset.is_empty());
        assert!(normalized.dataset.goods.is_empty());
        assert!(normalized.dataset.employees.is_empty());
        assert_eq!(normalized.report.checks_seen, 0);
    }

    #[test]
    fn malformed_value_aborts_the_run() {
        let values = vec![
            json!({ "check": 1, "date": "2021-03-01", "empl": "A", "group": "G", "good": "X" }),
            json!({ "check": 1, "date": "not-a-date", "empl": "A", "group": "G", "good": "Y" }),
        ];

        let config = config();
        let result = Normalizer::new(&config).normalize_values(values);

        assert!(matches!(result, Err(DomainError::MalformedRecord { index: 1, .. })));
    }
}
