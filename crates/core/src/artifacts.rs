//! On-disk artifacts: the normalized corpus and the frequent itemset index.
//!
//! Each structure is stored as plain JSON in the artifact directory so that it can
//! be reloaded verbatim without recomputation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::domain::{Dataset, EmployeeId, Good, GoodId, GroupId, Itemset, Transaction};
use crate::errors::ArtifactError;
use crate::mining::FrequentItemsetIndex;

pub const EMPLOYEES_FILE: &str = "employees.json";
pub const GOODS_FILE: &str = "goods.json";
pub const GROUPS_FILE: &str = "groups.json";
pub const GOODS_TO_GROUPS_FILE: &str = "goods2groups.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const GOODS_SUPPORT_FILE: &str = "goodssupport.json";
pub const INDEX_FILE: &str = "fp.json";
pub const INDEX_LISTING_FILE: &str = "fp.txt";

pub const DATASET_FILES: [&str; 6] = [
    EMPLOYEES_FILE,
    GOODS_FILE,
    GROUPS_FILE,
    GOODS_TO_GROUPS_FILE,
    TRANSACTIONS_FILE,
    GOODS_SUPPORT_FILE,
];

pub const INDEX_FILES: [&str; 2] = [INDEX_FILE, INDEX_LISTING_FILE];

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn exists(&self, file: &str) -> bool {
        self.path(file).is_file()
    }

    /// Reads a raw sale export: a JSON array of record objects.
    pub fn read_raw_records(path: &Path) -> Result<Vec<Value>, ArtifactError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ArtifactError::Read { path: path.to_path_buf(), source })?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|source| ArtifactError::Decode { path: path.to_path_buf(), source })?;

        match value {
            Value::Array(records) => Ok(records),
            other => Err(ArtifactError::Inconsistent {
                path: path.to_path_buf(),
                message: format!("expected an array of sale records, found {}", kind(&other)),
            }),
        }
    }

    pub fn save_dataset(&self, dataset: &Dataset) -> Result<(), ArtifactError> {
        self.ensure_dir()?;

        let goods: BTreeMap<GoodId, &str> =
            dataset.goods.iter().map(|good| (good.id, good.name.as_str())).collect();

        self.write_json(EMPLOYEES_FILE, &dataset.employees)?;
        self.write_json(GOODS_FILE, &goods)?;
        self.write_json(GROUPS_FILE, &dataset.groups)?;
        self.write_json(GOODS_TO_GROUPS_FILE, &dataset.goods_to_groups())?;
        self.write_json(TRANSACTIONS_FILE, &dataset.transactions)?;
        self.write_json(GOODS_SUPPORT_FILE, &dataset.support_map())?;

        info!(
            event_name = "basket.artifacts.dataset_saved",
            dir = %self.dir.display(),
            goods = dataset.goods.len(),
            transactions = dataset.transactions.len(),
            "normalized corpus written"
        );
        Ok(())
    }

    /// Reloads the corpus and checks that the files agree with each other.
    pub fn load_dataset(&self) -> Result<Dataset, ArtifactError> {
        let employees: BTreeMap<EmployeeId, String> = self.read_json(EMPLOYEES_FILE)?;
        let names: BTreeMap<GoodId, String> = self.read_json(GOODS_FILE)?;
        let groups: BTreeMap<GroupId, String> = self.read_json(GROUPS_FILE)?;
        let goods_to_groups: BTreeMap<GoodId, GroupId> = self.read_json(GOODS_TO_GROUPS_FILE)?;
        let transactions: Vec<Transaction> = self.read_json(TRANSACTIONS_FILE)?;
        let support: BTreeMap<GoodId, u64> = self.read_json(GOODS_SUPPORT_FILE)?;

        let mut goods = Vec::with_capacity(names.len());
        for (position, (id, name)) in names.into_iter().enumerate() {
            if id.index() != position {
                return Err(self.inconsistent(GOODS_FILE, format!("good ids are not dense at {id}")));
            }
            let group = goods_to_groups.get(&id).copied().ok_or_else(|| {
                self.inconsistent(GOODS_TO_GROUPS_FILE, format!("good {id} has no group"))
            })?;
            if !groups.contains_key(&group) {
                return Err(self.inconsistent(GROUPS_FILE, format!("group {group} is unknown")));
            }
            // Older exports omit goods that were never sold.
            let support = support.get(&id).copied().unwrap_or(0);
            goods.push(Good { id, name, group, support });
        }

        for (position, transaction) in transactions.iter().enumerate() {
            if !employees.contains_key(&transaction.employee) {
                let employee = transaction.employee;
                return Err(self.inconsistent(
                    TRANSACTIONS_FILE,
                    format!("transaction #{position} references unknown employee {employee}"),
                ));
            }
            if !transaction.positions.windows(2).all(|pair| pair[0] < pair[1]) {
                return Err(self.inconsistent(
                    TRANSACTIONS_FILE,
                    format!("transaction #{position} positions are not strictly ascending"),
                ));
            }
            if let Some(good) = transaction.positions.iter().find(|good| good.index() >= goods.len()) {
                return Err(self.inconsistent(
                    TRANSACTIONS_FILE,
                    format!("transaction #{position} references unknown good {good}"),
                ));
            }
        }

        Ok(Dataset { employees, groups, goods, transactions })
    }

    /// Writes the index as JSON plus a human-readable listing.
    pub fn save_index(
        &self,
        index: &FrequentItemsetIndex,
        dataset: &Dataset,
    ) -> Result<(), ArtifactError> {
        self.ensure_dir()?;
        self.write_json(INDEX_FILE, index)?;

        let listing = index.iter().map(|itemset| listing_line(itemset, dataset)).collect::<Vec<_>>();
        let path = self.path(INDEX_LISTING_FILE);
        fs::write(&path, listing.join("\n"))
            .map_err(|source| ArtifactError::Write { path, source })?;

        info!(
            event_name = "basket.artifacts.index_saved",
            dir = %self.dir.display(),
            itemsets = index.len(),
            "frequent itemset index written"
        );
        Ok(())
    }

    pub fn load_index(&self) -> Result<FrequentItemsetIndex, ArtifactError> {
        let itemsets: Vec<Itemset> = self.read_json(INDEX_FILE)?;
        FrequentItemsetIndex::from_stored(itemsets)
            .map_err(|violation| self.inconsistent(INDEX_FILE, violation.to_string()))
    }

    fn ensure_dir(&self) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| ArtifactError::Write { path: self.dir.clone(), source })
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), ArtifactError> {
        let path = self.path(file);
        let encoded = serde_json::to_vec(value)
            .map_err(|source| ArtifactError::Encode { path: path.clone(), source })?;
        fs::write(&path, encoded).map_err(|source| ArtifactError::Write { path, source })
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T, ArtifactError> {
        let path = self.path(file);
        let raw = fs::read_to_string(&path)
            .map_err(|source| ArtifactError::Read { path: path.clone(), source })?;
        serde_json::from_str(&raw).map_err(|source| ArtifactError::Decode { path, source })
    }

    fn inconsistent(&self, file: &str, message: String) -> ArtifactError {
        ArtifactError::Inconsistent { path: self.path(file), message }
    }
}

fn listing_line(itemset: &Itemset, dataset: &Dataset) -> String {
    let names = itemset
        .items
        .iter()
        .map(|good| dataset.good_name(*good).map(str::to_owned).unwrap_or_else(|| good.to_string()))
        .collect::<Vec<_>>()
        .join(",");
    format!("support: {:>6}, items: {names}", itemset.support)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
