//! JSON strategy file adapter.
//!
//! One file per strategy, `{name}.json`:
//!
//! ```json
//! {
//!   "buyOn":  [{"statistic": "Close", "operation": ">", "value": "avg_20"}],
//!   "sellOn": {"statistic": ["Close"], "operation": ["<"], "value": ["SL_30"]}
//! }
//! ```
//!
//! The top level may also be a one-element array wrapping that object. Each
//! group is a list of records or a column-oriented object of equal-length
//! lists. Values may be JSON numbers or strings.

use crate::domain::criteria::{Criteria, Criterion};
use crate::domain::error::TraderError;
use crate::ports::criteria_source::CriteriaSource;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StrategyFile {
    Single(StrategyDoc),
    Wrapped(Vec<StrategyDoc>),
}

#[derive(Debug, Deserialize)]
struct StrategyDoc {
    #[serde(rename = "buyOn")]
    buy_on: CriteriaGroup,
    #[serde(rename = "sellOn")]
    sell_on: CriteriaGroup,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CriteriaGroup {
    Records(Vec<CriterionRecord>),
    Columns {
        statistic: Vec<String>,
        operation: Vec<String>,
        value: Vec<ValueField>,
    },
}

#[derive(Debug, Deserialize)]
struct CriterionRecord {
    statistic: String,
    operation: String,
    value: ValueField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValueField {
    Number(f64),
    Text(String),
}

impl ValueField {
    fn into_string(self) -> String {
        match self {
            ValueField::Number(n) => n.to_string(),
            ValueField::Text(s) => s,
        }
    }
}

impl CriteriaGroup {
    fn into_criteria(self, name: &str, side: &str) -> Result<Vec<Criterion>, TraderError> {
        match self {
            CriteriaGroup::Records(records) => Ok(records
                .into_iter()
                .map(|r| Criterion::new(&r.statistic, &r.operation, &r.value.into_string()))
                .collect()),
            CriteriaGroup::Columns {
                statistic,
                operation,
                value,
            } => {
                if statistic.len() != operation.len() || statistic.len() != value.len() {
                    return Err(TraderError::StrategyLoad {
                        name: name.to_string(),
                        reason: format!(
                            "{} columns differ in length (statistic {}, operation {}, value {})",
                            side,
                            statistic.len(),
                            operation.len(),
                            value.len()
                        ),
                    });
                }
                Ok(statistic
                    .iter()
                    .zip(operation.iter())
                    .zip(value)
                    .map(|((s, o), v)| Criterion::new(s, o, &v.into_string()))
                    .collect())
            }
        }
    }
}

/// Parse strategy JSON text into validated criteria.
pub fn parse_strategy(name: &str, content: &str) -> Result<Criteria, TraderError> {
    let file: StrategyFile =
        serde_json::from_str(content).map_err(|e| TraderError::StrategyLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    let doc = match file {
        StrategyFile::Single(doc) => doc,
        StrategyFile::Wrapped(mut docs) => {
            if docs.len() != 1 {
                return Err(TraderError::StrategyLoad {
                    name: name.to_string(),
                    reason: format!("expected one strategy object, found {}", docs.len()),
                });
            }
            docs.remove(0)
        }
    };

    let criteria = Criteria::new(
        doc.buy_on.into_criteria(name, "buyOn")?,
        doc.sell_on.into_criteria(name, "sellOn")?,
    );
    criteria.validate()?;
    Ok(criteria)
}

pub struct JsonStrategyAdapter {
    base_path: PathBuf,
}

impl JsonStrategyAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn json_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", name))
    }

    /// Load a strategy straight from a file path, named after its stem.
    pub fn load_file(path: &Path) -> Result<Criteria, TraderError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content = fs::read_to_string(path).map_err(|e| TraderError::StrategyLoad {
            name: name.clone(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        parse_strategy(&name, &content)
    }
}

impl CriteriaSource for JsonStrategyAdapter {
    fn load_criteria(&self, name: &str) -> Result<Criteria, TraderError> {
        let path = self.json_path(name);
        if !path.is_file() {
            let available = self.list_strategies().unwrap_or_default();
            return Err(TraderError::StrategyLoad {
                name: name.to_string(),
                reason: format!(
                    "no such strategy in {} (available: {})",
                    self.base_path.display(),
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                ),
            });
        }
        Self::load_file(&path)
    }

    fn list_strategies(&self) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TraderError::StrategyLoad {
            name: self.base_path.display().to_string(),
            reason: format!("failed to read directory: {}", e),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(stem) = file_name.to_string_lossy().strip_suffix(".json") {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
