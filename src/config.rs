//! Process configuration for the ingestion job.
//!
//! Everything is read from the environment. Only `STORAGE` is required; the rest
//! default to the values the demo pipeline expects.

use crate::error::ConfigError;

pub const STORAGE_VAR: &str = "STORAGE";
pub const MASTER_VAR: &str = "CHURNFLOW_MASTER";
pub const APP_NAME_VAR: &str = "CHURNFLOW_APP_NAME";
pub const WAREHOUSE_DIR_VAR: &str = "CHURNFLOW_WAREHOUSE_DIR";
pub const LOCAL_OUTPUT_VAR: &str = "CHURNFLOW_LOCAL_OUTPUT";

pub const DEFAULT_MASTER: &str = "local[*]";
pub const DEFAULT_APP_NAME: &str = "PythonSQL";
pub const DEFAULT_WAREHOUSE_DIR: &str = "spark-warehouse";
pub const DEFAULT_LOCAL_OUTPUT: &str = "file:/home/cdsw/raw/telco-data/";

/// Source object, relative to the storage root.
pub const INPUT_RELATIVE_PATH: &str = "datalake/data/churn/WA_Fn-UseC_-Telco-Customer-Churn-.csv";
pub const TARGET_DATABASE: &str = "rvh_churn_demo";
pub const TARGET_TABLE: &str = "telco_churn";
pub const NULL_SENTINEL: &str = "NA";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Root URI of the object store, e.g. `s3a://bucket` or `file:/data`.
    pub storage_root: String,
    pub master: String,
    pub app_name: String,
    pub warehouse_dir: String,
    pub local_output: String,
    pub database: String,
    pub table: String,
}

impl IngestConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingVar`] when `STORAGE` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error when `STORAGE` is missing or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_root = lookup(STORAGE_VAR).ok_or(ConfigError::MissingVar(STORAGE_VAR))?;
        if storage_root.trim().is_empty() {
            return Err(ConfigError::EmptyVar { name: STORAGE_VAR });
        }
        let or_default = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Ok(Self {
            storage_root,
            master: or_default(MASTER_VAR, DEFAULT_MASTER),
            app_name: or_default(APP_NAME_VAR, DEFAULT_APP_NAME),
            warehouse_dir: or_default(WAREHOUSE_DIR_VAR, DEFAULT_WAREHOUSE_DIR),
            local_output: or_default(LOCAL_OUTPUT_VAR, DEFAULT_LOCAL_OUTPUT),
            database: TARGET_DATABASE.to_string(),
            table: TARGET_TABLE.to_string(),
        })
    }

    /// Full URI of the source CSV.
    pub fn input_uri(&self) -> String {
        format!(
            "{}/{}",
            self.storage_root.trim_end_matches('/'),
            INPUT_RELATIVE_PATH
        )
    }

    /// `database.table` identifier of the warehouse target.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_storage_is_fatal() {
        let err = IngestConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("STORAGE")));
    }

    #[test]
    fn defaults_apply() {
        let cfg = IngestConfig::from_lookup(lookup(&[("STORAGE", "s3a://bucket/")])).unwrap();
        assert_eq!(cfg.master, "local[*]");
        assert_eq!(cfg.local_output, "file:/home/cdsw/raw/telco-data/");
        assert_eq!(
            cfg.input_uri(),
            "s3a://bucket/datalake/data/churn/WA_Fn-UseC_-Telco-Customer-Churn-.csv"
        );
        assert_eq!(cfg.qualified_table(), "rvh_churn_demo.telco_churn");
    }

    #[test]
    fn overrides_win_over_defaults() {
        let cfg = IngestConfig::from_lookup(lookup(&[
            ("STORAGE", "file:/data"),
            ("CHURNFLOW_MASTER", "local[2]"),
            ("CHURNFLOW_WAREHOUSE_DIR", "/tmp/wh"),
        ]))
        .unwrap();
        assert_eq!(cfg.master, "local[2]");
        assert_eq!(cfg.warehouse_dir, "/tmp/wh");
    }
}
