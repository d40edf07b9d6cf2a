// Shared fixtures for integration tests: a synthetic churn CSV laid out under a
// storage root the way the job expects it.

#![allow(dead_code)]

use anyhow::Result;
use churnflow::config::{INPUT_RELATIVE_PATH, IngestConfig};
use churnflow::{Session, SessionBuilder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,\
PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,\
TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,\
MonthlyCharges,TotalCharges,Churn";

/// Typed view of a table row, for `read_parquet_vec`.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Customer {
    pub customerID: Option<String>,
    pub gender: Option<String>,
    pub SeniorCitizen: Option<String>,
    pub Partner: Option<String>,
    pub Dependents: Option<String>,
    pub tenure: Option<f64>,
    pub PhoneService: Option<String>,
    pub MultipleLines: Option<String>,
    pub InternetService: Option<String>,
    pub OnlineSecurity: Option<String>,
    pub OnlineBackup: Option<String>,
    pub DeviceProtection: Option<String>,
    pub TechSupport: Option<String>,
    pub StreamingTV: Option<String>,
    pub StreamingMovies: Option<String>,
    pub Contract: Option<String>,
    pub PaperlessBilling: Option<String>,
    pub PaymentMethod: Option<String>,
    pub MonthlyCharges: Option<f64>,
    pub TotalCharges: Option<f64>,
    pub Churn: Option<String>,
}

/// One well-formed data line; `i` drives the id and the numeric columns.
pub fn customer_line(i: usize) -> String {
    let tenure = i % 72 + 1;
    let monthly = 20.5 + i as f64;
    let total = monthly * tenure as f64;
    let gender = if i % 2 == 0 { "Female" } else { "Male" };
    let churn = if i % 3 == 0 { "Yes" } else { "No" };
    format!(
        "{i:04}-TEST,{gender},0,Yes,No,{tenure},Yes,No,DSL,No,Yes,No,No,No,No,\
Month-to-month,Yes,Electronic check,{monthly:.2},{total:.2},{churn}"
    )
}

pub fn customer_lines(n: usize) -> Vec<String> {
    (0..n).map(customer_line).collect()
}

pub fn csv_text(lines: &[String]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for l in lines {
        out.push_str(l);
        out.push('\n');
    }
    out
}

/// Write the fixture under `root` at the path the job reads.
pub fn write_input(root: &Path, lines: &[String]) -> Result<PathBuf> {
    let path = root.join(INPUT_RELATIVE_PATH);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, csv_text(lines))?;
    Ok(path)
}

/// Job configuration with every location inside `tmp`.
pub fn config(tmp: &Path, storage_root: &str) -> Result<IngestConfig> {
    let local = format!("file:{}/", tmp.join("raw").join("telco-data").display());
    let warehouse = tmp.join("warehouse").display().to_string();
    Ok(IngestConfig::from_lookup(|name| match name {
        "STORAGE" => Some(storage_root.to_string()),
        "CHURNFLOW_MASTER" => Some("local[2]".to_string()),
        "CHURNFLOW_LOCAL_OUTPUT" => Some(local.clone()),
        "CHURNFLOW_WAREHOUSE_DIR" => Some(warehouse.clone()),
        _ => None,
    })?)
}

/// A fresh, unregistered session for `config`.
pub fn session(config: &IngestConfig) -> Result<Session> {
    SessionBuilder::new()
        .app_name(&config.app_name)
        .master(&config.master)
        .warehouse_dir(&config.warehouse_dir)
        .build()
}

/// Path of the single local shard written by the job.
pub fn local_shard(tmp: &Path) -> PathBuf {
    tmp.join("raw").join("telco-data").join("part-00000.csv")
}
