use anyhow::{Context, Result};
use churnflow::{IngestConfig, SessionBuilder, ingest};
use env_logger::Env;
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = IngestConfig::from_env().context("load configuration")?;
    let session = SessionBuilder::new()
        .app_name(&config.app_name)
        .master(&config.master)
        .warehouse_dir(&config.warehouse_dir)
        .get_or_create()
        .context("start session")?;

    ingest::register_storage(&session, &config).context("register object storage")?;
    let report = ingest::run(&session, &config)?;
    info!(
        "done: {} row(s) ingested, {} local file(s), table {:?}",
        report.rows_read, report.local_files, report.table_action
    );
    Ok(())
}
