//! Per-day download bookkeeping

use super::gateway::PersistenceGateway;
use super::rows::ToInsert;
use super::schema::TableDef;
use super::statement::{date_value, Statement};
use crate::error::Result;
use crate::models::DownloadInfo;
use chrono::NaiveDate;

/// True when the bhavcopy for `date` was stored
pub fn is_download_complete(
    gateway: &PersistenceGateway,
    table: &TableDef,
    date: NaiveDate,
) -> Result<bool> {
    let probe = Statement::new(
        format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE download_date = ?1 \
             AND bhav_success = 1)",
            table.name()
        ),
        vec![date_value(date)],
    );
    gateway.exists(&probe)
}

/// Store the status for a day, replacing any earlier status
pub fn record_download(
    gateway: &PersistenceGateway,
    table: &TableDef,
    info: &DownloadInfo,
) -> Result<()> {
    let statement = info.to_insert(table)?;
    gateway.execute_one(&statement)?;
    Ok(())
}
