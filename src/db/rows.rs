//! Record to row mapping for the canonical tables

use super::schema::TableDef;
use super::statement::{OnConflict, Statement};
use crate::error::Result;
use crate::models::{
    AllScripsInfo, CorporateActionRecord, DownloadInfo, IndexOhlcRecord, OhlcvRecord,
};

/// A record that can be written as one row of `table`
pub trait ToInsert {
    fn to_insert(&self, table: &TableDef) -> Result<Statement>;
}

impl ToInsert for AllScripsInfo {
    fn to_insert(&self, table: &TableDef) -> Result<Statement> {
        let mut insert = table
            .insert()
            .set("security_isin", self.security_isin.clone())
            .set("company_name", self.company_name.clone())
            .set("nse_traded", self.nse_traded)
            .set_opt("nse_symbol", self.nse_symbol.clone())
            .set("nse_suspended", self.nse_suspended)
            .set("bse_traded", self.bse_traded)
            .set_opt("bse_id", self.bse_id.clone())
            .set_opt("bse_symbol", self.bse_symbol.clone())
            .set_opt("bse_group", self.bse_group.map(|g| g.as_str().to_string()));

        if let Some(date) = self.nse_start_date {
            insert = insert.set_date("nse_start_date", date);
        }
        if let Some(date) = self.bse_start_date {
            insert = insert.set_date("bse_start_date", date);
        }
        insert.build()
    }
}

impl ToInsert for OhlcvRecord {
    fn to_insert(&self, table: &TableDef) -> Result<Statement> {
        table
            .insert()
            .set("symbol", self.symbol.clone())
            .set_date("date", self.date)
            .set("open", self.open)
            .set("high", self.high)
            .set("low", self.low)
            .set("close", self.close)
            .set("volume", self.volume)
            .set("delivery", self.delivery)
            .build()
    }
}

impl ToInsert for IndexOhlcRecord {
    fn to_insert(&self, table: &TableDef) -> Result<Statement> {
        table
            .insert()
            .set("symbol", self.symbol.clone())
            .set_date("date", self.date)
            .set("open", self.open)
            .set("high", self.high)
            .set("low", self.low)
            .set("close", self.close)
            .build()
    }
}

impl ToInsert for CorporateActionRecord {
    fn to_insert(&self, table: &TableDef) -> Result<Statement> {
        table
            .insert()
            .set("symbol", self.symbol.clone())
            .set_date("ex_date", self.ex_date)
            .set("action", self.action.as_str().to_string())
            .set("ratio", self.ratio)
            .set("delta", self.delta)
            .build()
    }
}

/// Download status rows replace the previous status for the same day
impl ToInsert for DownloadInfo {
    fn to_insert(&self, table: &TableDef) -> Result<Statement> {
        table
            .insert()
            .on_conflict(OnConflict::Replace)
            .set_date("download_date", self.download_date)
            .set("bhav_success", self.bhav_success)
            .set("deliv_success", self.deliv_success)
            .set("error_type", self.error_type.clone())
            .build()
    }
}
