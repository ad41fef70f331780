//! Feed to database import jobs

use crate::db::download_info::{is_download_complete, record_download};
use crate::db::schema::{
    create_or_get_all_scrips_table, create_or_get_corp_actions_table,
    create_or_get_download_info_table, create_or_get_equities_hist_table,
    create_or_get_indices_hist_table,
};
use crate::db::{Catalog, PersistenceGateway, Statement, TableDef, ToInsert};
use crate::error::{AppError, Result};
use crate::fetch::FeedFetcher;
use crate::models::{AllScripsInfo, DownloadInfo};
use crate::nse::{CorporateActionRow, IndexOhlcRow, NseFeeds, OhlcvRow, PageArg, RowSchema};
use chrono::NaiveDate;
use serde::Serialize;

/// Counts reported by an import job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records read from the feed
    pub fetched: usize,
    /// Rows actually written (duplicates excluded)
    pub inserted: usize,
    /// Set when the job did nothing because the day was already complete
    pub skipped: bool,
}

impl ImportSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Moves feed records into the canonical tables
pub struct Importer<F> {
    feeds: NseFeeds<F>,
    catalog: Catalog,
    gateway: PersistenceGateway,
}

impl<F: FeedFetcher> Importer<F> {
    pub fn new(feeds: NseFeeds<F>, catalog: Catalog) -> Self {
        let gateway = PersistenceGateway::from_catalog(&catalog);
        Self {
            feeds,
            catalog,
            gateway,
        }
    }

    pub fn feeds(&self) -> &NseFeeds<F> {
        &self.feeds
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Load the NSE listing into `all_scrips_info`
    pub fn import_all_stocks(
        &mut self,
        start: impl Into<PageArg>,
        count: impl Into<PageArg>,
    ) -> Result<ImportSummary> {
        let table = create_or_get_all_scrips_table(Some(&mut self.catalog))?;

        let statements = self
            .feeds
            .all_stocks(start, count)
            .map(|scrip| AllScripsInfo::from_nse(&scrip?).to_insert(&table))
            .collect::<Result<Vec<_>>>()?;

        self.store(&statements)
    }

    /// Load one day's bhavcopy from `url`, recording the outcome
    pub fn import_ohlcv(&mut self, date: NaiveDate, url: &str) -> Result<ImportSummary> {
        let download_table = create_or_get_download_info_table(Some(&mut self.catalog))?;
        if self.already_complete(&download_table, date)? {
            return Ok(ImportSummary::skipped());
        }

        self.log(|| tracing::info!("GET: {}", url));
        let response = match self.feeds.fetcher().fetch(url) {
            Ok(response) => response,
            Err(e) => return Err(self.record_failure(&download_table, date, e)),
        };

        if !response.ok {
            self.log(|| tracing::warn!("GET: {}({})", url, response.status));
            let info = DownloadInfo::failure(date, DownloadInfo::DEFAULT_ERROR_TYPE);
            record_download(&self.gateway, &download_table, &info)?;
            return Ok(ImportSummary::default());
        }

        self.load_ohlcv(&download_table, date, &response.text)
    }

    /// Load bhavcopy text already in hand for `date`
    pub fn import_ohlcv_csv(&mut self, date: NaiveDate, text: &str) -> Result<ImportSummary> {
        let download_table = create_or_get_download_info_table(Some(&mut self.catalog))?;
        if self.already_complete(&download_table, date)? {
            return Ok(ImportSummary::skipped());
        }

        self.load_ohlcv(&download_table, date, text)
    }

    fn load_ohlcv(
        &mut self,
        download_table: &TableDef,
        date: NaiveDate,
        text: &str,
    ) -> Result<ImportSummary> {
        let table = create_or_get_equities_hist_table(Some(&mut self.catalog))?;

        let statements = match to_statements::<OhlcvRow>(text, &table) {
            Ok(statements) => statements,
            Err(e) => {
                self.log(|| tracing::error!("Bhavcopy for {} unreadable: {}", date, e));
                return Err(self.record_failure(download_table, date, e));
            }
        };

        let summary = match self.store(&statements) {
            Ok(summary) => summary,
            Err(e) => {
                self.log(|| tracing::error!("Storing bhavcopy for {} failed: {}", date, e));
                return Err(self.record_failure(download_table, date, e));
            }
        };

        record_download(&self.gateway, download_table, &DownloadInfo::success(date, true))?;
        Ok(summary)
    }

    fn already_complete(&self, download_table: &TableDef, date: NaiveDate) -> Result<bool> {
        let complete = is_download_complete(&self.gateway, download_table, date)?;
        if complete {
            self.log(|| tracing::info!("{} already downloaded, skipping", date));
        }
        Ok(complete)
    }

    /// Record `error` as the day's status and hand it back. A failure to
    /// write the status is logged; `error` stays the one returned.
    fn record_failure(
        &self,
        download_table: &TableDef,
        date: NaiveDate,
        error: AppError,
    ) -> AppError {
        let info = DownloadInfo::failure(date, error.code());
        if let Err(record_err) = record_download(&self.gateway, download_table, &info) {
            self.log(|| {
                tracing::error!(
                    "Could not record download failure for {}: {}",
                    date,
                    record_err
                )
            });
        }
        error
    }

    /// Load an index history feed
    pub fn import_index_ohlc(&mut self, url: &str) -> Result<ImportSummary> {
        let table = create_or_get_indices_hist_table(Some(&mut self.catalog))?;
        let statements = self
            .feeds
            .page::<IndexOhlcRow>(url, PageArg::Null, -1i64)
            .map(|record| record?.to_insert(&table))
            .collect::<Result<Vec<_>>>()?;

        self.store(&statements)
    }

    /// Load a corporate actions feed
    pub fn import_corporate_actions(&mut self, url: &str) -> Result<ImportSummary> {
        let table = create_or_get_corp_actions_table(Some(&mut self.catalog))?;
        let statements = self
            .feeds
            .page::<CorporateActionRow>(url, PageArg::Null, -1i64)
            .map(|record| record?.to_insert(&table))
            .collect::<Result<Vec<_>>>()?;

        self.store(&statements)
    }

    fn store(&self, statements: &[Statement]) -> Result<ImportSummary> {
        let inserted = self.gateway.insert_many(statements, true)?.len();
        self.log(|| tracing::info!("Stored {} of {} records", inserted, statements.len()));
        Ok(ImportSummary {
            fetched: statements.len(),
            inserted,
            skipped: false,
        })
    }

    fn log(&self, f: impl FnOnce()) {
        self.feeds.telemetry().scope(f)
    }
}

fn to_statements<S>(text: &str, table: &TableDef) -> Result<Vec<Statement>>
where
    S: RowSchema,
    S::Record: ToInsert,
{
    S::parser(text)
        .map(|record| record?.to_insert(table))
        .collect()
}
