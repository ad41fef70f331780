//! NSE feed client
//!
//! Binds a transport and the configured feed URLs to the paging machinery.

use super::pagination::{fetch_page, Page, PageArg};
use super::schemas::{AllStocksRow, RowSchema, SymbolChangeRow};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::fetch::FeedFetcher;
use crate::models::SymbolChangeRecord;
use crate::telemetry::Telemetry;
use std::collections::HashSet;

/// Reader for the NSE reference feeds
pub struct NseFeeds<F> {
    fetcher: F,
    urls: FeedConfig,
    telemetry: Telemetry,
}

impl<F: FeedFetcher> NseFeeds<F> {
    pub fn new(fetcher: F, urls: FeedConfig, telemetry: Telemetry) -> Self {
        Self {
            fetcher,
            urls,
            telemetry,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Every listed equity as `ScripBaseInfo`, windowed by `start`/`count`
    pub fn all_stocks(
        &self,
        start: impl Into<PageArg>,
        count: impl Into<PageArg>,
    ) -> Page<'_, F, AllStocksRow> {
        self.page(&self.urls.all_stocks_url, start, count)
    }

    /// Page through any dataset published at `url`
    pub fn page<S: RowSchema>(
        &self,
        url: &str,
        start: impl Into<PageArg>,
        count: impl Into<PageArg>,
    ) -> Page<'_, F, S> {
        fetch_page(&self.fetcher, url, start, count, self.telemetry.clone())
    }

    /// All symbol changes in feed order; empty when the feed is unavailable
    pub fn symbol_changes(&self) -> Result<Vec<SymbolChangeRecord>> {
        self.page::<SymbolChangeRow>(&self.urls.symbol_change_url, PageArg::Null, -1i64)
            .collect()
    }
}

/// Follow rename chains starting at `symbol` and return the latest name.
///
/// Changes are applied in list order; a cycle stops at the first repeat.
pub fn resolve_current_symbol(changes: &[SymbolChangeRecord], symbol: &str) -> String {
    let mut current = symbol.to_string();
    let mut seen = HashSet::new();
    seen.insert(current.clone());

    loop {
        let next = changes
            .iter()
            .rev()
            .find(|c| c.previous_symbol.eq_ignore_ascii_case(&current));

        match next {
            Some(change) if seen.insert(change.current_symbol.clone()) => {
                current = change.current_symbol.clone();
            }
            _ => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::fetch::testing::StaticFetcher;
    use crate::fetch::FetchResponse;

    const SYM_CHANGE: &str = "SM_NAME,SM_KEY_SYMBOL,SM_NEW_SYMBOL,SM_APPLICABLE_FROM\n\
        Acme Industries,ACME,ACMEIND,05-MAR-2010\n\
        Beta Corp,BETA,BETAC,10-JUN-2011\n\
        Acme Industries,ACMEIND,ACMEX,01-FEB-2015\n";

    fn feeds(fetcher: StaticFetcher) -> NseFeeds<StaticFetcher> {
        NseFeeds::new(fetcher, FeedConfig::default(), Telemetry::silent())
    }

    fn change(prev: &str, cur: &str) -> SymbolChangeRecord {
        SymbolChangeRecord {
            previous_symbol: prev.to_string(),
            current_symbol: cur.to_string(),
            change_date: "01-JAN-2000".to_string(),
        }
    }

    #[test]
    fn test_symbol_changes_in_feed_order() {
        let urls = FeedConfig::default();
        let fetcher =
            StaticFetcher::new().with(&urls.symbol_change_url, FetchResponse::ok(SYM_CHANGE));
        let changes = feeds(fetcher).symbol_changes().unwrap();

        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].previous_symbol, "ACME");
        assert_eq!(changes[2].current_symbol, "ACMEX");
    }

    #[test]
    fn test_symbol_changes_unavailable_is_empty() {
        let urls = FeedConfig::default();
        let fetcher =
            StaticFetcher::new().with(&urls.symbol_change_url, FetchResponse::failed(500));
        assert!(feeds(fetcher).symbol_changes().unwrap().is_empty());
    }

    #[test]
    fn test_all_stocks_invalid_start() {
        let urls = FeedConfig::default();
        let fetcher = StaticFetcher::new().with(&urls.all_stocks_url, FetchResponse::ok(""));
        let feeds = feeds(fetcher);
        let mut page = feeds.all_stocks("foo", -1i64);
        assert!(matches!(page.next(), Some(Err(AppError::Validation(_)))));
    }

    #[test]
    fn test_resolve_current_symbol_follows_chain() {
        let changes = vec![
            change("ACME", "ACMEIND"),
            change("BETA", "BETAC"),
            change("ACMEIND", "ACMEX"),
        ];
        assert_eq!(resolve_current_symbol(&changes, "ACME"), "ACMEX");
        assert_eq!(resolve_current_symbol(&changes, "ACMEIND"), "ACMEX");
        assert_eq!(resolve_current_symbol(&changes, "BETA"), "BETAC");
        assert_eq!(resolve_current_symbol(&changes, "GAMMA"), "GAMMA");
    }

    #[test]
    fn test_resolve_current_symbol_cycle() {
        let changes = vec![change("A", "B"), change("B", "A")];
        assert_eq!(resolve_current_symbol(&changes, "A"), "B");
    }
}
