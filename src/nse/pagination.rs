//! Client-side paging over a whole-file feed
//!
//! The exchange publishes each dataset as one CSV file, so a page is a
//! window over the parsed record stream. Nothing happens until the first
//! pull: argument coercion, the single download and parsing are all lazy.

use super::schemas::{RowSchema, SchemaParser};
use crate::error::{AppError, Result};
use crate::fetch::FeedFetcher;
use crate::telemetry::Telemetry;
use std::iter::FusedIterator;

/// A paging argument as the caller supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageArg {
    Null,
    Int(i64),
    Text(String),
}

impl PageArg {
    fn coerce(&self, name: &str) -> Result<Option<i64>> {
        match self {
            PageArg::Null => Ok(None),
            PageArg::Int(n) => Ok(Some(*n)),
            PageArg::Text(s) => s.trim().parse::<i64>().map(Some).map_err(|_| {
                AppError::Validation(format!("{} must be an integer, got '{}'", name, s))
            }),
        }
    }
}

impl From<i64> for PageArg {
    fn from(n: i64) -> Self {
        PageArg::Int(n)
    }
}

impl From<i32> for PageArg {
    fn from(n: i32) -> Self {
        PageArg::Int(n as i64)
    }
}

impl From<usize> for PageArg {
    fn from(n: usize) -> Self {
        PageArg::Int(n as i64)
    }
}

impl From<&str> for PageArg {
    fn from(s: &str) -> Self {
        PageArg::Text(s.to_string())
    }
}

impl From<String> for PageArg {
    fn from(s: String) -> Self {
        PageArg::Text(s)
    }
}

impl<T: Into<PageArg>> From<Option<T>> for PageArg {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PageArg::Null)
    }
}

/// Resolved window: skip `start` rows, then take `count` (all when `None`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: usize,
    pub count: Option<usize>,
}

impl PageWindow {
    pub const ALL: PageWindow = PageWindow {
        start: 0,
        count: None,
    };

    /// Coerce raw arguments.
    ///
    /// A missing or zero `start` means no offset. `count <= 0` means
    /// unbounded. A null `count` is a type error.
    pub fn resolve(start: &PageArg, count: &PageArg) -> Result<Self> {
        let start = match start.coerce("start")? {
            None | Some(0) => 0,
            Some(n) if n < 0 => {
                return Err(AppError::Validation(format!(
                    "start must be non-negative, got {}",
                    n
                )))
            }
            Some(n) => n as usize,
        };

        let count = match count {
            PageArg::Null => {
                return Err(AppError::InvalidType(
                    "count must be an integer, not null".to_string(),
                ))
            }
            other => match other.coerce("count")? {
                Some(n) if n > 0 => Some(n as usize),
                _ => None,
            },
        };

        Ok(Self { start, count })
    }

    fn exhausted(&self, index: usize) -> bool {
        self.count.is_some_and(|count| index >= self.start + count)
    }
}

struct Stream<S: RowSchema> {
    parser: SchemaParser<'static, S>,
    window: PageWindow,
    index: usize,
}

impl<S: RowSchema> Stream<S> {
    fn next_in_window(&mut self) -> Option<Result<S::Record>> {
        loop {
            if self.window.exhausted(self.index) {
                return None;
            }

            let record = match self.parser.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };

            let i = self.index;
            self.index += 1;
            if i < self.window.start {
                continue;
            }
            return Some(Ok(record));
        }
    }
}

/// Lazy page of records from one feed URL
pub struct Page<'f, F: ?Sized, S: RowSchema> {
    fetcher: &'f F,
    url: String,
    pending: Option<(PageArg, PageArg)>,
    stream: Option<Stream<S>>,
    telemetry: Telemetry,
}

/// Page through the records of `url`.
///
/// Errors in `start`/`count` are reported by the first `next()`. A
/// non-success upstream status yields an empty page.
pub fn fetch_page<'f, S, F>(
    fetcher: &'f F,
    url: &str,
    start: impl Into<PageArg>,
    count: impl Into<PageArg>,
    telemetry: Telemetry,
) -> Page<'f, F, S>
where
    S: RowSchema,
    F: FeedFetcher + ?Sized,
{
    Page {
        fetcher,
        url: url.to_string(),
        pending: Some((start.into(), count.into())),
        stream: None,
        telemetry,
    }
}

impl<'f, F, S> Page<'f, F, S>
where
    S: RowSchema,
    F: FeedFetcher + ?Sized,
{
    fn open(&self, start: &PageArg, count: &PageArg) -> Result<Option<Stream<S>>> {
        let window = PageWindow::resolve(start, count)?;

        let url = self.url.as_str();
        self.telemetry.scope(|| tracing::info!("GET: {}", url));

        let response = self.fetcher.fetch(url)?;
        if !response.ok {
            self.telemetry
                .scope(|| tracing::warn!("GET: {}({})", url, response.status));
            return Ok(None);
        }

        let parser = S::parser(response.text).with_telemetry(self.telemetry.clone());
        Ok(Some(Stream {
            parser,
            window,
            index: 0,
        }))
    }
}

impl<'f, F, S> Iterator for Page<'f, F, S>
where
    S: RowSchema,
    F: FeedFetcher + ?Sized,
{
    type Item = Result<S::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((start, count)) = self.pending.take() {
            match self.open(&start, &count) {
                Ok(stream) => self.stream = stream,
                Err(e) => return Some(Err(e)),
            }
        }

        let stream = self.stream.as_mut()?;
        let item = stream.next_in_window();
        if !matches!(item, Some(Ok(_))) {
            self.stream = None;
        }
        item
    }
}

impl<'f, F, S> FusedIterator for Page<'f, F, S>
where
    S: RowSchema,
    F: FeedFetcher + ?Sized,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::fetch::FetchResponse;
    use crate::models::ScripBaseInfo;
    use crate::nse::schemas::AllStocksRow;

    const URL: &str = "https://example.test/EQUITY_L.csv";

    fn feed(rows: usize) -> String {
        let mut text = String::from("SYMBOL,NAME,ISIN,DATE,SERIES,PAID,LOT,FACE\n");
        for i in 0..rows {
            text.push_str(&format!(
                "\"S{i}\",\"Name {i}\",\"INE{i:09}\",\"01-JAN-2001\",EQ,10,1,10\n"
            ));
        }
        text
    }

    fn symbols<F: FeedFetcher + ?Sized>(
        fetcher: &F,
        start: impl Into<PageArg>,
        count: impl Into<PageArg>,
    ) -> Vec<String> {
        fetch_page::<AllStocksRow, _>(fetcher, URL, start, count, Telemetry::silent())
            .map(|r| r.unwrap().symbol)
            .collect()
    }

    #[test]
    fn test_resolve_defaults() {
        let window = PageWindow::resolve(&PageArg::Null, &PageArg::Int(-1)).unwrap();
        assert_eq!(window, PageWindow::ALL);
        let window = PageWindow::resolve(&"0".into(), &"-1".into()).unwrap();
        assert_eq!(window, PageWindow::ALL);
        let window = PageWindow::resolve(&" 3 ".into(), &PageArg::Int(0)).unwrap();
        assert_eq!(window, PageWindow { start: 3, count: None });
    }

    #[test]
    fn test_resolve_rejects_bad_arguments() {
        assert!(matches!(
            PageWindow::resolve(&"foo".into(), &PageArg::Int(-1)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            PageWindow::resolve(&PageArg::Int(-2), &PageArg::Int(-1)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            PageWindow::resolve(&PageArg::Int(0), &PageArg::Null),
            Err(AppError::InvalidType(_))
        ));
        assert!(matches!(
            PageWindow::resolve(&PageArg::Int(0), &"many".into()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_all_rows_without_header() {
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::ok(feed(4)));
        assert_eq!(symbols(&fetcher, 0i64, -1i64), vec!["S0", "S1", "S2", "S3"]);
    }

    #[test]
    fn test_window_sizes() {
        let total = 5;
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::ok(feed(total)));

        for start in 0..=total + 1 {
            for count in 1..=total + 1 {
                let got = symbols(&fetcher, start, count);
                let expected = if start < total {
                    count.min(total - start)
                } else {
                    0
                };
                assert_eq!(got.len(), expected, "start={} count={}", start, count);
                if let Some(first) = got.first() {
                    assert_eq!(first, &format!("S{}", start));
                }
            }
        }
    }

    #[test]
    fn test_single_fetch_per_page() {
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::ok(feed(10)));
        let page: Vec<ScripBaseInfo> =
            fetch_page::<AllStocksRow, _>(&fetcher, URL, 2i64, 3i64, Telemetry::silent())
                .collect::<Result<_>>()
                .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(fetcher.requests(), vec![URL.to_string()]);
    }

    #[test]
    fn test_invalid_start_surfaces_on_first_pull() {
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::ok(feed(3)));
        let mut page =
            fetch_page::<AllStocksRow, _>(&fetcher, URL, "foo", -1i64, Telemetry::silent());

        // nothing has happened yet
        assert!(fetcher.requests().is_empty());

        assert!(matches!(page.next(), Some(Err(AppError::Validation(_)))));
        assert!(page.next().is_none());
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_null_count_is_type_error() {
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::ok(feed(3)));
        let mut page =
            fetch_page::<AllStocksRow, _>(&fetcher, URL, 0i64, PageArg::Null, Telemetry::silent());
        assert!(matches!(page.next(), Some(Err(AppError::InvalidType(_)))));
    }

    #[test]
    fn test_upstream_failure_is_empty_page() {
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::failed(503));
        let mut page =
            fetch_page::<AllStocksRow, _>(&fetcher, URL, 0i64, -1i64, Telemetry::silent());
        assert!(page.next().is_none());
        assert!(page.next().is_none());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[test]
    fn test_optional_arguments() {
        let fetcher = StaticFetcher::new().with(URL, FetchResponse::ok(feed(3)));
        assert_eq!(symbols(&fetcher, None::<i64>, Some(2i64)), vec!["S0", "S1"]);
    }
}
