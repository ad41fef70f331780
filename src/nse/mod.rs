//! NSE feed parsing
//!
//! Raw CSV text → [`parser::RecordParser`] → [`pagination::Page`] → caller.

pub mod feeds;
pub mod pagination;
pub mod parser;
pub mod schemas;

pub use feeds::{resolve_current_symbol, NseFeeds};
pub use pagination::{fetch_page, Page, PageArg, PageWindow};
pub use parser::{parse, RecordParser, Row};
pub use schemas::{
    AllStocksRow, CorporateActionRow, IndexOhlcRow, OhlcvRow, RowSchema, SymbolChangeRow,
};
