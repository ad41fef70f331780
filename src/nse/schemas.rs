//! Column layouts of the NSE feeds

use super::parser::{parse, RecordParser, Row};
use crate::error::Result;
use crate::models::{
    CorporateActionRecord, IndexOhlcRecord, OhlcvRecord, ScripBaseInfo, SymbolChangeRecord,
};
use std::borrow::Cow;

/// Mapper signature shared by every schema
pub type SchemaMapper<R> = fn(&Row<'_>) -> Result<Option<R>>;

/// Parser produced by [`RowSchema::parser`]
pub type SchemaParser<'a, S> =
    RecordParser<'a, <S as RowSchema>::Record, SchemaMapper<<S as RowSchema>::Record>>;

/// Shape of one dataset: how many fields a row needs, how to spot the
/// header, and how to turn a row into a record.
pub trait RowSchema {
    type Record;

    const MIN_FIELDS: usize;
    const HEADER_SENTINEL: Option<&'static str>;

    fn map_row(row: &Row<'_>) -> Result<Option<Self::Record>>;

    fn parser<'a>(text: impl Into<Cow<'a, str>>) -> SchemaParser<'a, Self>
    where
        Self: Sized,
    {
        parse(
            text,
            Self::MIN_FIELDS,
            Self::HEADER_SENTINEL,
            Self::map_row as SchemaMapper<Self::Record>,
        )
    }
}

/// `EQUITY_L.csv`: symbol, name, ISIN, date of listing, then listing
/// details we do not keep.
pub struct AllStocksRow;

impl RowSchema for AllStocksRow {
    type Record = ScripBaseInfo;

    const MIN_FIELDS: usize = 8;
    const HEADER_SENTINEL: Option<&'static str> = Some("symbol");

    fn map_row(row: &Row<'_>) -> Result<Option<ScripBaseInfo>> {
        Ok(Some(ScripBaseInfo {
            symbol: row.text(0),
            name: row.text(1),
            isin: row.text(2),
            listing_date: row.text(3),
        }))
    }
}

/// `symbolchange.csv`: company, old symbol, new symbol, applicable from
pub struct SymbolChangeRow;

impl SymbolChangeRow {
    const HEADER_DATE_COLUMN: &'static str = "SM_APPLICABLE_FROM";
}

impl RowSchema for SymbolChangeRow {
    type Record = SymbolChangeRecord;

    const MIN_FIELDS: usize = 4;
    const HEADER_SENTINEL: Option<&'static str> = None;

    fn map_row(row: &Row<'_>) -> Result<Option<SymbolChangeRecord>> {
        if row.get(3).eq_ignore_ascii_case(Self::HEADER_DATE_COLUMN) {
            return Ok(None);
        }

        Ok(Some(SymbolChangeRecord {
            previous_symbol: row.text(1),
            current_symbol: row.text(2),
            change_date: row.text(3),
        }))
    }
}

/// symbol, date, open, high, low, close, volume, delivery
pub struct OhlcvRow;

impl RowSchema for OhlcvRow {
    type Record = OhlcvRecord;

    const MIN_FIELDS: usize = 8;
    const HEADER_SENTINEL: Option<&'static str> = Some("symbol");

    fn map_row(row: &Row<'_>) -> Result<Option<OhlcvRecord>> {
        Ok(Some(OhlcvRecord {
            symbol: row.text(0),
            date: row.date(1, "date")?,
            open: row.parse(2, "open")?,
            high: row.parse(3, "high")?,
            low: row.parse(4, "low")?,
            close: row.parse(5, "close")?,
            volume: row.parse(6, "volume")?,
            delivery: row.parse(7, "delivery")?,
        }))
    }
}

/// symbol, date, open, high, low, close
pub struct IndexOhlcRow;

impl RowSchema for IndexOhlcRow {
    type Record = IndexOhlcRecord;

    const MIN_FIELDS: usize = 6;
    const HEADER_SENTINEL: Option<&'static str> = Some("symbol");

    fn map_row(row: &Row<'_>) -> Result<Option<IndexOhlcRecord>> {
        Ok(Some(IndexOhlcRecord {
            symbol: row.text(0),
            date: row.date(1, "date")?,
            open: row.parse(2, "open")?,
            high: row.parse(3, "high")?,
            low: row.parse(4, "low")?,
            close: row.parse(5, "close")?,
        }))
    }
}

/// symbol, ex_date, action (D/B/S), ratio, delta
pub struct CorporateActionRow;

impl RowSchema for CorporateActionRow {
    type Record = CorporateActionRecord;

    const MIN_FIELDS: usize = 5;
    const HEADER_SENTINEL: Option<&'static str> = Some("symbol");

    fn map_row(row: &Row<'_>) -> Result<Option<CorporateActionRecord>> {
        Ok(Some(CorporateActionRecord {
            symbol: row.text(0),
            ex_date: row.date(1, "ex_date")?,
            action: row.parse(2, "action")?,
            ratio: row.parse(3, "ratio")?,
            delta: row.parse(4, "delta")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::CorpAction;
    use chrono::NaiveDate;

    #[test]
    fn test_all_stocks_header_skipped_and_columns_mapped() {
        let text = "\"Symbol\",\"Name\",\"ISIN\",\"Date\",\"a\",\"b\",\"c\",\"d\"\n\
                    \"SYM\",\"Name A\",\"INE000A01011\",\"01-JAN-2001\",\"\",\"\",\"\",\"\"";
        let records: Vec<_> = AllStocksRow::parser(text).collect::<Result<_>>().unwrap();
        assert_eq!(
            records,
            vec![ScripBaseInfo::new("SYM", "Name A", "01-JAN-2001", "INE000A01011")]
        );
    }

    #[test]
    fn test_all_stocks_needs_eight_fields() {
        let text = "SYM,Name A,INE000A01011,01-JAN-2001";
        assert_eq!(AllStocksRow::parser(text).count(), 0);
    }

    #[test]
    fn test_symbol_change_header_row() {
        let text = "SM_KEY_SYMBOL,SM_NEW_SYMBOL,X,SM_APPLICABLE_FROM\n\
                    Acme Ltd, ACME , ACMEIND , 05-MAR-2010\n\
                    short,row";
        let records: Vec<_> = SymbolChangeRow::parser(text).collect::<Result<_>>().unwrap();
        assert_eq!(
            records,
            vec![SymbolChangeRecord {
                previous_symbol: "ACME".to_string(),
                current_symbol: "ACMEIND".to_string(),
                change_date: "05-MAR-2010".to_string(),
            }]
        );
    }

    #[test]
    fn test_ohlcv_row() {
        let text = "SYMBOL,DATE,OPEN,HIGH,LOW,CLOSE,VOLUME,DELIVERY\n\
                    INFY,2020-01-02,735.0,740.5,731.2,738.3,5000000,2100000";
        let records: Vec<_> = OhlcvRow::parser(text).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.symbol, "INFY");
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert_eq!(r.high, 740.5);
        assert_eq!(r.volume, 5_000_000);
        assert_eq!(r.delivery, 2_100_000);
    }

    #[test]
    fn test_ohlcv_bad_number_is_error() {
        let text = "INFY,2020-01-02,735.0,abc,731.2,738.3,5000000,2100000";
        let mut parser = OhlcvRow::parser(text);
        assert!(matches!(
            parser.next(),
            Some(Err(AppError::MalformedRow { line: 1, .. }))
        ));
    }

    #[test]
    fn test_index_ohlc_row() {
        let text = "NIFTY,02-JAN-2020,12198.55,12289.9,12195.25,12282.2";
        let records: Vec<_> = IndexOhlcRow::parser(text).collect::<Result<_>>().unwrap();
        assert_eq!(records[0].symbol, "NIFTY");
        assert_eq!(records[0].close, 12282.2);
    }

    #[test]
    fn test_corporate_action_row() {
        let text = "symbol,ex_date,action,ratio,delta\n\
                    INFY,2018-09-04,B,0.5,0\n\
                    INFY,2019-06-13,X,1,0";
        let mut parser = CorporateActionRow::parser(text);
        let first = parser.next().unwrap().unwrap();
        assert_eq!(first.action, CorpAction::Bonus);
        assert_eq!(first.ratio, 0.5);
        assert!(matches!(
            parser.next(),
            Some(Err(AppError::MalformedRow { line: 3, .. }))
        ));
    }
}
