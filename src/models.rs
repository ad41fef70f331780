//! Market data records
//!
//! Every record here is produced transiently by parsing an exchange feed.
//! The persistent shapes live in [`crate::db::schema`].

use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One exchange-listed security from the NSE all-stocks listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScripBaseInfo {
    pub symbol: String,
    pub name: String,
    /// Listing date as published, e.g. `01-JAN-2001`
    pub listing_date: String,
    pub isin: String,
}

impl ScripBaseInfo {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        listing_date: impl Into<String>,
        isin: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            listing_date: listing_date.into(),
            isin: isin.into(),
        }
    }
}

/// A symbol rename; the most recent entry for a security is its current symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolChangeRecord {
    pub previous_symbol: String,
    pub current_symbol: String,
    pub change_date: String,
}

/// Daily bhavcopy row for an equity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub delivery: i64,
}

/// Daily index values (no volume/delivery)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexOhlcRecord {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Kind of corporate action, stored as a single letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorpAction {
    Dividend,
    Bonus,
    Split,
}

impl CorpAction {
    pub const ALL: [&'static str; 3] = ["D", "B", "S"];

    pub fn as_str(&self) -> &'static str {
        match self {
            CorpAction::Dividend => "D",
            CorpAction::Bonus => "B",
            CorpAction::Split => "S",
        }
    }
}

impl FromStr for CorpAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" | "DIVIDEND" => Ok(CorpAction::Dividend),
            "B" | "BONUS" => Ok(CorpAction::Bonus),
            "S" | "SPLIT" => Ok(CorpAction::Split),
            other => Err(AppError::Validation(format!(
                "unknown corporate action '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CorpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corporate action affecting the price basis of a security
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporateActionRecord {
    pub symbol: String,
    pub ex_date: NaiveDate,
    pub action: CorpAction,
    /// Multiplier applied to preceding prices
    pub ratio: f64,
    /// Difference applied to preceding prices (dividends)
    pub delta: f64,
}

/// BSE trading group of a security
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BseGroup {
    A,
    B,
    T,
    M,
    Z,
    X,
    XT,
    MT,
    P,
    F,
    G,
    IF,
}

impl BseGroup {
    pub const ALL: [&'static str; 12] =
        ["A", "B", "T", "M", "Z", "X", "XT", "MT", "P", "F", "G", "IF"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BseGroup::A => "A",
            BseGroup::B => "B",
            BseGroup::T => "T",
            BseGroup::M => "M",
            BseGroup::Z => "Z",
            BseGroup::X => "X",
            BseGroup::XT => "XT",
            BseGroup::MT => "MT",
            BseGroup::P => "P",
            BseGroup::F => "F",
            BseGroup::G => "G",
            BseGroup::IF => "IF",
        }
    }
}

impl FromStr for BseGroup {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let group = match s.trim().to_ascii_uppercase().as_str() {
            "A" => BseGroup::A,
            "B" => BseGroup::B,
            "T" => BseGroup::T,
            "M" => BseGroup::M,
            "Z" => BseGroup::Z,
            "X" => BseGroup::X,
            "XT" => BseGroup::XT,
            "MT" => BseGroup::MT,
            "P" => BseGroup::P,
            "F" => BseGroup::F,
            "G" => BseGroup::G,
            "IF" => BseGroup::IF,
            other => {
                return Err(AppError::Validation(format!("unknown BSE group '{}'", other)))
            }
        };
        Ok(group)
    }
}

/// Merged view of a security across NSE and BSE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllScripsInfo {
    pub security_isin: String,
    pub company_name: String,
    pub nse_traded: bool,
    pub nse_symbol: Option<String>,
    pub nse_start_date: Option<NaiveDate>,
    pub nse_suspended: bool,
    pub bse_traded: bool,
    pub bse_start_date: Option<NaiveDate>,
    pub bse_id: Option<String>,
    pub bse_symbol: Option<String>,
    pub bse_group: Option<BseGroup>,
}

impl AllScripsInfo {
    /// Build the merged row for a security listed on NSE.
    ///
    /// An unparseable listing date leaves `nse_start_date` empty so the
    /// column default applies.
    pub fn from_nse(scrip: &ScripBaseInfo) -> Self {
        Self {
            security_isin: scrip.isin.clone(),
            company_name: scrip.name.clone(),
            nse_traded: true,
            nse_symbol: Some(scrip.symbol.clone()),
            nse_start_date: parse_exchange_date(&scrip.listing_date).ok(),
            nse_suspended: false,
            bse_traded: false,
            bse_start_date: None,
            bse_id: None,
            bse_symbol: None,
            bse_group: None,
        }
    }
}

/// Ingestion status for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub download_date: NaiveDate,
    pub bhav_success: bool,
    pub deliv_success: bool,
    pub error_type: String,
}

impl DownloadInfo {
    pub const DEFAULT_ERROR_TYPE: &'static str = "DLOAD_ERR";

    pub fn success(download_date: NaiveDate, deliv_success: bool) -> Self {
        Self {
            download_date,
            bhav_success: true,
            deliv_success,
            error_type: String::new(),
        }
    }

    pub fn failure(download_date: NaiveDate, error_type: impl Into<String>) -> Self {
        Self {
            download_date,
            bhav_success: false,
            deliv_success: false,
            error_type: error_type.into(),
        }
    }
}

const DATE_FORMATS: [&str; 3] = ["%d-%b-%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// Parse a date as the exchanges publish it (`01-JAN-2001`), or ISO.
pub fn parse_exchange_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| AppError::Validation(format!("unrecognized date '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exchange_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        assert_eq!(parse_exchange_date("01-JAN-2001").unwrap(), expected);
        assert_eq!(parse_exchange_date("01-Jan-2001").unwrap(), expected);
        assert_eq!(parse_exchange_date(" 2001-01-01 ").unwrap(), expected);
        assert!(parse_exchange_date("yesterday").is_err());
    }

    #[test]
    fn test_corp_action_letters() {
        assert_eq!("d".parse::<CorpAction>().unwrap(), CorpAction::Dividend);
        assert_eq!("Bonus".parse::<CorpAction>().unwrap(), CorpAction::Bonus);
        assert_eq!(CorpAction::Split.to_string(), "S");
        assert!("Q".parse::<CorpAction>().is_err());
    }

    #[test]
    fn test_bse_group_round_trip_names() {
        for name in BseGroup::ALL {
            assert_eq!(name.parse::<BseGroup>().unwrap().as_str(), name);
        }
        assert!("ZZ".parse::<BseGroup>().is_err());
    }

    #[test]
    fn test_all_scrips_from_nse() {
        let scrip = ScripBaseInfo::new("SYM", "Name A", "01-JAN-2001", "INE000A01011");
        let info = AllScripsInfo::from_nse(&scrip);
        assert_eq!(info.security_isin, "INE000A01011");
        assert!(info.nse_traded);
        assert!(!info.bse_traded);
        assert_eq!(info.nse_symbol.as_deref(), Some("SYM"));
        assert_eq!(info.nse_start_date, NaiveDate::from_ymd_opt(2001, 1, 1));
    }

    #[test]
    fn test_all_scrips_bad_listing_date_left_empty() {
        let scrip = ScripBaseInfo::new("SYM", "Name A", "n/a", "INE000A01011");
        assert_eq!(AllScripsInfo::from_nse(&scrip).nse_start_date, None);
    }
}
