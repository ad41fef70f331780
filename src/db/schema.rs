//! Table definitions and the idempotent catalog
//!
//! A [`Catalog`] remembers which tables it has already handed out. Asking
//! for a table it knows returns the same handle without touching the store;
//! otherwise the table is created if the store does not have it yet.

use super::statement::Insert;
use super::Store;
use crate::error::{AppError, Result};
use crate::models::{BseGroup, CorpAction, DownloadInfo};
use crate::telemetry::Telemetry;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

pub const ALL_SCRIPS_TABLE: &str = "all_scrips_info";
pub const DOWNLOAD_INFO_TABLE: &str = "nse_bhav_deliv_download_info";
pub const EQUITIES_HIST_TABLE: &str = "nse_equities_hist_data";
pub const INDICES_HIST_TABLE: &str = "nse_indices_hist_data";
pub const CORP_ACTIONS_TABLE: &str = "nse_corp_actions_hist_data";

/// Storage type of a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// `VARCHAR(n)`
    Text(u32),
    BigInt,
    Float,
    Date,
    Boolean,
    /// Closed set of labels, enforced by a `CHECK` constraint on insert
    Enum {
        name: &'static str,
        variants: &'static [&'static str],
    },
}

impl ColumnType {
    fn sql_type(&self) -> String {
        match self {
            ColumnType::Text(len) => format!("VARCHAR({})", len),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Enum { variants, .. } => {
                let len = variants.iter().map(|v| v.len()).max().unwrap_or(1);
                format!("VARCHAR({})", len)
            }
        }
    }
}

/// Column default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Text(String),
    Date(NaiveDate),
}

impl DefaultValue {
    fn sql_literal(&self) -> String {
        match self {
            DefaultValue::Bool(b) => (*b as i32).to_string(),
            DefaultValue::Text(s) => quote_literal(s),
            DefaultValue::Date(d) => quote_literal(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
}

impl Column {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            primary_key: false,
            unique: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    fn sql(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.ty.sql_type());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.sql_literal());
        }
        if let ColumnType::Enum { name, variants } = &self.ty {
            let allowed: Vec<String> = variants.iter().map(|v| quote_literal(v)).collect();
            sql.push_str(&format!(
                " CONSTRAINT \"{}\" CHECK (\"{}\" IN ({}))",
                name,
                self.name,
                allowed.join(", ")
            ));
        }
        sql
    }
}

/// Multi-column uniqueness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Shape of a table: columns and table-level constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<Column>,
    unique_constraints: Vec<UniqueConstraint>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn unique(mut self, name: Option<&str>, columns: &[&str]) -> Self {
        self.unique_constraints.push(UniqueConstraint {
            name: name.map(str::to_string),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique_constraints
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn insert(&self) -> Insert<'_> {
        Insert::new(self)
    }

    /// `CREATE TABLE IF NOT EXISTS` for this shape
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(Column::sql).collect();

        for constraint in &self.unique_constraints {
            let columns: Vec<String> = constraint
                .columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect();
            let prefix = constraint
                .name
                .as_ref()
                .map(|n| format!("CONSTRAINT \"{}\" ", n))
                .unwrap_or_default();
            parts.push(format!("{}UNIQUE ({})", prefix, columns.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
            self.name,
            parts.join(",\n    ")
        )
    }
}

/// Handle to a table registered in a catalog
pub type TableHandle = Arc<TableDef>;

/// Registry of table definitions bound to a store
pub struct Catalog {
    engine: Option<Arc<dyn Store>>,
    tables: HashMap<String, TableHandle>,
    telemetry: Telemetry,
}

impl Catalog {
    pub fn new(engine: Arc<dyn Store>, telemetry: Telemetry) -> Self {
        Self {
            engine: Some(engine),
            tables: HashMap::new(),
            telemetry,
        }
    }

    /// A catalog with no store behind it; table creation fails with `NoEngine`
    pub fn unbound(telemetry: Telemetry) -> Self {
        Self {
            engine: None,
            tables: HashMap::new(),
            telemetry,
        }
    }

    pub fn engine(&self) -> Result<&Arc<dyn Store>> {
        self.engine.as_ref().ok_or(AppError::NoEngine)
    }

    pub fn table(&self, name: &str) -> Option<TableHandle> {
        self.tables.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

/// Return the catalog's handle for `table`, creating the table on first use.
pub fn get_or_create_table(catalog: Option<&mut Catalog>, table: TableDef) -> Result<TableHandle> {
    let catalog = catalog.ok_or(AppError::NoMetadata)?;

    if let Some(existing) = catalog.tables.get(table.name()) {
        return Ok(existing.clone());
    }

    let engine = catalog.engine()?;
    if !engine.table_exists(table.name())? {
        engine.create_table(&table)?;
        let name = table.name();
        catalog.telemetry.scope(|| tracing::info!("Created table {}", name));
    }

    let handle = Arc::new(table);
    catalog.tables.insert(handle.name().to_string(), handle.clone());
    Ok(handle)
}

/// Default start date for both exchanges
fn epoch_2001() -> NaiveDate {
    NaiveDate::from_ymd_opt(2001, 1, 1).unwrap_or_default()
}

/// One row per security, merged across NSE and BSE
pub fn all_scrips_table() -> TableDef {
    TableDef::new(ALL_SCRIPS_TABLE)
        .column(Column::new("security_isin", ColumnType::Text(16)).primary_key())
        .column(Column::new("company_name", ColumnType::Text(80)))
        .column(Column::new("nse_traded", ColumnType::Boolean).default(DefaultValue::Bool(false)))
        .column(
            Column::new("nse_start_date", ColumnType::Date)
                .default(DefaultValue::Date(epoch_2001())),
        )
        .column(Column::new("nse_symbol", ColumnType::Text(20)))
        .column(
            Column::new("nse_suspended", ColumnType::Boolean).default(DefaultValue::Bool(false)),
        )
        .column(Column::new("bse_traded", ColumnType::Boolean).default(DefaultValue::Bool(false)))
        .column(
            Column::new("bse_start_date", ColumnType::Date)
                .default(DefaultValue::Date(epoch_2001())),
        )
        .column(Column::new("bse_id", ColumnType::Text(6)))
        .column(Column::new("bse_symbol", ColumnType::Text(20)))
        .column(Column::new(
            "bse_group",
            ColumnType::Enum {
                name: "bsegroup",
                variants: &BseGroup::ALL,
            },
        ))
}

/// Per-day bhavcopy/delivery download status
pub fn download_info_table() -> TableDef {
    TableDef::new(DOWNLOAD_INFO_TABLE)
        .column(Column::new("download_date", ColumnType::Date).unique())
        .column(
            Column::new("bhav_success", ColumnType::Boolean).default(DefaultValue::Bool(false)),
        )
        .column(
            Column::new("deliv_success", ColumnType::Boolean).default(DefaultValue::Bool(false)),
        )
        .column(
            Column::new("error_type", ColumnType::Text(16))
                .default(DefaultValue::Text(DownloadInfo::DEFAULT_ERROR_TYPE.to_string())),
        )
}

/// Daily equity OHLCV plus delivery
pub fn equities_hist_table() -> TableDef {
    TableDef::new(EQUITIES_HIST_TABLE)
        .column(Column::new("symbol", ColumnType::Text(64)))
        .column(Column::new("date", ColumnType::Date))
        .column(Column::new("open", ColumnType::Float))
        .column(Column::new("high", ColumnType::Float))
        .column(Column::new("low", ColumnType::Float))
        .column(Column::new("close", ColumnType::Float))
        .column(Column::new("volume", ColumnType::BigInt))
        .column(Column::new("delivery", ColumnType::BigInt))
        .unique(Some("symbol_date"), &["symbol", "date"])
}

/// Daily index OHLC
pub fn indices_hist_table() -> TableDef {
    TableDef::new(INDICES_HIST_TABLE)
        .column(Column::new("symbol", ColumnType::Text(64)))
        .column(Column::new("date", ColumnType::Date))
        .column(Column::new("open", ColumnType::Float))
        .column(Column::new("high", ColumnType::Float))
        .column(Column::new("low", ColumnType::Float))
        .column(Column::new("close", ColumnType::Float))
        .unique(Some("symbol_date"), &["symbol", "date"])
}

/// Corporate actions; `action` is one of D/B/S
pub fn corp_actions_table() -> TableDef {
    TableDef::new(CORP_ACTIONS_TABLE)
        .column(Column::new("symbol", ColumnType::Text(64)))
        .column(Column::new("ex_date", ColumnType::Date))
        .column(Column::new(
            "action",
            ColumnType::Enum {
                name: "corpactionenum",
                variants: &CorpAction::ALL,
            },
        ))
        .column(Column::new("ratio", ColumnType::Float))
        .column(Column::new("delta", ColumnType::Float))
        .unique(None, &["symbol", "ex_date", "action"])
}

pub fn create_or_get_all_scrips_table(catalog: Option<&mut Catalog>) -> Result<TableHandle> {
    get_or_create_table(catalog, all_scrips_table())
}

pub fn create_or_get_download_info_table(catalog: Option<&mut Catalog>) -> Result<TableHandle> {
    get_or_create_table(catalog, download_info_table())
}

pub fn create_or_get_equities_hist_table(catalog: Option<&mut Catalog>) -> Result<TableHandle> {
    get_or_create_table(catalog, equities_hist_table())
}

pub fn create_or_get_indices_hist_table(catalog: Option<&mut Catalog>) -> Result<TableHandle> {
    get_or_create_table(catalog, indices_hist_table())
}

pub fn create_or_get_corp_actions_table(catalog: Option<&mut Catalog>) -> Result<TableHandle> {
    get_or_create_table(catalog, corp_actions_table())
}

/// Make sure every canonical table exists
pub fn create_all_tables(catalog: &mut Catalog) -> Result<Vec<TableHandle>> {
    [
        all_scrips_table(),
        download_info_table(),
        equities_hist_table(),
        indices_hist_table(),
        corp_actions_table(),
    ]
    .into_iter()
    .map(|table| get_or_create_table(Some(&mut *catalog), table))
    .collect()
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingStore;
    use super::*;
    use crate::telemetry::testing::capturing;

    fn catalog() -> (Arc<RecordingStore>, Catalog) {
        let store = Arc::new(RecordingStore::new());
        let catalog = Catalog::new(store.clone(), Telemetry::silent());
        (store, catalog)
    }

    #[test]
    fn test_create_is_idempotent() {
        let (store, mut catalog) = catalog();

        let first = create_or_get_equities_hist_table(Some(&mut catalog)).unwrap();
        let second = create_or_get_equities_hist_table(Some(&mut catalog)).unwrap();

        assert_eq!(store.creates(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.columns(), second.columns());
        assert_eq!(first.unique_constraints(), second.unique_constraints());
        assert!(store.table_exists(EQUITIES_HIST_TABLE).unwrap());
    }

    #[test]
    fn test_existing_table_not_recreated() {
        let store = Arc::new(RecordingStore::new());
        store.inner.create_table(&corp_actions_table()).unwrap();

        let mut catalog = Catalog::new(store.clone(), Telemetry::silent());
        let handle = create_or_get_corp_actions_table(Some(&mut catalog)).unwrap();

        assert_eq!(store.creates(), 0);
        assert_eq!(handle.name(), CORP_ACTIONS_TABLE);
        assert!(catalog.contains(CORP_ACTIONS_TABLE));
    }

    #[test]
    fn test_each_table_independent() {
        let (store, mut catalog) = catalog();
        let tables = create_all_tables(&mut catalog).unwrap();
        assert_eq!(tables.len(), 5);
        assert_eq!(store.creates(), 5);

        create_all_tables(&mut catalog).unwrap();
        assert_eq!(store.creates(), 5);
    }

    #[test]
    fn test_creation_logged_to_injected_sink() {
        let (sink, captured) = capturing();
        let store = Arc::new(RecordingStore::new());
        let mut catalog = Catalog::new(store, sink);

        create_or_get_indices_hist_table(Some(&mut catalog)).unwrap();
        create_or_get_indices_hist_table(Some(&mut catalog)).unwrap();

        let log = captured();
        assert_eq!(log.matches("Created table nse_indices_hist_data").count(), 1);
    }

    #[test]
    fn test_missing_catalog() {
        let err = create_or_get_all_scrips_table(None).unwrap_err();
        assert!(matches!(err, AppError::NoMetadata));
    }

    #[test]
    fn test_unbound_catalog() {
        let mut catalog = Catalog::unbound(Telemetry::silent());
        let err = create_or_get_download_info_table(Some(&mut catalog)).unwrap_err();
        assert!(matches!(err, AppError::NoEngine));
        assert!(!catalog.contains(DOWNLOAD_INFO_TABLE));
    }

    #[test]
    fn test_create_sql_shape() {
        let sql = corp_actions_table().create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"nse_corp_actions_hist_data\""));
        assert!(sql.contains("CHECK (\"action\" IN ('D', 'B', 'S'))"));
        assert!(sql.contains("UNIQUE (\"symbol\", \"ex_date\", \"action\")"));

        let sql = all_scrips_table().create_sql();
        assert!(sql.contains("\"security_isin\" VARCHAR(16) PRIMARY KEY"));
        assert!(sql.contains("\"nse_start_date\" DATE DEFAULT '2001-01-01'"));

        let sql = download_info_table().create_sql();
        assert!(sql.contains("\"download_date\" DATE UNIQUE"));
        assert!(sql.contains("DEFAULT 'DLOAD_ERR'"));
    }

    #[test]
    fn test_defaults_applied_by_store() {
        let (store, mut catalog) = catalog();
        let table = create_or_get_all_scrips_table(Some(&mut catalog)).unwrap();

        let stmt = table
            .insert()
            .set("security_isin", "INE000A01011".to_string())
            .build()
            .unwrap();
        store.execute(&stmt).unwrap();

        let (traded, start): (bool, String) = store
            .inner
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT nse_traded, nse_start_date FROM all_scrips_info",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .unwrap();
        assert!(!traded);
        assert_eq!(start, "2001-01-01");
    }
}
