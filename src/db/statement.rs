//! Parameterised statements and the insert builder

use super::schema::TableDef;
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use rusqlite::types::Value;

/// SQL text plus positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// What the store should do when a row collides with a unique key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Fail the statement (the caller decides whether to ignore it)
    Abort,
    /// Replace the existing row
    Replace,
}

/// Builder for `INSERT` statements against a known table
#[derive(Debug)]
pub struct Insert<'t> {
    table: &'t TableDef,
    values: Vec<(String, Value)>,
    on_conflict: OnConflict,
}

impl<'t> Insert<'t> {
    pub fn new(table: &'t TableDef) -> Self {
        Self {
            table,
            values: Vec::new(),
            on_conflict: OnConflict::Abort,
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.values.push((column.to_string(), value.into()));
        self
    }

    /// Set `column` only when a value is present, leaving the column default
    /// in charge otherwise
    pub fn set_opt<V: Into<Value>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn set_date(self, column: &str, date: NaiveDate) -> Self {
        self.set(column, date_value(date))
    }

    pub fn on_conflict(mut self, policy: OnConflict) -> Self {
        self.on_conflict = policy;
        self
    }

    /// Validate column names and render the statement
    pub fn build(self) -> Result<Statement> {
        let table = self.table;

        for (i, (column, _)) in self.values.iter().enumerate() {
            if !table.has_column(column) {
                return Err(AppError::Validation(format!(
                    "table '{}' has no column '{}'",
                    table.name(),
                    column
                )));
            }
            if self.values[..i].iter().any(|(c, _)| c == column) {
                return Err(AppError::Validation(format!(
                    "column '{}' set twice for table '{}'",
                    column,
                    table.name()
                )));
            }
        }

        let verb = match self.on_conflict {
            OnConflict::Abort => "INSERT",
            OnConflict::Replace => "INSERT OR REPLACE",
        };

        if self.values.is_empty() {
            return Ok(Statement::new(
                format!("{} INTO \"{}\" DEFAULT VALUES", verb, table.name()),
                Vec::new(),
            ));
        }

        let columns: Vec<String> = self
            .values
            .iter()
            .map(|(c, _)| format!("\"{}\"", c))
            .collect();
        let placeholders: Vec<String> =
            (1..=self.values.len()).map(|i| format!("?{}", i)).collect();

        let sql = format!(
            "{} INTO \"{}\" ({}) VALUES ({})",
            verb,
            table.name(),
            columns.join(", "),
            placeholders.join(", ")
        );
        let params = self.values.into_iter().map(|(_, v)| v).collect();

        Ok(Statement::new(sql, params))
    }
}

/// Dates are stored as ISO text
pub fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}
