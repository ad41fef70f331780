//! Statement execution with optional duplicate suppression
//!
//! Batches are not atomic: every statement commits on its own, so a failure
//! part way through leaves the earlier rows in place.

use super::schema::Catalog;
use super::statement::Statement;
use super::{ExecResult, Store};
use crate::error::{AppError, Result};
use crate::telemetry::Telemetry;
use std::sync::Arc;

/// Executes statements against a bound store
pub struct PersistenceGateway {
    engine: Option<Arc<dyn Store>>,
    telemetry: Telemetry,
}

impl PersistenceGateway {
    pub fn new(engine: Option<Arc<dyn Store>>, telemetry: Telemetry) -> Self {
        Self { engine, telemetry }
    }

    /// Share the catalog's store
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            engine: catalog.engine().ok().cloned(),
            telemetry: catalog.telemetry().clone(),
        }
    }

    fn engine(&self) -> Result<&Arc<dyn Store>> {
        self.engine.as_ref().ok_or(AppError::NoEngine)
    }

    /// Run a single statement
    pub fn execute_one(&self, statement: &Statement) -> Result<ExecResult> {
        self.engine()?.execute(statement)
    }

    /// Run a query returning one boolean
    pub fn exists(&self, statement: &Statement) -> Result<bool> {
        self.engine()?.exists(statement)
    }

    /// Run an insert.
    ///
    /// With `ignore_duplicate`, a unique-key collision yields `Ok(None)`.
    /// Every other failure is returned as-is.
    pub fn insert_one(
        &self,
        statement: &Statement,
        ignore_duplicate: bool,
    ) -> Result<Option<ExecResult>> {
        match self.execute_one(statement) {
            Ok(result) => Ok(Some(result)),
            Err(e) if ignore_duplicate && e.is_unique_violation() => {
                self.telemetry.scope(|| tracing::debug!("Skipping duplicate row: {}", e));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run inserts in order, collecting the results of those that wrote a row.
    ///
    /// Without `ignore_duplicate` the first collision stops the batch.
    pub fn insert_many<'s, I>(
        &self,
        statements: I,
        ignore_duplicate: bool,
    ) -> Result<Vec<ExecResult>>
    where
        I: IntoIterator<Item = &'s Statement>,
    {
        let engine = self.engine()?;
        let mut results = Vec::new();
        let mut skipped = 0usize;

        for statement in statements {
            match engine.execute(statement) {
                Ok(result) => results.push(result),
                Err(e) if ignore_duplicate && e.is_unique_violation() => skipped += 1,
                Err(e) => return Err(e),
            }
        }

        if skipped > 0 {
            self.telemetry.scope(|| {
                tracing::debug!("Inserted {} rows, skipped {} duplicates", results.len(), skipped)
            });
        }
        Ok(results)
    }
}
