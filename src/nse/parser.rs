//! Line-oriented CSV record extraction
//!
//! Exchange feeds are plain comma-separated text with optionally quoted
//! fields and no escaping. [`RecordParser`] walks the text one line per pull,
//! drops rows of the wrong shape, and hands the rest to a row mapper.

use crate::error::{AppError, Result};
use crate::models::parse_exchange_date;
use crate::telemetry::Telemetry;
use chrono::NaiveDate;
use std::borrow::Cow;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::str::FromStr;

/// One accepted line, split into cleaned fields
#[derive(Debug, Clone)]
pub struct Row<'a> {
    line: usize,
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    /// Split a raw line on commas and strip quotes/whitespace from each field
    pub fn split(line_no: usize, raw: &'a str) -> Self {
        let fields = raw.split(',').map(clean_field).collect();
        Self {
            line: line_no,
            fields,
        }
    }

    /// 1-based line number in the source text
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Cleaned field `idx`, empty when out of range
    pub fn get(&self, idx: usize) -> &'a str {
        self.fields.get(idx).copied().unwrap_or("")
    }

    pub fn text(&self, idx: usize) -> String {
        self.get(idx).to_string()
    }

    /// Parse field `idx`; failures are hard errors tagged with the line
    pub fn parse<T>(&self, idx: usize, column: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.get(idx);
        raw.parse::<T>()
            .map_err(|e| self.malformed(format!("{} '{}': {}", column, raw, e)))
    }

    pub fn date(&self, idx: usize, column: &str) -> Result<NaiveDate> {
        let raw = self.get(idx);
        parse_exchange_date(raw)
            .map_err(|_| self.malformed(format!("{} '{}' is not a date", column, raw)))
    }

    pub fn malformed(&self, reason: impl Into<String>) -> AppError {
        AppError::MalformedRow {
            line: self.line,
            reason: reason.into(),
        }
    }
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

/// Pull-based parser over the lines of a feed.
///
/// Yields `Ok(record)` per accepted row. A mapper error is yielded once and
/// ends the sequence. Once exhausted it stays exhausted.
pub struct RecordParser<'a, T, M> {
    text: Cow<'a, str>,
    cursor: usize,
    line: usize,
    finished: bool,
    min_fields: usize,
    header_sentinel: Option<String>,
    mapper: M,
    skipped: usize,
    telemetry: Telemetry,
    _record: PhantomData<fn() -> T>,
}

/// Build a lazy record sequence over `text`.
///
/// Rows with fewer than `min_fields` fields, and rows whose first field
/// matches `header_sentinel` (trimmed, case-insensitive), are skipped. The
/// mapper may also skip a row by returning `Ok(None)`.
pub fn parse<'a, T, M>(
    text: impl Into<Cow<'a, str>>,
    min_fields: usize,
    header_sentinel: Option<&str>,
    row_mapper: M,
) -> RecordParser<'a, T, M>
where
    M: FnMut(&Row<'_>) -> Result<Option<T>>,
{
    RecordParser {
        text: text.into(),
        cursor: 0,
        line: 0,
        finished: false,
        min_fields,
        header_sentinel: header_sentinel.map(|s| s.trim().to_lowercase()),
        mapper: row_mapper,
        skipped: 0,
        telemetry: Telemetry::silent(),
        _record: PhantomData,
    }
}

impl<'a, T, M> RecordParser<'a, T, M>
where
    M: FnMut(&Row<'_>) -> Result<Option<T>>,
{
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Lines skipped so far (bad shape, header, or mapper skip)
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Next raw line as a byte range into `text`
    fn next_line(&mut self) -> Option<(usize, usize)> {
        if self.finished {
            return None;
        }

        let start = self.cursor;
        let end = match self.text[start..].find('\n') {
            Some(offset) => {
                self.cursor = start + offset + 1;
                start + offset
            }
            None => {
                self.finished = true;
                self.text.len()
            }
        };
        self.line += 1;
        Some((start, end))
    }

    fn is_header(&self, row: &Row<'_>) -> bool {
        match &self.header_sentinel {
            Some(sentinel) => row.get(0).to_lowercase() == *sentinel,
            None => false,
        }
    }
}

impl<'a, T, M> Iterator for RecordParser<'a, T, M>
where
    M: FnMut(&Row<'_>) -> Result<Option<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, end)) = self.next_line() {
            let row = Row::split(self.line, &self.text[start..end]);

            if row.len() < self.min_fields {
                self.skipped += 1;
                let (line, raw) = (self.line, &self.text[start..end]);
                self.telemetry
                    .scope(|| tracing::debug!("Unhandled line {}: {:?}", line, raw));
                continue;
            }

            if self.is_header(&row) {
                self.skipped += 1;
                continue;
            }

            match (self.mapper)(&row) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {
                    self.skipped += 1;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        None
    }
}

impl<'a, T, M> FusedIterator for RecordParser<'a, T, M> where
    M: FnMut(&Row<'_>) -> Result<Option<T>>
{
}
