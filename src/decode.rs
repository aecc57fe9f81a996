//! Header-driven CSV decoding.
//!
//! The first row defines field names; every later row is exposed through
//! [`RawRow::get`], which normalizes the two "missing" spellings the feed
//! uses (empty string and the literal `NA`) to `None`. All typed coercion
//! is deferred to the transformers, which treat every field defensively.

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use tracing::warn;

use crate::error::ImportError;

/// A fully materialized decode result. Decoding happens once per fetched
/// payload; the table is not restartable.
#[derive(Debug)]
pub struct RawTable {
    index: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(move |record| RawRow {
            index: &self.index,
            record,
        })
    }
}

/// Borrowed view of one decoded row.
#[derive(Clone, Copy)]
pub struct RawRow<'a> {
    index: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> RawRow<'a> {
    /// Field by header name. Empty and `NA` values read as absent.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let i = *self.index.get(name)?;
        match self.record.get(i) {
            Some("") | Some("NA") | None => None,
            Some(v) => Some(v),
        }
    }

    /// True when the field is present with a non-missing value.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Decode a raw CSV payload into a materialized table.
///
/// Structural problems (unterminated quotes, rows whose column count
/// disagrees with the header) abort the decode. Rows that are individually
/// unreadable (invalid UTF-8) are dropped with a warning.
pub fn decode_csv(raw: &str) -> Result<RawTable, ImportError> {
    let mut rdr = ReaderBuilder::new().from_reader(raw.as_bytes());

    let headers = rdr.headers().map_err(ImportError::Decode)?.clone();
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for result in rdr.records() {
        match result {
            Ok(record) => rows.push(record),
            Err(err) if matches!(err.kind(), csv::ErrorKind::Utf8 { .. }) => {
                dropped += 1;
                warn!(line = ?err.position().map(|p| p.line()), "dropping undecodable row");
            }
            Err(err) => return Err(ImportError::Decode(err)),
        }
    }
    if dropped > 0 {
        warn!(dropped, "rows dropped during decode");
    }
    Ok(RawTable { index, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_driven_access() {
        let table = decode_csv("a,b,c\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!(table.len(), 2);
        let first = table.iter().next().unwrap();
        assert_eq!(first.get("a"), Some("1"));
        assert_eq!(first.get("c"), Some("3"));
        assert_eq!(first.get("missing"), None);
    }

    #[test]
    fn empty_and_na_read_as_absent() {
        let table = decode_csv("x,y,z\n,NA,ok\n").unwrap();
        let row = table.iter().next().unwrap();
        assert_eq!(row.get("x"), None);
        assert_eq!(row.get("y"), None);
        assert_eq!(row.get("z"), Some("ok"));
        assert!(!row.has("x"));
        assert!(row.has("z"));
    }

    #[test]
    fn ragged_row_is_structural_error() {
        let err = decode_csv("a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(matches!(err, ImportError::Decode(_)));
    }

    #[test]
    fn unterminated_quote_is_structural_error() {
        let err = decode_csv("a,b\n\"oops,2\n").unwrap_err();
        assert!(matches!(err, ImportError::Decode(_)));
    }

    #[test]
    fn quoted_commas_survive() {
        let table = decode_csv("desc,n\n\"run, middle\",5\n").unwrap();
        let row = table.iter().next().unwrap();
        assert_eq!(row.get("desc"), Some("run, middle"));
    }
}
