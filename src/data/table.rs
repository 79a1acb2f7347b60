//! Record tables with a schema discovered while scanning

use crate::Value;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// One flat row: column name to value, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an existing value in place
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Convenience for tests and callers that expect text
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// A named record set keyed by a fixed set of columns.
///
/// Columns are added the first time they are seen; earlier rows read null
/// for them. This is what lets team stats and per-player stats take their
/// column names from the page itself.
#[derive(Debug, Clone)]
pub struct Table {
    name: &'static str,
    key: &'static [&'static str],
    columns: Vec<String>,
    /// Lower-cased column name to position; SQLite column names ignore case
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: &'static str, key: &'static [&'static str]) -> Self {
        let mut table = Table {
            name,
            key,
            columns: Vec::new(),
            index: HashMap::new(),
            rows: Vec::new(),
        };
        for column in key {
            table.ensure_column(column);
        }
        table
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &'static [&'static str] {
        self.key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(&column.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, creating it (null-filled) if unseen.
    ///
    /// Names differing only in ASCII case share one column, spelled as first seen.
    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.column_index(column) {
            return idx;
        }
        let idx = self.columns.len();
        self.columns.push(column.to_string());
        self.index.insert(column.to_ascii_lowercase(), idx);
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        idx
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(&column.to_ascii_lowercase()).copied()
    }

    /// Append an all-null row and return its index
    pub fn push_empty(&mut self) -> usize {
        self.rows.push(vec![Value::Null; self.columns.len()]);
        self.rows.len() - 1
    }

    pub fn push(&mut self, record: Record) -> usize {
        let row = self.push_empty();
        for (column, value) in record.fields {
            self.set(row, &column, value);
        }
        row
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn set(&mut self, row: usize, column: &str, value: impl Into<Value>) {
        let idx = self.ensure_column(column);
        if let Some(r) = self.rows.get_mut(row) {
            r[idx] = value.into();
        }
    }

    /// Set a column to the same value on every row
    pub fn fill(&mut self, column: &str, value: impl Into<Value>) {
        let idx = self.ensure_column(column);
        let value = value.into();
        for row in &mut self.rows {
            row[idx] = value.clone();
        }
    }

    /// First row whose column holds the given text
    pub fn find_row(&self, column: &str, value: &str) -> Option<usize> {
        let idx = self.column_index(column)?;
        self.rows.iter().position(|r| r[idx].as_str() == Some(value))
    }

    pub fn row(&self, row: usize) -> Option<Record> {
        self.rows.get(row).map(|values| Record {
            fields: self.columns.iter().cloned().zip(values.iter().cloned()).collect(),
        })
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.rows.len()).filter_map(|i| self.row(i)).collect()
    }

    /// Raw row values in column order
    pub fn values(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.as_slice())
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Table", 3)?;
        s.serialize_field("name", self.name)?;
        s.serialize_field("key", self.key)?;
        s.serialize_field("rows", &self.records())?;
        s.end()
    }
}

/// A row removed by strict filtering, with the reason it was removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dropped {
    pub row: usize,
    pub reason: String,
}

/// Rows kept by a strict filter, plus an audit trail of what was dropped
#[derive(Debug, Clone)]
pub struct Filtered<T> {
    pub kept: T,
    pub dropped: Vec<Dropped>,
}

impl<T> Filtered<T> {
    pub fn new(kept: T) -> Self {
        Filtered {
            kept,
            dropped: Vec::new(),
        }
    }

    pub fn drop_row(&mut self, row: usize, reason: impl Into<String>) {
        self.dropped.push(Dropped {
            row,
            reason: reason.into(),
        });
    }

    /// Report dropped rows through the log and hand back the kept value
    pub fn into_logged(self, context: &str) -> T {
        for d in &self.dropped {
            log::warn!("{}: dropped row {} ({})", context, d.row, d.reason);
        }
        self.kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_column_null_fills_existing_rows() {
        let mut table = Table::new("t", &["id"]);
        table.push(Record::new().with("id", "a").with("x", "1"));
        table.push(Record::new().with("id", "b").with("y", "2"));

        assert_eq!(table.columns(), ["id", "x", "y"]);
        assert_eq!(table.get(0, "y"), Some(&Value::Null));
        assert_eq!(table.get(1, "x"), Some(&Value::Null));
        assert_eq!(table.get(1, "y"), Some(&Value::text("2")));
    }

    #[test]
    fn test_columns_differing_in_case_are_merged() {
        let mut table = Table::new("game_info", &["game_id"]);
        table.push(Record::new().with("game_id", "g1").with("Stadium", "Arrowhead"));
        table.push(Record::new().with("game_id", "g2").with("stadium", "NRG Stadium"));

        assert_eq!(table.columns(), ["game_id", "Stadium"]);
        assert!(table.has_column("STADIUM"));
        assert_eq!(table.get(1, "Stadium"), Some(&Value::text("NRG Stadium")));
    }

    #[test]
    fn test_fill_and_find() {
        let mut table = Table::new("t", &["id"]);
        table.push(Record::new().with("id", "a"));
        table.push(Record::new().with("id", "b"));
        table.fill("game_id", "g1");

        assert_eq!(table.find_row("id", "b"), Some(1));
        assert_eq!(table.find_row("id", "c"), None);
        let rows = table.records();
        assert!(rows.iter().all(|r| r.text("game_id") == Some("g1")));
    }

    #[test]
    fn test_record_set_replaces_in_place() {
        let mut rec = Record::new().with("a", 1i64).with("b", 2i64);
        rec.set("a", 3i64);
        assert_eq!(rec.columns().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(rec.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_record_serializes_in_order() {
        let rec = Record::new().with("z", "1").with("a", Value::Null);
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"z":"1","a":null}"#);
    }
}
