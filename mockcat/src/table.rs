//! In-memory column tables and header cards
//!
//! Every table backend hands data to the readers as a [`ColumnTable`]: a set of
//! equal-length named columns looked up case-insensitively. The readers also
//! use it as their staging area, so filtering, concatenation and row selection
//! live here.

use std::collections::BTreeMap;

use crate::error::{MockError, Result};

/// A single typed column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    Str(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::F64(v) => v.len(),
            Column::F32(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Column::F64(_) => "f64",
            Column::F32(_) => "f32",
            Column::I64(_) => "i64",
            Column::Str(_) => "str",
        }
    }

    /// Numeric values widened to `f64`, or `None` for string columns
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Column::F64(v) => Some(v.clone()),
            Column::F32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Column::I64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Column::Str(_) => None,
        }
    }

    fn filter(&self, mask: &[bool]) -> Column {
        fn keep<T: Clone>(v: &[T], mask: &[bool]) -> Vec<T> {
            v.iter()
                .zip(mask)
                .filter(|(_, &m)| m)
                .map(|(x, _)| x.clone())
                .collect()
        }
        match self {
            Column::F64(v) => Column::F64(keep(v, mask)),
            Column::F32(v) => Column::F32(keep(v, mask)),
            Column::I64(v) => Column::I64(keep(v, mask)),
            Column::Str(v) => Column::Str(keep(v, mask)),
        }
    }

    fn append(&mut self, other: &Column) -> bool {
        match (self, other) {
            (Column::F64(a), Column::F64(b)) => a.extend_from_slice(b),
            (Column::F32(a), Column::F32(b)) => a.extend_from_slice(b),
            (Column::I64(a), Column::I64(b)) => a.extend_from_slice(b),
            (Column::Str(a), Column::Str(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }
}

/// Named, equal-length columns with case-insensitive lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTable {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl ColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`ColumnTable::insert`] for tests and fixtures
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self> {
        self.insert(name, column)?;
        Ok(self)
    }

    /// Add or replace a column; its length must match the existing rows
    pub fn insert(&mut self, name: &str, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.nrows() {
            return Err(MockError::LengthMismatch {
                what: "table column",
                expected: self.nrows(),
                found: column.len(),
            });
        }
        match self.position(name) {
            Some(i) => self.columns[i] = column,
            None => {
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Look up a column by name, ignoring case
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| MockError::MissingColumn {
                column: name.to_string(),
                table: format!("table with columns [{}]", self.names.join(", ")),
            })
    }

    /// Numeric column widened to `f64`
    pub fn f64_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.column(name)?;
        column.to_f64().ok_or_else(|| MockError::ColumnType {
            column: name.to_string(),
            expected: "numeric",
            found: column.type_name(),
        })
    }

    /// Integer column
    pub fn i64_column(&self, name: &str) -> Result<Vec<i64>> {
        match self.column(name)? {
            Column::I64(v) => Ok(v.clone()),
            other => Err(MockError::ColumnType {
                column: name.to_string(),
                expected: "i64",
                found: other.type_name(),
            }),
        }
    }

    /// String column
    pub fn str_column(&self, name: &str) -> Result<Vec<String>> {
        match self.column(name)? {
            Column::Str(v) => Ok(v.clone()),
            other => Err(MockError::ColumnType {
                column: name.to_string(),
                expected: "str",
                found: other.type_name(),
            }),
        }
    }

    /// A new table holding only `names`, in that order
    pub fn select(&self, names: &[&str]) -> Result<ColumnTable> {
        let mut out = ColumnTable::new();
        for name in names {
            out.insert(name, self.column(name)?.clone())?;
        }
        Ok(out)
    }

    /// Keep the rows where `mask` is true
    pub fn filter(&self, mask: &[bool]) -> Result<ColumnTable> {
        if mask.len() != self.nrows() {
            return Err(MockError::LengthMismatch {
                what: "row mask",
                expected: self.nrows(),
                found: mask.len(),
            });
        }
        Ok(ColumnTable {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.filter(mask)).collect(),
        })
    }

    /// Append the rows of `other`, which must have the same schema
    pub fn append(&mut self, other: &ColumnTable) -> Result<()> {
        if self.columns.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if other.ncols() != self.ncols() {
            return Err(MockError::LengthMismatch {
                what: "appended table columns",
                expected: self.ncols(),
                found: other.ncols(),
            });
        }
        for (name, column) in self.names.iter().zip(self.columns.iter_mut()) {
            let incoming = other.column(name)?;
            if !column.append(incoming) {
                return Err(MockError::ColumnType {
                    column: name.clone(),
                    expected: column.type_name(),
                    found: incoming.type_name(),
                });
            }
        }
        Ok(())
    }
}

/// A header keyword value
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Float(f64),
    Int(i64),
    Str(String),
    Bool(bool),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Keyword cards of one HDU, keyed case-insensitively
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderCards {
    cards: BTreeMap<String, HeaderValue>,
}

impl HeaderCards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: HeaderValue) {
        self.cards.insert(key.to_ascii_uppercase(), value);
    }

    pub fn with(mut self, key: &str, value: HeaderValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.get(&key.to_ascii_uppercase())
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
