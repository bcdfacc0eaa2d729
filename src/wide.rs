use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A single cell of a wide table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Missing | Value::List(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(*v as i64),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Flat-file rendering. Lists become JSON arrays so embedded commas never
    /// collide with the CSV delimiter.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::List(items) => serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

/// Column-named rows, one `Vec<Value>` per row in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl WideTable {
    pub fn new(columns: Vec<String>) -> Self {
        let index = columns.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();
        Self {
            columns,
            index,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Appends a row, padding short rows with `Missing` and dropping extra cells.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn distinct_ids(&self, column: &str) -> HashSet<i64> {
        match self.column_index(column) {
            Some(col) => self.rows.iter().filter_map(|r| r[col].as_i64()).collect(),
            None => HashSet::new(),
        }
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .from_path(path)
            .with_context(|| format!("Failed to create output file {:?}", path))?;
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Value::to_cell))?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to flush output file {:?}", path))?;
        Ok(())
    }
}
