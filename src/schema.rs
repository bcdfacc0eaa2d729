//! Fixed output schema and the unifier that stacks per-family wide tables
//! into it.

use lazy_static::lazy_static;
use log::{debug, info};
use std::collections::HashSet;

use crate::nutrients::NUTRIENT_COLUMNS;
use crate::wide::{Value, WideTable};
use crate::NO_VALUE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    JsonList,
}

impl ColumnKind {
    pub fn default_value(&self) -> Value {
        match self {
            ColumnKind::Integer => Value::Int(0),
            ColumnKind::Float => Value::Float(0.0),
            ColumnKind::Text => Value::text(NO_VALUE),
            ColumnKind::JsonList => Value::List(Vec::new()),
        }
    }

    /// Coerces `value` to this kind. Anything that cannot be coerced, and
    /// missing cells, become the default.
    pub fn cast(&self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Missing) => self.default_value(),
            (ColumnKind::Integer, v) => v.as_i64().map(Value::Int).unwrap_or_else(|| self.default_value()),
            (ColumnKind::Float, v) => v
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .unwrap_or_else(|| self.default_value()),
            (ColumnKind::Text, Value::Text(s)) => Value::Text(s),
            (ColumnKind::Text, v) => Value::Text(v.to_cell()),
            (ColumnKind::JsonList, Value::List(items)) => Value::List(items),
            (ColumnKind::JsonList, Value::Text(s)) => match serde_json::from_str::<Vec<String>>(&s) {
                Ok(items) => Value::List(items),
                Err(_) => Value::List(vec![s]),
            },
            (ColumnKind::JsonList, _) => self.default_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

const METADATA_COLUMNS: &[(&str, ColumnKind)] = &[
    ("fdc_id", ColumnKind::Integer),
    ("usda_data_source", ColumnKind::Text),
    ("data_type", ColumnKind::Text),
    ("category", ColumnKind::Text),
    ("brand_owner", ColumnKind::Text),
    ("brand_name", ColumnKind::Text),
    ("food_description", ColumnKind::Text),
    ("ingredients", ColumnKind::JsonList),
    ("ontology_common_name", ColumnKind::Text),
    ("ontology_category", ColumnKind::Text),
    ("portion_amount", ColumnKind::Float),
    ("portion_unit", ColumnKind::Text),
    ("portion_modifier", ColumnKind::Text),
    ("standardized_quantity", ColumnKind::Text),
    ("standardized_portion", ColumnKind::Text),
    ("portion_gram_weight", ColumnKind::Float),
    ("portion_energy", ColumnKind::Float),
];

lazy_static! {
    /// Column order and types of the unified output.
    pub static ref TARGET_SCHEMA: Vec<ColumnSpec> = METADATA_COLUMNS
        .iter()
        .map(|(name, kind)| ColumnSpec {
            name: name.to_string(),
            kind: *kind,
        })
        .chain(NUTRIENT_COLUMNS.iter().map(|name| ColumnSpec {
            name: name.clone(),
            kind: ColumnKind::Float,
        }))
        .collect();
}

pub fn target_columns() -> Vec<String> {
    TARGET_SCHEMA.iter().map(|c| c.name.clone()).collect()
}

/// Reorders, fills and casts every table to [`TARGET_SCHEMA`] and stacks them
/// in input order. Columns outside the schema are dropped.
pub fn unify(tables: Vec<WideTable>) -> WideTable {
    let mut unified = WideTable::new(target_columns());
    let target: HashSet<&str> = TARGET_SCHEMA.iter().map(|c| c.name.as_str()).collect();

    for table in tables {
        let extra: Vec<&String> = table.columns().iter().filter(|c| !target.contains(c.as_str())).collect();
        if !extra.is_empty() {
            debug!("Dropping columns outside the output schema: {:?}", extra);
        }
        let positions: Vec<Option<usize>> = TARGET_SCHEMA.iter().map(|c| table.column_index(&c.name)).collect();
        let added = positions.iter().filter(|p| p.is_none()).count();
        info!("Unifying {} rows ({} columns filled with defaults)", table.len(), added);

        for mut row in table.into_rows() {
            let cells = TARGET_SCHEMA
                .iter()
                .zip(&positions)
                .map(|(spec, pos)| {
                    let value = pos
                        .map(|p| std::mem::replace(&mut row[p], Value::Missing))
                        .unwrap_or(Value::Missing);
                    spec.kind.cast(value)
                })
                .collect();
            unified.push_row(cells);
        }
    }
    info!("Unified table has {} rows", unified.len());
    unified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> WideTable {
        let mut t = WideTable::new(columns.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r);
        }
        t
    }

    #[test]
    fn test_schema_layout() {
        let columns = target_columns();
        assert_eq!(columns.len(), METADATA_COLUMNS.len() + NUTRIENT_COLUMNS.len());
        assert_eq!(columns[0], "fdc_id");
        assert_eq!(columns[16], "portion_energy");
        assert_eq!(columns[17], "energy");
        let unique: HashSet<&String> = columns.iter().collect();
        assert_eq!(unique.len(), columns.len());
    }

    #[test]
    fn test_absent_columns_get_defaults() {
        let survey = table(
            &["fdc_id", "food_description", "energy", "portion_gram_weight"],
            vec![vec![Value::Int(100), Value::text("apple"), Value::Float(0.52), Value::Missing]],
        );
        let unified = unify(vec![survey]);
        assert_eq!(unified.columns(), target_columns().as_slice());
        assert_eq!(unified.get(0, "fdc_id"), Some(&Value::Int(100)));
        assert_eq!(unified.get(0, "energy"), Some(&Value::Float(0.52)));
        assert_eq!(unified.get(0, "protein"), Some(&Value::Float(0.0)));
        assert_eq!(unified.get(0, "portion_gram_weight"), Some(&Value::Float(0.0)));
        assert_eq!(unified.get(0, "brand_owner"), Some(&Value::text(NO_VALUE)));
        assert_eq!(unified.get(0, "ingredients").map(Value::to_cell), Some("[]".to_string()));
    }

    #[test]
    fn test_tables_are_stacked_in_order_and_extras_dropped() {
        let a = table(&["fdc_id", "scratch"], vec![vec![Value::Int(1), Value::text("x")]]);
        let b = table(
            &["ingredients", "fdc_id"],
            vec![vec![Value::List(vec!["sugar".into(), "cocoa".into()]), Value::Int(2)]],
        );
        let unified = unify(vec![a, b]);
        assert_eq!(unified.len(), 2);
        assert!(unified.column_index("scratch").is_none());
        assert_eq!(unified.get(1, "fdc_id"), Some(&Value::Int(2)));
        assert_eq!(
            unified.get(1, "ingredients").map(Value::to_cell),
            Some(r#"["sugar","cocoa"]"#.to_string())
        );
    }

    #[test]
    fn test_casting() {
        assert_eq!(ColumnKind::Integer.cast(Value::text("42")), Value::Int(42));
        assert_eq!(ColumnKind::Integer.cast(Value::text("abc")), Value::Int(0));
        assert_eq!(ColumnKind::Float.cast(Value::Int(3)), Value::Float(3.0));
        assert_eq!(ColumnKind::Float.cast(Value::Float(f64::NAN)), Value::Float(0.0));
        assert_eq!(ColumnKind::Text.cast(Value::Float(1.5)), Value::text("1.5"));
        assert_eq!(ColumnKind::Text.cast(Value::Missing), Value::text(NO_VALUE));
        assert_eq!(
            ColumnKind::JsonList.cast(Value::text(r#"["a","b"]"#)),
            Value::List(vec!["a".into(), "b".into()])
        );
    }
}
