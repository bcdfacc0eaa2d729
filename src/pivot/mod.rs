//! Join-aggregate-pivot engine.
//!
//! Each dataset family is first reduced to [`JoinInputs`] (foods with their
//! lookups resolved, per-gram nutrients and portions keyed by `fdc_id`) by the
//! family preparers in [`survey`] and [`branded`]. [`build_wide_table`] then
//! fans nutrients out across portions, collapses duplicate observations under
//! the family's [`DuplicatePolicy`] and pivots the long rows into one column
//! per nutrient.

pub mod branded;
pub mod survey;

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::formatting::{format_names, format_value};
use crate::nutrients::{
    filter_and_convert, NutrientObservation, PerGramNutrient, ENERGY_NUTRIENT, RELEVANT_NUTRIENTS,
};
use crate::portion::{normalize_portion, portion_descriptor, PortionParser};
use crate::source::SourceInfo;
use crate::tables::{FoodNutrientRow, NutrientRow};
use crate::wide::{Value, WideTable};
use crate::NO_VALUE;

/// How repeated observations of the same (food, nutrient, portion) collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Mean,
    First,
}

/// Quantity the per-gram energy is multiplied by to get `portion_energy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyBasis {
    GramWeight,
    PortionAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub policy: DuplicatePolicy,
    pub energy_basis: EnergyBasis,
}

/// A food after the category lookup. Missing text is already `no_value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodInfo {
    pub fdc_id: i64,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortionInfo {
    pub amount: f64,
    pub unit: String,
    pub modifier: String,
    pub gram_weight: f64,
}

/// Per-food columns that only some families carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodExtras {
    pub brand_owner: Option<String>,
    pub brand_name: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub ontology_common_name: Option<String>,
    pub ontology_category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JoinInputs {
    pub foods: Vec<FoodInfo>,
    pub nutrients: HashMap<i64, Vec<PerGramNutrient>>,
    pub portions: HashMap<i64, Vec<PortionInfo>>,
    pub extras: HashMap<i64, FoodExtras>,
    pub brand_columns: bool,
    pub ontology_columns: bool,
}

/// Left-joins `food_nutrient` onto `nutrient`, then filters and rescales.
/// Observations whose nutrient id is unknown get a `no_value` name and are
/// dropped by the allowlist.
pub fn join_nutrients(
    food_nutrients: Vec<FoodNutrientRow>,
    nutrients: &[NutrientRow],
) -> HashMap<i64, Vec<PerGramNutrient>> {
    let definitions: HashMap<i64, &NutrientRow> = nutrients.iter().map(|n| (n.id, n)).collect();
    let observations: Vec<NutrientObservation> = food_nutrients
        .into_iter()
        .map(|row| {
            let def = definitions.get(&row.nutrient_id);
            NutrientObservation {
                fdc_id: row.fdc_id,
                nutrient_name: def
                    .and_then(|d| d.name.clone())
                    .unwrap_or_else(|| NO_VALUE.to_string()),
                nutrient_unit: def
                    .and_then(|d| d.unit_name.clone())
                    .unwrap_or_else(|| NO_VALUE.to_string()),
                amount: row.amount,
            }
        })
        .collect();

    let mut by_food: HashMap<i64, Vec<PerGramNutrient>> = HashMap::new();
    for nutrient in filter_and_convert(observations) {
        by_food.entry(nutrient.fdc_id).or_default().push(nutrient);
    }
    by_food
}

/// Running collapse of `N` numeric fields under a [`DuplicatePolicy`].
#[derive(Debug, Clone, Copy)]
struct Collapse<const N: usize> {
    count: usize,
    values: [f64; N],
}

impl<const N: usize> Collapse<N> {
    fn new() -> Self {
        Self {
            count: 0,
            values: [0.0; N],
        }
    }

    fn add(&mut self, policy: DuplicatePolicy, values: [f64; N]) {
        match policy {
            DuplicatePolicy::Mean => {
                for (acc, v) in self.values.iter_mut().zip(values) {
                    *acc += v;
                }
            }
            DuplicatePolicy::First => {
                if self.count == 0 {
                    self.values = values;
                }
            }
        }
        self.count += 1;
    }

    fn finish(&self, policy: DuplicatePolicy) -> [f64; N] {
        match policy {
            DuplicatePolicy::Mean if self.count > 0 => self.values.map(|v| v / self.count as f64),
            _ => self.values,
        }
    }
}

/// Groups `items` by `key` in first-appearance order, collapsing their values.
fn collapse_by<K, T, const N: usize>(
    items: impl IntoIterator<Item = T>,
    policy: DuplicatePolicy,
    key: impl Fn(&T) -> K,
    values: impl Fn(&T) -> [f64; N],
) -> Vec<(K, [f64; N])>
where
    K: Hash + Eq + Clone,
{
    let mut order: Vec<(K, Collapse<N>)> = Vec::new();
    let mut slots: HashMap<K, usize> = HashMap::new();
    for item in items {
        let k = key(&item);
        let slot = *slots.entry(k.clone()).or_insert_with(|| {
            order.push((k, Collapse::new()));
            order.len() - 1
        });
        order[slot].1.add(policy, values(&item));
    }
    order.into_iter().map(|(k, c)| (k, c.finish(policy))).collect()
}

/// One fanned-out observation. `nutrient` is `None` for foods with no
/// surviving nutrient rows so that they still reach the pivot.
struct LongRow<'a> {
    food: &'a FoodInfo,
    portion: &'a PortionInfo,
    nutrient: Option<&'a PerGramNutrient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey<'a> {
    fdc_id: i64,
    description: &'a str,
    category: &'a str,
    nutrient_name: Option<&'a str>,
    nutrient_unit: Option<&'a str>,
    portion_modifier: &'a str,
    portion_unit: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PivotKey<'a> {
    fdc_id: i64,
    description: &'a str,
    category: &'a str,
    portion_unit: &'a str,
    portion_modifier: &'a str,
    amount_bits: u64,
    gram_weight_bits: u64,
}

struct PivotRow<'a> {
    key: PivotKey<'a>,
    amount: f64,
    gram_weight: f64,
    nutrients: HashMap<&'a str, f64>,
}

fn fan_out(inputs: &JoinInputs) -> Vec<LongRow<'_>> {
    let mut long_rows = Vec::new();
    let mut without_portion = 0usize;
    for food in &inputs.foods {
        let portions = match inputs.portions.get(&food.fdc_id) {
            Some(p) if !p.is_empty() => p,
            _ => {
                without_portion += 1;
                continue;
            }
        };
        let nutrients = inputs.nutrients.get(&food.fdc_id).map(Vec::as_slice).unwrap_or(&[]);
        for portion in portions {
            if nutrients.is_empty() {
                long_rows.push(LongRow {
                    food,
                    portion,
                    nutrient: None,
                });
            }
            for nutrient in nutrients {
                long_rows.push(LongRow {
                    food,
                    portion,
                    nutrient: Some(nutrient),
                });
            }
        }
    }
    if without_portion > 0 {
        info!("Dropped {} foods without a portion record", without_portion);
    }
    long_rows
}

fn aggregate<'a>(long_rows: Vec<LongRow<'a>>, policy: DuplicatePolicy) -> Vec<(GroupKey<'a>, [f64; 3])> {
    collapse_by(
        long_rows,
        policy,
        |row| GroupKey {
            fdc_id: row.food.fdc_id,
            description: &row.food.description,
            category: &row.food.category,
            nutrient_name: row.nutrient.map(|n| n.nutrient_name.as_str()),
            nutrient_unit: row.nutrient.map(|n| n.unit.as_str()),
            portion_modifier: &row.portion.modifier,
            portion_unit: &row.portion.unit,
        },
        |row| {
            [
                row.nutrient.map(|n| n.per_gram_amount).unwrap_or(0.0),
                row.portion.amount,
                row.portion.gram_weight,
            ]
        },
    )
}

fn pivot<'a>(aggregated: Vec<(GroupKey<'a>, [f64; 3])>, policy: DuplicatePolicy) -> Vec<PivotRow<'a>> {
    let mut rows: Vec<PivotRow<'a>> = Vec::new();
    let mut observed: Vec<Vec<(&'a str, f64)>> = Vec::new();
    let mut slots: HashMap<PivotKey<'a>, usize> = HashMap::new();
    for (group, [per_gram, amount, gram_weight]) in aggregated {
        let key = PivotKey {
            fdc_id: group.fdc_id,
            description: group.description,
            category: group.category,
            portion_unit: group.portion_unit,
            portion_modifier: group.portion_modifier,
            amount_bits: amount.to_bits(),
            gram_weight_bits: gram_weight.to_bits(),
        };
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            rows.push(PivotRow {
                key,
                amount,
                gram_weight,
                nutrients: HashMap::new(),
            });
            observed.push(Vec::new());
            rows.len() - 1
        });
        if let Some(name) = group.nutrient_name {
            observed[slot].push((name, per_gram));
        }
    }

    // The same nutrient name can reach one cell under two units.
    for (row, cells) in rows.iter_mut().zip(observed) {
        row.nutrients = collapse_by(cells, policy, |(n, _)| *n, |(_, v)| [*v])
            .into_iter()
            .map(|(n, [v])| (n, v))
            .collect();
    }

    rows.sort_by_key(|r| r.key.fdc_id);
    rows
}

fn text_or_sentinel(value: Option<&String>) -> Value {
    match value {
        Some(v) => Value::text(format_value(v)),
        None => Value::text(NO_VALUE),
    }
}

/// Runs the fan-out join, duplicate aggregation and pivot for one family and
/// returns its wide table with formatted column names.
pub fn build_wide_table(
    inputs: &JoinInputs,
    settings: EngineSettings,
    source: &SourceInfo,
    parser: &dyn PortionParser,
) -> WideTable {
    let long_rows = fan_out(inputs);
    info!("Fan-out join produced {} long rows", long_rows.len());
    let aggregated = aggregate(long_rows, settings.policy);
    info!("Collapsed to {} rows with {:?} policy", aggregated.len(), settings.policy);
    let pivoted = pivot(aggregated, settings.policy);
    info!("Pivoted into {} wide rows", pivoted.len());

    let observed: HashSet<&str> = pivoted.iter().flat_map(|r| r.nutrients.keys().copied()).collect();
    let present: Vec<&str> = RELEVANT_NUTRIENTS
        .iter()
        .copied()
        .filter(|name| observed.contains(name))
        .collect();

    let mut raw_columns: Vec<&str> = vec!["fdc_id", "usda_data_source", "data_type", "category", "food_description"];
    if inputs.brand_columns {
        raw_columns.extend(["brand_owner", "brand_name", "ingredients"]);
    }
    if inputs.ontology_columns {
        raw_columns.extend(["ontology_common_name", "ontology_category"]);
    }
    raw_columns.extend([
        "portion_amount",
        "portion_unit",
        "portion_modifier",
        "standardized_quantity",
        "standardized_portion",
        "portion_gram_weight",
        "portion_energy",
    ]);
    raw_columns.extend(present.iter().copied());

    let mut table = WideTable::new(format_names(&raw_columns));
    let no_extras = FoodExtras::default();

    for row in &pivoted {
        let key = &row.key;
        let extras = inputs.extras.get(&key.fdc_id).unwrap_or(&no_extras);
        let energy = row.nutrients.get(ENERGY_NUTRIENT).copied().unwrap_or(0.0);
        let portion_energy = match settings.energy_basis {
            EnergyBasis::GramWeight => energy * row.gram_weight,
            EnergyBasis::PortionAmount => energy * row.amount,
        };
        let descriptor = portion_descriptor(row.amount, key.portion_unit, key.portion_modifier);
        let standardized = normalize_portion(parser, &descriptor);
        debug!("fdc_id {}: portion {:?} -> {:?}", key.fdc_id, descriptor, standardized);

        let mut values = Vec::with_capacity(raw_columns.len());
        values.push(Value::Int(key.fdc_id));
        values.push(Value::text(source.source_label.as_str()));
        values.push(Value::text(source.data_type.as_str()));
        values.push(Value::text(format_value(key.category)));
        values.push(Value::text(format_value(key.description)));
        if inputs.brand_columns {
            values.push(text_or_sentinel(extras.brand_owner.as_ref()));
            values.push(text_or_sentinel(extras.brand_name.as_ref()));
            values.push(Value::List(extras.ingredients.clone().unwrap_or_else(|| vec![String::new()])));
        }
        if inputs.ontology_columns {
            values.push(text_or_sentinel(extras.ontology_common_name.as_ref()));
            values.push(text_or_sentinel(extras.ontology_category.as_ref()));
        }
        values.push(Value::Float(row.amount));
        values.push(Value::text(key.portion_unit));
        values.push(Value::text(key.portion_modifier));
        values.push(Value::text(standardized.quantity.to_string()));
        values.push(Value::text(standardized.unit.to_string()));
        values.push(Value::Float(row.gram_weight));
        values.push(Value::Float(portion_energy));
        for name in &present {
            values.push(Value::Float(row.nutrients.get(name).copied().unwrap_or(0.0)));
        }
        table.push_row(values);
    }

    info!(
        "{} wide table: {} rows, {} columns",
        source.data_type,
        table.len(),
        table.columns().len()
    );
    table
}
