use lazy_static::lazy_static;
use log::{debug, warn};
use std::collections::HashSet;

use crate::formatting::format_name;

/// USDA nutrient names kept in the output, in output column order.
pub const RELEVANT_NUTRIENTS: &[&str] = &[
    "Energy",
    "Carbohydrate, by difference",
    "Protein",
    "Total lipid (fat)",
    "Fiber, total dietary",
    "Sugars, Total",
    "Calcium, Ca",
    "Iron, Fe",
    "Vitamin C, total ascorbic acid",
    "Vitamin A, RAE",
    "Vitamin E (alpha-tocopherol)",
    "Sodium, Na",
    "Cholesterol",
    "Fatty acids, total saturated",
    "Fatty acids, total trans",
    "Fatty acids, total monounsaturated",
    "Fatty acids, total polyunsaturated",
    "Vitamin K (phylloquinone)",
    "Thiamin",
    "Riboflavin",
    "Niacin",
    "Vitamin B-6",
    "Folate, total",
    "Vitamin B-12",
    "Vitamin D3 (cholecalciferol)",
    "Vitamin D2 (ergocalciferol)",
    "Pantothenic acid",
    "Phosphorus, P",
    "Magnesium, Mg",
    "Potassium, K",
    "Zinc, Zn",
    "Copper, Cu",
    "Manganese, Mn",
    "Selenium, Se",
    "Carotene, beta",
    "Retinol",
    "Vitamin K (Dihydrophylloquinone)",
    "Vitamin K (Menaquinone-4)",
    "Tryptophan",
    "Threonine",
    "Methionine",
    "Phenylalanine",
    "Tyrosine",
    "Valine",
    "Arginine",
    "Histidine",
    "Isoleucine",
    "Leucine",
    "Lysine",
    "Cystine",
    "Alanine",
    "Aspartic acid",
    "Glutamic acid",
    "Glycine",
    "Proline",
    "Serine",
    "Starch",
    "Sucrose",
    "Glucose",
    "Maltose",
    "Fructose",
    "Lactose",
    "Galactose",
    "Choline, total",
    "Betaine",
];

/// Name of the energy nutrient used for the portion energy estimate.
pub const ENERGY_NUTRIENT: &str = "Energy";

lazy_static! {
    static ref RELEVANT_SET: HashSet<&'static str> = RELEVANT_NUTRIENTS.iter().copied().collect();
    /// Output column names for [`RELEVANT_NUTRIENTS`], same order.
    pub static ref NUTRIENT_COLUMNS: Vec<String> = RELEVANT_NUTRIENTS.iter().map(|n| format_name(n)).collect();
}

pub fn is_relevant(nutrient_name: &str) -> bool {
    RELEVANT_SET.contains(nutrient_name)
}

/// Unit a USDA nutrient amount is recorded in (per 100 g of food).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NutrientUnit {
    Kcal,
    Gram,
    Milligram,
    Microgram,
    Kilojoule,
    Unsupported(String),
}

impl NutrientUnit {
    pub fn parse(unit_name: &str) -> Self {
        match unit_name {
            "KCAL" => NutrientUnit::Kcal,
            "G" => NutrientUnit::Gram,
            "MG" => NutrientUnit::Milligram,
            "UG" => NutrientUnit::Microgram,
            "kJ" => NutrientUnit::Kilojoule,
            other => NutrientUnit::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NutrientUnit::Kcal => "KCAL",
            NutrientUnit::Gram => "G",
            NutrientUnit::Milligram => "MG",
            NutrientUnit::Microgram => "UG",
            NutrientUnit::Kilojoule => "kJ",
            NutrientUnit::Unsupported(s) => s,
        }
    }

    /// Factor taking a per-100 g amount in this unit to grams (or kcal) per gram.
    /// `None` for units that have no per-gram scale.
    pub fn per_gram_multiplier(&self) -> Option<f64> {
        match self {
            NutrientUnit::Kcal | NutrientUnit::Gram => Some(0.01),
            NutrientUnit::Milligram => Some(0.000_01),
            NutrientUnit::Microgram => Some(0.000_000_01),
            NutrientUnit::Kilojoule | NutrientUnit::Unsupported(_) => None,
        }
    }
}

/// One `food_nutrient` row after the `nutrient` lookup join.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientObservation {
    pub fdc_id: i64,
    pub nutrient_name: String,
    pub nutrient_unit: String,
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerGramNutrient {
    pub fdc_id: i64,
    pub nutrient_name: String,
    pub unit: NutrientUnit,
    pub per_gram_amount: f64,
}

/// Decimal places kept on per-gram amounts.
const PER_GRAM_DECIMALS: i32 = 10;

fn round_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Widens a stored amount through its shortest decimal form, so `0.3f32`
/// becomes `0.3` rather than `0.30000001192092896`.
fn widen(amount: f32) -> f64 {
    amount.to_string().parse::<f64>().unwrap_or(amount as f64)
}

/// Per-gram value for an amount in `unit`, rounded to 10 decimals. Units
/// without a scale yield `0.0` and a warning, since the measured value is
/// being discarded.
pub fn per_gram_amount(amount: f64, unit: &NutrientUnit, nutrient_name: &str) -> f64 {
    match unit.per_gram_multiplier() {
        Some(multiplier) => round_decimals(amount * multiplier, PER_GRAM_DECIMALS),
        None => {
            warn!(
                "Nutrient '{}' uses unsupported unit '{}'; its per-gram amount is set to 0.",
                nutrient_name,
                unit.as_str()
            );
            0.0
        }
    }
}

/// Keeps allowlisted nutrients not recorded in kJ and rescales them per gram.
pub fn filter_and_convert(observations: Vec<NutrientObservation>) -> Vec<PerGramNutrient> {
    let total = observations.len();
    let converted: Vec<PerGramNutrient> = observations
        .into_iter()
        .filter_map(|obs| {
            if !is_relevant(&obs.nutrient_name) {
                return None;
            }
            let unit = NutrientUnit::parse(&obs.nutrient_unit);
            if unit == NutrientUnit::Kilojoule {
                return None;
            }
            let per_gram = per_gram_amount(widen(obs.amount), &unit, &obs.nutrient_name);
            Some(PerGramNutrient {
                fdc_id: obs.fdc_id,
                nutrient_name: obs.nutrient_name,
                unit,
                per_gram_amount: per_gram,
            })
        })
        .collect();
    debug!("Kept {} of {} nutrient observations", converted.len(), total);
    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(name: &str, unit: &str, amount: f32) -> NutrientObservation {
        NutrientObservation {
            fdc_id: 1,
            nutrient_name: name.to_string(),
            nutrient_unit: unit.to_string(),
            amount,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_multiplier_table() {
        assert_eq!(NutrientUnit::parse("KCAL").per_gram_multiplier(), Some(0.01));
        assert_eq!(NutrientUnit::parse("G").per_gram_multiplier(), Some(0.01));
        assert_eq!(NutrientUnit::parse("MG").per_gram_multiplier(), Some(0.00001));
        assert_eq!(NutrientUnit::parse("UG").per_gram_multiplier(), Some(0.00000001));
        assert_eq!(NutrientUnit::parse("IU").per_gram_multiplier(), None);
    }

    #[test]
    fn test_per_gram_conversion() {
        assert!(close(per_gram_amount(52.0, &NutrientUnit::Kcal, "Energy"), 0.52));
        assert!(close(per_gram_amount(0.3, &NutrientUnit::Gram, "Protein"), 0.003));
        assert!(close(per_gram_amount(120.0, &NutrientUnit::Milligram, "Sodium, Na"), 0.0012));
        assert!(close(per_gram_amount(500.0, &NutrientUnit::Microgram, "Retinol"), 0.000005));
    }

    #[test]
    fn test_per_gram_amounts_carry_no_float_noise() {
        let kept = filter_and_convert(vec![obs("Protein", "G", 0.3), obs("Fiber, total dietary", "G", 0.7)]);
        assert_eq!(kept[0].per_gram_amount, 0.003);
        assert_eq!(kept[0].per_gram_amount.to_string(), "0.003");
        assert_eq!(kept[1].per_gram_amount.to_string(), "0.007");
        assert_eq!(per_gram_amount(0.5, &NutrientUnit::Microgram, "Vitamin B-12"), 0.000000005);
    }

    #[test]
    fn test_unsupported_unit_zeroes_out() {
        let unit = NutrientUnit::parse("IU");
        assert_eq!(unit, NutrientUnit::Unsupported("IU".to_string()));
        assert_eq!(per_gram_amount(900.0, &unit, "Vitamin A, RAE"), 0.0);
    }

    #[test]
    fn test_filter_drops_irrelevant_and_kj() {
        let rows = vec![
            obs("Energy", "KCAL", 52.0),
            obs("Energy", "kJ", 218.0),
            obs("Water", "G", 85.6),
            obs("Protein", "G", 0.3),
            obs("Vitamin D (D2 + D3), International Units", "IU", 4.0),
        ];
        let kept = filter_and_convert(rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].nutrient_name, "Energy");
        assert_eq!(kept[0].unit, NutrientUnit::Kcal);
        assert!(close(kept[0].per_gram_amount, 0.52));
        assert_eq!(kept[1].nutrient_name, "Protein");
    }

    #[test]
    fn test_relevant_unit_unknown_is_kept_as_zero() {
        let kept = filter_and_convert(vec![obs("Vitamin A, RAE", "IU", 300.0)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].per_gram_amount, 0.0);
    }

    #[test]
    fn test_nutrient_columns_are_formatted_and_unique() {
        assert_eq!(NUTRIENT_COLUMNS.len(), RELEVANT_NUTRIENTS.len());
        assert_eq!(NUTRIENT_COLUMNS[0], "energy");
        assert!(NUTRIENT_COLUMNS.contains(&"carbohydrate_by_difference".to_string()));
        let unique: HashSet<&String> = NUTRIENT_COLUMNS.iter().collect();
        assert_eq!(unique.len(), NUTRIENT_COLUMNS.len());
    }
}
