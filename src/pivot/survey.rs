//! Foundation and SR Legacy families: foods with category ids, USDA portions
//! with measure units and optional ontology attributes.

use log::info;
use std::collections::HashMap;

use super::{join_nutrients, FoodExtras, FoodInfo, JoinInputs, PortionInfo};
use crate::tables::{
    CategoryRow, FoodAttributeRow, FoodAttributeTypeRow, FoodNutrientRow, FoodRow, MeasureUnitRow, NutrientRow,
    PortionRow, NOT_APPLICABLE_UNIT_ID,
};
use crate::NO_VALUE;

const COMMON_NAME_ATTRIBUTE: &str = "Common Name";
const CATEGORY_ATTRIBUTE: &str = "Attribute";

/// Reference from a portion to `measure_unit.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureUnitRef {
    NotApplicable,
    Id(i64),
}

impl MeasureUnitRef {
    pub fn from_id(id: i64) -> Self {
        if id == NOT_APPLICABLE_UNIT_ID {
            MeasureUnitRef::NotApplicable
        } else {
            MeasureUnitRef::Id(id)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeTables {
    pub attributes: Vec<FoodAttributeRow>,
    pub types: Vec<FoodAttributeTypeRow>,
}

#[derive(Debug, Clone, Default)]
pub struct SurveyTables {
    pub foods: Vec<FoodRow>,
    pub food_nutrients: Vec<FoodNutrientRow>,
    pub nutrients: Vec<NutrientRow>,
    pub categories: Vec<CategoryRow>,
    pub portions: Vec<PortionRow>,
    pub measure_units: Vec<MeasureUnitRow>,
    pub attributes: Option<AttributeTables>,
}

fn join_categories(foods: Vec<FoodRow>, categories: &[CategoryRow]) -> Vec<FoodInfo> {
    let by_id: HashMap<i64, &str> = categories
        .iter()
        .filter_map(|c| c.description.as_deref().map(|d| (c.id, d)))
        .collect();
    foods
        .into_iter()
        .map(|f| FoodInfo {
            fdc_id: f.fdc_id,
            category: f
                .food_category_id
                .and_then(|id| by_id.get(&id))
                .map(|d| d.to_string())
                .unwrap_or_else(|| NO_VALUE.to_string()),
            description: f.description.unwrap_or_else(|| NO_VALUE.to_string()),
        })
        .collect()
}

/// Resolves portion unit names and groups portions by food. When every portion
/// is [`MeasureUnitRef::NotApplicable`] the unit lookup is skipped and the unit
/// is the sentinel.
pub fn join_portions(portions: Vec<PortionRow>, measure_units: &[MeasureUnitRow]) -> HashMap<i64, Vec<PortionInfo>> {
    let all_not_applicable = !portions.is_empty()
        && portions
            .iter()
            .all(|p| MeasureUnitRef::from_id(p.measure_unit_id) == MeasureUnitRef::NotApplicable);
    let names: HashMap<i64, &str> = if all_not_applicable {
        info!("All portions use the not-applicable measure unit; skipping the measure_unit join");
        HashMap::new()
    } else {
        measure_units
            .iter()
            .filter_map(|u| u.name.as_deref().map(|n| (u.id, n)))
            .collect()
    };

    let mut by_food: HashMap<i64, Vec<PortionInfo>> = HashMap::new();
    for p in portions {
        let unit = match MeasureUnitRef::from_id(p.measure_unit_id) {
            MeasureUnitRef::NotApplicable if all_not_applicable => None,
            _ => names.get(&p.measure_unit_id).copied(),
        };
        by_food.entry(p.fdc_id).or_default().push(PortionInfo {
            amount: p.amount,
            unit: unit.unwrap_or(NO_VALUE).to_string(),
            modifier: p.modifier.unwrap_or_else(|| NO_VALUE.to_string()),
            gram_weight: p.gram_weight,
        });
    }
    by_food
}

/// First "Common Name" and first "Attribute" value per food.
fn join_attributes(tables: AttributeTables) -> HashMap<i64, FoodExtras> {
    let type_names: HashMap<i64, String> = tables
        .types
        .into_iter()
        .filter_map(|t| t.name.map(|n| (t.id, n)))
        .collect();

    let mut extras: HashMap<i64, FoodExtras> = HashMap::new();
    for attr in tables.attributes {
        let value = match attr.value {
            Some(v) => v,
            None => continue,
        };
        let entry = extras.entry(attr.fdc_id).or_default();
        match type_names.get(&attr.food_attribute_type_id).map(String::as_str) {
            Some(COMMON_NAME_ATTRIBUTE) if entry.ontology_common_name.is_none() => {
                entry.ontology_common_name = Some(value)
            }
            Some(CATEGORY_ATTRIBUTE) if entry.ontology_category.is_none() => entry.ontology_category = Some(value),
            _ => {}
        }
    }
    extras
}

pub fn prepare(tables: SurveyTables) -> JoinInputs {
    let SurveyTables {
        foods,
        food_nutrients,
        nutrients,
        categories,
        portions,
        measure_units,
        attributes,
    } = tables;

    let ontology_columns = attributes.is_some();
    let extras = attributes.map(join_attributes).unwrap_or_default();

    JoinInputs {
        foods: join_categories(foods, &categories),
        nutrients: join_nutrients(food_nutrients, &nutrients),
        portions: join_portions(portions, &measure_units),
        extras,
        brand_columns: false,
        ontology_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portion_row(fdc_id: i64, measure_unit_id: i64, modifier: Option<&str>) -> PortionRow {
        PortionRow {
            id: fdc_id * 10 + measure_unit_id,
            fdc_id,
            amount: 1.0,
            measure_unit_id,
            modifier: modifier.map(str::to_string),
            gram_weight: 100.0,
        }
    }

    fn units() -> Vec<MeasureUnitRow> {
        vec![
            MeasureUnitRow {
                id: 1000,
                name: Some("cup".to_string()),
            },
            MeasureUnitRow {
                id: 9999,
                name: Some("undetermined".to_string()),
            },
        ]
    }

    #[test]
    fn test_measure_unit_ref() {
        assert_eq!(MeasureUnitRef::from_id(9999), MeasureUnitRef::NotApplicable);
        assert_eq!(MeasureUnitRef::from_id(1000), MeasureUnitRef::Id(1000));
    }

    #[test]
    fn test_all_not_applicable_uses_sentinel() {
        let joined = join_portions(vec![portion_row(1, 9999, Some("medium"))], &units());
        assert_eq!(joined[&1][0].unit, NO_VALUE);
        assert_eq!(joined[&1][0].modifier, "medium");
    }

    #[test]
    fn test_mixed_units_are_looked_up() {
        let joined = join_portions(
            vec![portion_row(1, 1000, None), portion_row(2, 9999, None), portion_row(3, 42, None)],
            &units(),
        );
        assert_eq!(joined[&1][0].unit, "cup");
        assert_eq!(joined[&1][0].modifier, NO_VALUE);
        assert_eq!(joined[&2][0].unit, "undetermined");
        assert_eq!(joined[&3][0].unit, NO_VALUE);
    }

    #[test]
    fn test_category_left_join() {
        let foods = vec![
            FoodRow {
                fdc_id: 1,
                description: Some("Apples, raw".to_string()),
                food_category_id: Some(9),
            },
            FoodRow {
                fdc_id: 2,
                description: None,
                food_category_id: Some(77),
            },
        ];
        let categories = vec![CategoryRow {
            id: 9,
            description: Some("Fruits and Fruit Juices".to_string()),
        }];
        let joined = join_categories(foods, &categories);
        assert_eq!(joined[0].category, "Fruits and Fruit Juices");
        assert_eq!(joined[1].category, NO_VALUE);
        assert_eq!(joined[1].description, NO_VALUE);
    }

    #[test]
    fn test_attributes_first_value_wins() {
        let tables = AttributeTables {
            types: vec![
                FoodAttributeTypeRow {
                    id: 1000,
                    name: Some("Common Name".to_string()),
                },
                FoodAttributeTypeRow {
                    id: 999,
                    name: Some("Attribute".to_string()),
                },
            ],
            attributes: vec![
                FoodAttributeRow {
                    fdc_id: 5,
                    food_attribute_type_id: 1000,
                    value: Some("apple".to_string()),
                },
                FoodAttributeRow {
                    fdc_id: 5,
                    food_attribute_type_id: 1000,
                    value: Some("pomme".to_string()),
                },
                FoodAttributeRow {
                    fdc_id: 5,
                    food_attribute_type_id: 999,
                    value: Some("fruit".to_string()),
                },
            ],
        };
        let extras = join_attributes(tables);
        assert_eq!(extras[&5].ontology_common_name.as_deref(), Some("apple"));
        assert_eq!(extras[&5].ontology_category.as_deref(), Some("fruit"));
    }

    #[test]
    fn test_prepare_without_attributes() {
        let inputs = prepare(SurveyTables {
            foods: vec![FoodRow {
                fdc_id: 1,
                description: Some("Apples".to_string()),
                food_category_id: None,
            }],
            portions: vec![portion_row(1, 9999, Some("medium"))],
            ..Default::default()
        });
        assert!(!inputs.ontology_columns);
        assert!(!inputs.brand_columns);
        assert_eq!(inputs.foods.len(), 1);
        assert!(inputs.nutrients.is_empty());
        assert_eq!(inputs.portions[&1].len(), 1);
    }
}
