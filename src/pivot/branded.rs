//! Branded family. The `branded_food` row supplies the category, brand fields,
//! ingredient statement and the single serving-size portion of each food.

use log::{info, warn};
use std::collections::HashMap;

use super::{join_nutrients, FoodExtras, FoodInfo, JoinInputs, PortionInfo};
use crate::portion::format_ingredients;
use crate::tables::{BrandedFoodRow, FoodNutrientRow, FoodRow, NutrientRow};
use crate::NO_VALUE;

#[derive(Debug, Clone, Default)]
pub struct BrandedTables {
    pub foods: Vec<FoodRow>,
    pub food_nutrients: Vec<FoodNutrientRow>,
    pub nutrients: Vec<NutrientRow>,
    pub branded_foods: Vec<BrandedFoodRow>,
}

fn is_gram_unit(unit: &str) -> bool {
    unit.eq_ignore_ascii_case("g") || unit.eq_ignore_ascii_case("grm")
}

fn serving_portion(row: &BrandedFoodRow) -> PortionInfo {
    let unit = row.serving_size_unit.clone().unwrap_or_else(|| NO_VALUE.to_string());
    PortionInfo {
        amount: row.serving_size,
        gram_weight: if is_gram_unit(&unit) { row.serving_size } else { 0.0 },
        unit,
        modifier: row
            .household_serving_fulltext
            .clone()
            .unwrap_or_else(|| NO_VALUE.to_string()),
    }
}

pub fn prepare(tables: BrandedTables) -> JoinInputs {
    let BrandedTables {
        foods,
        food_nutrients,
        nutrients,
        branded_foods,
    } = tables;

    // First branded_food row per fdc_id is kept.
    let mut stash: HashMap<i64, BrandedFoodRow> = HashMap::with_capacity(branded_foods.len());
    let mut repeated = 0usize;
    for row in branded_foods {
        if stash.contains_key(&row.fdc_id) {
            repeated += 1;
            continue;
        }
        stash.insert(row.fdc_id, row);
    }
    if repeated > 0 {
        warn!("Ignored {} repeated branded_food rows", repeated);
    }

    let mut portions = HashMap::with_capacity(stash.len());
    let mut extras = HashMap::with_capacity(stash.len());
    let foods: Vec<FoodInfo> = foods
        .into_iter()
        .map(|f| {
            let branded = stash.get(&f.fdc_id);
            if let Some(row) = branded {
                portions.insert(f.fdc_id, vec![serving_portion(row)]);
                extras.insert(
                    f.fdc_id,
                    FoodExtras {
                        brand_owner: row.brand_owner.clone(),
                        brand_name: row.brand_name.clone(),
                        ingredients: Some(format_ingredients(row.ingredients.as_deref())),
                        ..Default::default()
                    },
                );
            }
            FoodInfo {
                fdc_id: f.fdc_id,
                description: f.description.unwrap_or_else(|| NO_VALUE.to_string()),
                category: branded
                    .and_then(|row| row.branded_food_category.clone())
                    .unwrap_or_else(|| NO_VALUE.to_string()),
            }
        })
        .collect();
    info!("Matched {} of {} branded foods to a branded_food row", portions.len(), foods.len());

    JoinInputs {
        foods,
        nutrients: join_nutrients(food_nutrients, &nutrients),
        portions,
        extras,
        brand_columns: true,
        ontology_columns: false,
    }
}
