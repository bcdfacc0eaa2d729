//! End-to-end run: discover family directories, load each family, build its
//! wide table and write the unified output.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{discover_families, Family, FamilyDirs, PipelineConfig};
use crate::pivot::branded::{self, BrandedTables};
use crate::pivot::survey::{self, AttributeTables, SurveyTables};
use crate::pivot::{build_wide_table, JoinInputs};
use crate::portion::{PortionParser, RegexPortionParser};
use crate::schema::unify;
use crate::source::classify_source;
use crate::tables::TableReader;
use crate::wide::WideTable;

const FOOD_FILE: &str = "food.csv";
const FOOD_NUTRIENT_FILE: &str = "food_nutrient.csv";
const NUTRIENT_FILE: &str = "nutrient.csv";
const CATEGORY_FILE: &str = "food_category.csv";
const PORTION_FILE: &str = "food_portion.csv";
const MEASURE_UNIT_FILE: &str = "measure_unit.csv";
const BRANDED_FOOD_FILE: &str = "branded_food.csv";
const ATTRIBUTE_FILE: &str = "food_attribute.csv";
const ATTRIBUTE_TYPE_FILE: &str = "food_attribute_type.csv";

fn load_attributes(reader: &TableReader, dir: &Path) -> Result<Option<AttributeTables>> {
    let attributes_path = dir.join(ATTRIBUTE_FILE);
    let types_path = dir.join(ATTRIBUTE_TYPE_FILE);
    if !attributes_path.is_file() || !types_path.is_file() {
        return Ok(None);
    }
    Ok(Some(AttributeTables {
        attributes: reader.load_food_attributes(&attributes_path)?,
        types: reader.load_food_attribute_types(&types_path)?,
    }))
}

/// Loads the raw tables of one family and resolves their lookups.
pub fn load_family(reader: &TableReader, dirs: &FamilyDirs) -> Result<JoinInputs> {
    let dir = &dirs.dir;
    let inputs = match dirs.family {
        Family::Foundation | Family::SrLegacy => survey::prepare(SurveyTables {
            foods: reader.load_foods(&dir.join(FOOD_FILE))?,
            food_nutrients: reader.load_food_nutrients(&dir.join(FOOD_NUTRIENT_FILE))?,
            nutrients: reader.load_nutrients(&dir.join(NUTRIENT_FILE))?,
            categories: reader.load_categories(&dirs.category_dir.join(CATEGORY_FILE))?,
            portions: reader.load_portions(&dir.join(PORTION_FILE))?,
            measure_units: reader.load_measure_units(&dir.join(MEASURE_UNIT_FILE))?,
            attributes: load_attributes(reader, dir)?,
        }),
        Family::Branded => branded::prepare(BrandedTables {
            foods: reader.load_foods(&dir.join(FOOD_FILE))?,
            food_nutrients: reader.load_food_nutrients(&dir.join(FOOD_NUTRIENT_FILE))?,
            nutrients: reader.load_nutrients(&dir.join(NUTRIENT_FILE))?,
            branded_foods: reader.load_branded_foods(&dir.join(BRANDED_FOOD_FILE))?,
        }),
    };
    Ok(inputs)
}

/// Builds the wide table of one family, provenance taken from its `food.csv`.
pub fn process_family(reader: &TableReader, dirs: &FamilyDirs, parser: &dyn PortionParser) -> Result<WideTable> {
    info!("Processing {} data from {}", dirs.family, dirs.dir.display());
    let food_path = dirs.dir.join(FOOD_FILE);
    let source = classify_source(&food_path.to_string_lossy());
    let inputs = load_family(reader, dirs)?;
    let settings = dirs.family.settings();
    Ok(build_wide_table(&inputs, settings.engine, &source, parser))
}

/// Runs every family found under the raw directory and returns the path of
/// the unified CSV.
pub fn run(config: &PipelineConfig) -> Result<PathBuf> {
    let families = discover_families(&config.raw_dir)
        .with_context(|| format!("Failed to locate USDA datasets in {:?}", config.raw_dir))?;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;

    let reader = TableReader::new(config.show_progress);
    let parser = RegexPortionParser::default();
    let mut tables = Vec::with_capacity(families.len());
    for dirs in &families {
        let table = process_family(&reader, dirs, &parser)
            .with_context(|| format!("Failed to process {} data in {:?}", dirs.family, dirs.dir))?;
        if config.keep_intermediate {
            let path = config.intermediate_path(dirs.family);
            table.write_csv(&path)?;
            info!("Wrote {} rows to {}", table.len(), path.display());
        }
        tables.push(table);
    }

    let unified = unify(tables);
    let output_path = config.output_path();
    unified.write_csv(&output_path)?;
    info!("Wrote {} rows to {}", unified.len(), output_path.display());
    Ok(output_path)
}
