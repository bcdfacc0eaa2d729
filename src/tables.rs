//! Typed loaders for the USDA FoodData Central CSV files.
//!
//! Only the columns the pipeline needs are read, located by header name. A
//! missing required header fails the load with [`LoadError::MissingColumn`].
//! Empty or malformed numeric cells read as `0`, empty text cells as `None`.
//! Cells that are not valid UTF-8 are decoded lossily with a warning.

use csv::{ByteRecord, ReaderBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::LoadError;

/// Measure unit id USDA uses for "not applicable".
pub const NOT_APPLICABLE_UNIT_ID: i64 = 9999;

#[derive(Debug, Clone, PartialEq)]
pub struct FoodRow {
    pub fdc_id: i64,
    pub description: Option<String>,
    pub food_category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodNutrientRow {
    pub fdc_id: i64,
    pub nutrient_id: i64,
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NutrientRow {
    pub id: i64,
    pub name: Option<String>,
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub id: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortionRow {
    pub id: i64,
    pub fdc_id: i64,
    pub amount: f64,
    pub measure_unit_id: i64,
    pub modifier: Option<String>,
    pub gram_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureUnitRow {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrandedFoodRow {
    pub fdc_id: i64,
    pub brand_owner: Option<String>,
    pub brand_name: Option<String>,
    pub ingredients: Option<String>,
    pub serving_size: f64,
    pub serving_size_unit: Option<String>,
    pub household_serving_fulltext: Option<String>,
    pub branded_food_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodAttributeRow {
    pub fdc_id: i64,
    pub food_attribute_type_id: i64,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoodAttributeTypeRow {
    pub id: i64,
    pub name: Option<String>,
}

fn parse_i64(s: &str) -> i64 {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        .unwrap_or(0)
}

fn parse_optional_i64(s: &str) -> Option<i64> {
    if s.trim().is_empty() {
        None
    } else {
        Some(parse_i64(s))
    }
}

fn parse_f64(s: &str) -> f64 {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn parse_f32(s: &str) -> f32 {
    s.trim().parse::<f32>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn text(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Record view over the selected columns of one CSV row.
struct Row<'a> {
    record: &'a ByteRecord,
    indices: &'a [Option<usize>],
    path: &'a Path,
}

impl<'a> Row<'a> {
    fn get(&self, column: usize) -> Cow<'a, str> {
        let bytes = self.indices[column]
            .and_then(|idx| self.record.get(idx))
            .unwrap_or(b"");
        match std::str::from_utf8(bytes) {
            Ok(s) => Cow::Borrowed(s),
            Err(_) => {
                warn!(
                    "Invalid UTF-8 in {} line {}; undecodable bytes replaced",
                    self.path.display(),
                    self.record.position().map(|p| p.line()).unwrap_or(0)
                );
                String::from_utf8_lossy(bytes)
            }
        }
    }
}

/// Reads USDA CSV files, optionally drawing a progress bar per file.
#[derive(Debug, Clone, Default)]
pub struct TableReader {
    pub show_progress: bool,
}

impl TableReader {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Streams `path`, handing `build` each row restricted to `required` columns
    /// followed by `optional` columns (optional ones read as `""` when absent).
    fn read<T>(
        &self,
        path: &Path,
        required: &[&str],
        optional: &[&str],
        mut build: impl FnMut(&Row) -> T,
    ) -> Result<Vec<T>, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let pb = self.progress_bar(len);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(file_name.clone());

        let reader: Box<dyn Read> = Box::new(pb.wrap_read(file));
        let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
        let csv_err = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let headers: Vec<String> = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut indices = Vec::with_capacity(required.len() + optional.len());
        for column in required {
            let idx = headers.iter().position(|h| h == column).ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })?;
            indices.push(Some(idx));
        }
        for column in optional {
            indices.push(headers.iter().position(|h| h == column));
        }

        let mut rows = Vec::new();
        let mut record = ByteRecord::new();
        while rdr.read_byte_record(&mut record).map_err(csv_err)? {
            rows.push(build(&Row {
                record: &record,
                indices: &indices,
                path,
            }));
        }
        pb.finish_with_message(format!("{} loaded", file_name));
        info!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn load_foods(&self, path: &Path) -> Result<Vec<FoodRow>, LoadError> {
        self.read(path, &["fdc_id", "description"], &["food_category_id"], |r| FoodRow {
            fdc_id: parse_i64(&r.get(0)),
            description: text(&r.get(1)),
            food_category_id: parse_optional_i64(&r.get(2)),
        })
    }

    pub fn load_food_nutrients(&self, path: &Path) -> Result<Vec<FoodNutrientRow>, LoadError> {
        self.read(path, &["fdc_id", "nutrient_id", "amount"], &[], |r| FoodNutrientRow {
            fdc_id: parse_i64(&r.get(0)),
            nutrient_id: parse_i64(&r.get(1)),
            amount: parse_f32(&r.get(2)),
        })
    }

    pub fn load_nutrients(&self, path: &Path) -> Result<Vec<NutrientRow>, LoadError> {
        self.read(path, &["id", "name", "unit_name"], &[], |r| NutrientRow {
            id: parse_i64(&r.get(0)),
            name: text(&r.get(1)),
            unit_name: text(&r.get(2)),
        })
    }

    pub fn load_categories(&self, path: &Path) -> Result<Vec<CategoryRow>, LoadError> {
        self.read(path, &["id", "description"], &[], |r| CategoryRow {
            id: parse_i64(&r.get(0)),
            description: text(&r.get(1)),
        })
    }

    pub fn load_portions(&self, path: &Path) -> Result<Vec<PortionRow>, LoadError> {
        self.read(
            path,
            &["id", "fdc_id", "amount", "measure_unit_id", "modifier", "gram_weight"],
            &[],
            |r| PortionRow {
                id: parse_i64(&r.get(0)),
                fdc_id: parse_i64(&r.get(1)),
                amount: parse_f64(&r.get(2)),
                measure_unit_id: parse_i64(&r.get(3)),
                modifier: text(&r.get(4)),
                gram_weight: parse_f64(&r.get(5)),
            },
        )
    }

    pub fn load_measure_units(&self, path: &Path) -> Result<Vec<MeasureUnitRow>, LoadError> {
        self.read(path, &["id", "name"], &[], |r| MeasureUnitRow {
            id: parse_i64(&r.get(0)),
            name: text(&r.get(1)),
        })
    }

    pub fn load_branded_foods(&self, path: &Path) -> Result<Vec<BrandedFoodRow>, LoadError> {
        self.read(
            path,
            &[
                "fdc_id",
                "brand_owner",
                "brand_name",
                "ingredients",
                "serving_size",
                "serving_size_unit",
                "household_serving_fulltext",
                "branded_food_category",
            ],
            &[],
            |r| BrandedFoodRow {
                fdc_id: parse_i64(&r.get(0)),
                brand_owner: text(&r.get(1)),
                brand_name: text(&r.get(2)),
                ingredients: text(&r.get(3)),
                serving_size: parse_f64(&r.get(4)),
                serving_size_unit: text(&r.get(5)),
                household_serving_fulltext: text(&r.get(6)),
                branded_food_category: text(&r.get(7)),
            },
        )
    }

    pub fn load_food_attributes(&self, path: &Path) -> Result<Vec<FoodAttributeRow>, LoadError> {
        self.read(path, &["fdc_id", "food_attribute_type_id", "value"], &[], |r| FoodAttributeRow {
            fdc_id: parse_i64(&r.get(0)),
            food_attribute_type_id: parse_i64(&r.get(1)),
            value: text(&r.get(2)),
        })
    }

    pub fn load_food_attribute_types(&self, path: &Path) -> Result<Vec<FoodAttributeTypeRow>, LoadError> {
        self.read(path, &["id", "name"], &[], |r| FoodAttributeTypeRow {
            id: parse_i64(&r.get(0)),
            name: text(&r.get(1)),
        })
    }
}
