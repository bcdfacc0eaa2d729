use log::{info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::pivot::{DuplicatePolicy, EnergyBasis, EngineSettings};

pub const RAW_DIR_ENV: &str = "FDC_RAW_DIR";
pub const OUTPUT_DIR_ENV: &str = "FDC_OUTPUT_DIR";
pub const DEFAULT_RAW_DIR: &str = "fdc_data/FoodData_Central_raw";
pub const DEFAULT_OUTPUT_DIR: &str = "fdc_data/FoodData_Central_processed";
pub const DEFAULT_OUTPUT_FILE: &str = "processed_usda_data.csv";

/// Prefix of the full-download directory, which carries the complete
/// `food_category.csv`.
const FULL_DOWNLOAD_PREFIX: &str = "fooddata_central_csv";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_file: String,
    pub keep_intermediate: bool,
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            keep_intermediate: false,
            show_progress: false,
        }
    }
}

impl PipelineConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }

    pub fn intermediate_path(&self, family: Family) -> PathBuf {
        self.output_dir.join(format!("processed_{}.csv", family.name()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Foundation,
    SrLegacy,
    Branded,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Foundation, Family::SrLegacy, Family::Branded];

    pub fn name(&self) -> &'static str {
        match self {
            Family::Foundation => "foundation",
            Family::SrLegacy => "sr_legacy",
            Family::Branded => "branded",
        }
    }

    /// Substring identifying the family's directory (case-insensitive).
    pub fn dir_marker(&self) -> &'static str {
        self.name()
    }

    pub fn settings(&self) -> FamilySettings {
        let engine = match self {
            // Repeated analytical samples of the same food are averaged.
            Family::Foundation | Family::SrLegacy => EngineSettings {
                policy: DuplicatePolicy::Mean,
                energy_basis: EnergyBasis::GramWeight,
            },
            // Label data: the first submission wins and serving size is in grams.
            Family::Branded => EngineSettings {
                policy: DuplicatePolicy::First,
                energy_basis: EnergyBasis::PortionAmount,
            },
        };
        FamilySettings { family: *self, engine }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySettings {
    pub family: Family,
    pub engine: EngineSettings,
}

/// Where one family's CSV files live.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyDirs {
    pub family: Family,
    pub dir: PathBuf,
    /// Directory holding `food_category.csv`.
    pub category_dir: PathBuf,
}

/// Finds the family directories under `raw_dir`. Absent families are skipped
/// with a warning; finding none at all is an error.
pub fn discover_families(raw_dir: &Path) -> Result<Vec<FamilyDirs>, LoadError> {
    let entries = fs::read_dir(raw_dir).map_err(|source| LoadError::Io {
        path: raw_dir.to_path_buf(),
        source,
    })?;
    let mut subdirs: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            let name = p.file_name()?.to_string_lossy().to_lowercase();
            Some((name, p))
        })
        .collect();
    subdirs.sort();

    let full_download = subdirs
        .iter()
        .find(|(name, _)| name.starts_with(FULL_DOWNLOAD_PREFIX))
        .map(|(_, p)| p.clone());

    let mut found = Vec::new();
    for family in Family::ALL {
        match subdirs.iter().find(|(name, _)| name.contains(family.dir_marker())) {
            Some((_, dir)) => {
                let category_dir = match (family, &full_download) {
                    (Family::Foundation, Some(full)) => full.clone(),
                    _ => dir.clone(),
                };
                info!("Found {} data in {}", family, dir.display());
                found.push(FamilyDirs {
                    family,
                    dir: dir.clone(),
                    category_dir,
                });
            }
            None => warn!("No {} directory under {}; skipping", family, raw_dir.display()),
        }
    }

    if found.is_empty() {
        return Err(LoadError::MissingDataset {
            family: "FoodData Central".to_string(),
            dir: raw_dir.to_path_buf(),
        });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_family_settings() {
        assert_eq!(Family::Foundation.settings().engine.policy, DuplicatePolicy::Mean);
        assert_eq!(Family::SrLegacy.settings().engine.policy, DuplicatePolicy::Mean);
        assert_eq!(Family::Branded.settings().engine.policy, DuplicatePolicy::First);
        assert_eq!(Family::Branded.settings().engine.energy_basis, EnergyBasis::PortionAmount);
    }

    #[test]
    fn test_paths() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.output_path(),
            PathBuf::from("fdc_data/FoodData_Central_processed/processed_usda_data.csv")
        );
        assert_eq!(
            config.intermediate_path(Family::SrLegacy),
            PathBuf::from("fdc_data/FoodData_Central_processed/processed_sr_legacy.csv")
        );
    }

    #[test]
    fn test_discover_families() -> anyhow::Result<()> {
        let raw = tempdir()?;
        fs::create_dir(raw.path().join("FoodData_Central_foundation_food_csv_2024-04-18"))?;
        fs::create_dir(raw.path().join("FoodData_Central_branded_food_csv_2024-04-18"))?;
        fs::create_dir(raw.path().join("FoodData_Central_csv_2024-04-18"))?;
        fs::write(raw.path().join("sr_legacy.zip"), b"not a directory")?;

        let found = discover_families(raw.path())?;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].family, Family::Foundation);
        assert!(found[0].category_dir.ends_with("FoodData_Central_csv_2024-04-18"));
        assert_eq!(found[1].family, Family::Branded);
        assert_eq!(found[1].category_dir, found[1].dir);
        Ok(())
    }

    #[test]
    fn test_category_dir_falls_back_to_foundation() -> anyhow::Result<()> {
        let raw = tempdir()?;
        fs::create_dir(raw.path().join("foundation"))?;
        let found = discover_families(raw.path())?;
        assert_eq!(found[0].category_dir, found[0].dir);
        Ok(())
    }

    #[test]
    fn test_no_families_is_an_error() -> anyhow::Result<()> {
        let raw = tempdir()?;
        let err = discover_families(raw.path()).unwrap_err();
        assert!(matches!(err, LoadError::MissingDataset { .. }));

        let err = discover_families(&raw.path().join("missing")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        Ok(())
    }
}
