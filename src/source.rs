use std::fmt;

/// Label used when a path is too shallow to carry a dataset directory name.
pub const DEFAULT_SOURCE_LABEL: &str = "FoodData_Central";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Foundation,
    SrLegacy,
    Branded,
    Unspecified,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Foundation => "foundation",
            DataType::SrLegacy => "sr_legacy",
            DataType::Branded => "branded",
            DataType::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub source_label: String,
    pub data_type: DataType,
}

/// Works out which USDA release a file came from by looking at its path.
///
/// `data_type` comes from a case-insensitive substring match (foundation, then
/// sr_legacy, then branded). `source_label` is the second-to-last path segment,
/// i.e. the dataset directory when given a file inside it.
pub fn classify_source(path: &str) -> SourceInfo {
    let lowered = path.to_lowercase();
    let data_type = if lowered.contains("foundation") {
        DataType::Foundation
    } else if lowered.contains("sr_legacy") {
        DataType::SrLegacy
    } else if lowered.contains("branded") {
        DataType::Branded
    } else {
        DataType::Unspecified
    };

    let segments: Vec<&str> = path
        .split(|c| c == '/' || c == '\\')
        .filter(|s| !s.is_empty())
        .collect();
    let source_label = if segments.len() >= 2 {
        segments[segments.len() - 2].to_string()
    } else {
        DEFAULT_SOURCE_LABEL.to_string()
    };

    SourceInfo { source_label, data_type }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_foundation_file() {
        let info = classify_source("fdc_data/raw/FoodData_Central_foundation_food_csv_2024-04-18/food.csv");
        assert_eq!(info.data_type, DataType::Foundation);
        assert_eq!(info.source_label, "FoodData_Central_foundation_food_csv_2024-04-18");
    }

    #[test]
    fn test_classify_sr_legacy_and_branded() {
        let sr = classify_source("raw/FoodData_Central_sr_legacy_food_csv_2018-04/food.csv");
        assert_eq!(sr.data_type, DataType::SrLegacy);

        let branded = classify_source(r"C:\data\FoodData_Central_Branded_food_csv_2024-04-18\food.csv");
        assert_eq!(branded.data_type, DataType::Branded);
        assert_eq!(branded.source_label, "FoodData_Central_Branded_food_csv_2024-04-18");
    }

    #[test]
    fn test_classify_unspecified_and_shallow() {
        let info = classify_source("food.csv");
        assert_eq!(info.data_type, DataType::Unspecified);
        assert_eq!(info.source_label, DEFAULT_SOURCE_LABEL);

        let empty = classify_source("");
        assert_eq!(empty.source_label, DEFAULT_SOURCE_LABEL);
    }

    #[test]
    fn test_trailing_separator_is_ignored() {
        let info = classify_source("/tmp/branded_dir/food.csv/");
        assert_eq!(info.source_label, "branded_dir");
    }

    #[test]
    fn test_data_type_strings() {
        assert_eq!(DataType::SrLegacy.to_string(), "sr_legacy");
        assert_eq!(DataType::Unspecified.as_str(), "unspecified");
    }
}
