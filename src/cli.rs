use clap::Parser;
use std::path::PathBuf;

use crate::config::{PipelineConfig, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FILE, DEFAULT_RAW_DIR};

#[derive(Parser, Debug)]
#[command(author, version, about = "Unify USDA FoodData Central exports into one per-gram nutrient table", long_about = None)]
pub struct Cli {
    /// Directory holding the unzipped FoodData Central CSV folders
    #[arg(long, env = "FDC_RAW_DIR", default_value = DEFAULT_RAW_DIR)]
    pub raw_dir: PathBuf,

    /// Directory the processed CSV files are written to
    #[arg(long, env = "FDC_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// File name of the unified table
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: String,

    /// Also write one processed CSV per dataset family
    #[arg(long)]
    pub keep_intermediate: bool,

    /// Show a progress bar while reading each CSV file
    #[arg(long)]
    pub progress: bool,
}

impl From<Cli> for PipelineConfig {
    fn from(cli: Cli) -> Self {
        PipelineConfig {
            raw_dir: cli.raw_dir,
            output_dir: cli.output_dir,
            output_file: cli.output_file,
            keep_intermediate: cli.keep_intermediate,
            show_progress: cli.progress,
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_config() {
        let cli = Cli::parse_from([
            "fdc_unify",
            "--raw-dir",
            "/data/raw",
            "--output-dir",
            "/data/out",
            "--output-file",
            "foods.csv",
            "--keep-intermediate",
        ]);
        let config = PipelineConfig::from(cli);
        assert_eq!(config.raw_dir, PathBuf::from("/data/raw"));
        assert_eq!(config.output_path(), PathBuf::from("/data/out/foods.csv"));
        assert!(config.keep_intermediate);
        assert!(!config.show_progress);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
