use anyhow::{Context, Result};
use fdc_unify::cli::parse_args;
use fdc_unify::config::PipelineConfig;
use fdc_unify::pipeline;
use log::info;

fn main() -> Result<()> {
    dotenv::dotenv().ok(); // FDC_RAW_DIR / FDC_OUTPUT_DIR may come from .env
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from(parse_args());
    info!("Reading USDA data from {}", config.raw_dir.display());

    let output = pipeline::run(&config)
        .with_context(|| format!("Failed to build the unified table from {:?}", config.raw_dir))?;
    println!("Unified table written to {}", output.display());
    Ok(())
}
