/// Пакетное предсказание ценового диапазона по CSV

use std::path::PathBuf;

use clap::Parser;
use device_price_ml::{logging, pipeline::batch};

#[derive(Parser)]
#[command(name = "predict")]
#[command(about = "Predict device price range.", version)]
struct Cli {
    /// Path to the input CSV file with device specifications
    input_file: PathBuf,

    /// Path to the trained model file
    model_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let output = batch::run(&cli.input_file, &cli.model_file)?;
    println!("Predictions saved to {}", output.display());
    Ok(())
}
