use std::path::PathBuf;
use std::time::Instant;

use as3ap::{
    dataset::{write_streams, DatasetGenerator},
    init_logger,
};
use clap::Parser;

/// Writes the five AS3AP record files without touching a database.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct GenConfig {
    /// Number of tuples.
    #[arg(short = 'n', long, default_value_t = 10000)]
    tuples: u64,

    /// Output directory.
    #[arg(short = 'o', long, default_value = "as3ap-data")]
    out: PathBuf,

    #[arg(long)]
    seed: Option<u64>,
}

pub fn main() {
    init_logger();
    let config = GenConfig::parse();
    println!("config: {:?}", config);

    let start = Instant::now();
    let data = DatasetGenerator::new(config.tuples)
        .seed(config.seed)
        .generate();
    println!("Generated {} tuples in {:?}", data.len(), start.elapsed());

    match write_streams(&data, &config.out) {
        Ok(paths) => {
            for p in paths {
                println!("{}", p.display());
            }
        }
        Err(e) => {
            eprintln!("writing record files failed: {}", e);
            std::process::exit(1);
        }
    }
}
