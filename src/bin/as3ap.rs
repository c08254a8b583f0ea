use clap::Parser;
use as3ap::{
    init_logger,
    prelude::{As3ap, As3apConfig, Backend, BackendKind, BenchResult, LogSink, NullBackend, SqliteBackend},
};

fn run<B: Backend>(backend: &B, config: As3apConfig) -> BenchResult<()> {
    let sink = LogSink;
    let summary = As3ap::new(backend, config, &sink).run()?;
    println!("Summary: \n{}", summary);
    let failed = summary.failed_tests();
    if !failed.is_empty() {
        println!("Failed tests: {:?}", failed);
    }
    Ok(())
}

pub fn main() {
    init_logger();

    let config = As3apConfig::parse();
    println!("config: {:?}", config);
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let res = match config.backend {
        BackendKind::Sqlite => {
            let backend = SqliteBackend::new(&config.db_path);
            run(&backend, config)
        }
        BackendKind::Null => {
            let backend = NullBackend::with_updates_rows(config.tuples);
            run(&backend, config)
        }
    };
    if let Err(e) = res {
        eprintln!("as3ap failed: {}", e);
        std::process::exit(1);
    }
}
