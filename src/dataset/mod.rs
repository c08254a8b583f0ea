//! Synthetic AS3AP data: the base relation, its tenpct sample and the record
//! streams that feed the five benchmark tables.

mod date;
mod encoding;
mod generator;
mod streams;

pub use date::{format_date, synth_date, DATE_CYCLE_DAYS};
pub use encoding::{pad_random, unique_prefix, ALPHABET, CODE_WIDTH, NAME_WIDTH};
pub use generator::{
    next_r10pct_key, signed_spread, sparse_key_spread, BaseRecord, Dataset, DatasetGenerator,
    HundredSample, TenpctRecord, HUNDRED_SAMPLE, MARKER_SLOTS, MIN_SIGNED, RANDOMIZER_RANGE,
};
pub use streams::{read_stream, write_streams, As3apRow, RecordReader};

pub const MARKER_ADDRESS: &str = "SILICON VALLEY";
pub const MARKER_NAME: &str = "THE+ASAP+BENCHMARKS+";
pub const MARKER_CODE: &str = "BENCHMARKS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Uniques,
    Updates,
    Hundred,
    Tenpct,
    Tiny,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Uniques,
        Relation::Hundred,
        Relation::Tenpct,
        Relation::Updates,
        Relation::Tiny,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Relation::Uniques => "uniques",
            Relation::Updates => "updates",
            Relation::Hundred => "hundred",
            Relation::Tenpct => "tenpct",
            Relation::Tiny => "tiny",
        }
    }

    pub fn file_name(&self) -> String {
        format!("asap.{}", self.table_name())
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.table_name())
    }
}
