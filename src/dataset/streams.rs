use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Dataset, Relation, MARKER_NAME};
use crate::backend::Value;
use crate::error::BenchResult;
use crate::log_info;

/// A row of any of the four wide tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct As3apRow {
    pub col_key: i64,
    pub col_int: i64,
    pub col_signed: i64,
    pub col_float: f32,
    pub col_double: f64,
    pub col_decim: f64,
    pub col_date: String,
    pub col_code: String,
    pub col_name: String,
    pub col_address: String,
}

impl As3apRow {
    pub fn into_values(self) -> Vec<Value> {
        vec![
            Value::Integer(self.col_key),
            Value::Integer(self.col_int),
            Value::Integer(self.col_signed),
            Value::Real(self.col_float as f64),
            Value::Real(self.col_double),
            Value::Real(self.col_decim),
            Value::Text(self.col_date),
            Value::Text(self.col_code),
            Value::Text(self.col_name),
            Value::Text(self.col_address),
        ]
    }
}

impl Dataset {
    /// Rows of one of the wide tables. `Relation::Tiny` has no wide rows.
    pub fn rows(&self, relation: Relation) -> Box<dyn Iterator<Item = As3apRow> + '_> {
        match relation {
            Relation::Uniques => Box::new(self.records.iter().map(|r| As3apRow {
                col_key: r.sparse_key,
                col_int: r.sparse_key,
                col_signed: r.sparse_signed,
                col_float: r.zipf100_value,
                col_double: r.double_normal,
                col_decim: r.double_normal,
                col_date: r.date.clone(),
                col_code: r.code.clone(),
                col_name: r.name.clone(),
                col_address: r.address.clone(),
            })),
            Relation::Updates => Box::new(self.records.iter().map(|r| As3apRow {
                col_key: r.dense_key,
                col_int: r.dense_key,
                col_signed: r.sparse_signed,
                col_float: r.zipf10_value,
                col_double: r.double_normal,
                col_decim: r.double_normal,
                col_date: r.date.clone(),
                col_code: r.code.clone(),
                col_name: r.name.clone(),
                col_address: r.address.clone(),
            })),
            Relation::Hundred => {
                let h = &self.hundred;
                Box::new(self.records.iter().enumerate().map(move |(i, r)| {
                    // Row i reads the sample slot after its own.
                    let k = (i + 1) % h.len();
                    As3apRow {
                        col_key: r.dense_key,
                        col_int: r.sparse_key,
                        col_signed: r.uniform100_dense,
                        col_float: h.float[k],
                        col_double: h.double[k],
                        col_decim: h.double[k],
                        col_date: r.date.clone(),
                        col_code: r.code.clone(),
                        col_name: h.name[k].clone(),
                        col_address: h.address[k].clone(),
                    }
                }))
            }
            Relation::Tenpct => Box::new(self.records.iter().filter_map(move |r| {
                let t = self.tenpct_for(r.r10pct_key)?;
                // Exactly one row in ten carries the marker name. The marker
                // record gets its own name back unless it is one of them.
                let col_name = if r.rec % 10 == 0 {
                    MARKER_NAME.to_string()
                } else if r.name == MARKER_NAME {
                    self.displaced_name.clone()
                } else {
                    r.name.clone()
                };
                Some(As3apRow {
                    col_key: r.sparse_key,
                    col_int: r.sparse_key,
                    col_signed: t.col_signed,
                    col_float: t.col_float,
                    col_double: t.col_double,
                    col_decim: t.col_double,
                    col_date: r.date.clone(),
                    col_code: r.code.clone(),
                    col_name,
                    col_address: t.col_address.clone(),
                })
            })),
            Relation::Tiny => Box::new(std::iter::empty()),
        }
    }

    /// Record stream for `relation` in the shape the bulk loader expects.
    pub fn stream(&self, relation: Relation) -> Box<dyn Iterator<Item = Vec<Value>> + '_> {
        match relation {
            Relation::Tiny => Box::new(std::iter::once(vec![Value::Integer(0)])),
            _ => Box::new(self.rows(relation).map(As3apRow::into_values)),
        }
    }
}

/// Writes the five record streams into `dir`, one delimited file per table.
pub fn write_streams(data: &Dataset, dir: &Path) -> BenchResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(Relation::ALL.len());
    for relation in Relation::ALL {
        let path = dir.join(relation.file_name());
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(File::create(&path)?));
        let mut rows = 0;
        if relation == Relation::Tiny {
            writer.write_record(["0"])?;
            rows += 1;
        } else {
            for row in data.rows(relation) {
                writer.serialize(row)?;
                rows += 1;
            }
        }
        writer.flush()?;
        log_info!("Wrote {} rows to {}", rows, path.display());
        paths.push(path);
    }
    Ok(paths)
}

enum Source {
    Wide(csv::DeserializeRecordsIntoIter<File, As3apRow>),
    Tiny(csv::StringRecordsIntoIter<File>),
}

/// Reads a stream written by [`write_streams`] back as loader rows.
///
/// Iteration stops at the first malformed record; the error is kept and can
/// be taken with [`RecordReader::take_error`] once the loader is done.
pub struct RecordReader {
    source: Source,
    error: Option<csv::Error>,
}

pub fn read_stream(dir: &Path, relation: Relation) -> BenchResult<RecordReader> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(dir.join(relation.file_name()))?;
    let source = match relation {
        Relation::Tiny => Source::Tiny(reader.into_records()),
        _ => Source::Wide(reader.into_deserialize()),
    };
    Ok(RecordReader {
        source,
        error: None,
    })
}

impl RecordReader {
    pub fn take_error(&mut self) -> Option<csv::Error> {
        self.error.take()
    }
}

impl Iterator for RecordReader {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        let next = match &mut self.source {
            Source::Wide(records) => records.next()?.map(As3apRow::into_values),
            Source::Tiny(records) => records.next()?.map(|record| {
                let key = record.get(0).and_then(|s| s.trim().parse::<i64>().ok());
                vec![key.map(Value::Integer).unwrap_or(Value::Null)]
            }),
        };
        match next {
            Ok(row) => Some(row),
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetGenerator, MARKER_ADDRESS, MARKER_CODE};
    use rstest::rstest;

    #[test]
    fn table_contents_for_thousand_rows() {
        let data = DatasetGenerator::new(1000).with_seed(21).generate();

        let updates: Vec<As3apRow> = data.rows(Relation::Updates).collect();
        assert_eq!(updates.len(), 1000);
        assert_eq!(updates.iter().filter(|r| r.col_key <= 100).count(), 100);
        assert_eq!(updates.iter().filter(|r| r.col_key == 1000).count(), 1);
        assert_eq!(
            updates.iter().filter(|r| r.col_code == MARKER_CODE).count(),
            1
        );

        let hundred: Vec<As3apRow> = data.rows(Relation::Hundred).collect();
        let distinct: std::collections::HashSet<(String, i64)> = hundred
            .iter()
            .map(|r| (r.col_address.clone(), r.col_signed))
            .collect();
        assert_eq!(distinct.len(), 100);

        let tenpct: Vec<As3apRow> = data.rows(Relation::Tenpct).collect();
        assert_eq!(tenpct.len(), 1000);
        assert_eq!(
            tenpct.iter().filter(|r| r.col_name == MARKER_NAME).count(),
            100
        );

        let uniques: Vec<As3apRow> = data.rows(Relation::Uniques).collect();
        assert_eq!(
            uniques
                .iter()
                .filter(|r| r.col_address == MARKER_ADDRESS)
                .count(),
            1
        );
        assert_eq!(data.stream(Relation::Tiny).count(), 1);
    }

    #[rstest]
    #[case(40)]
    #[case(1000)]
    #[case(1234)]
    fn tenpct_marker_names_are_one_in_ten(#[case] n: u64) {
        for seed in 0..20 {
            let data = DatasetGenerator::new(n).with_seed(seed).generate();
            let markers = data
                .rows(Relation::Tenpct)
                .filter(|r| r.col_name == MARKER_NAME)
                .count() as u64;
            assert_eq!(
                markers,
                n / 10,
                "seed {} marker slot {}",
                seed,
                data.marker_slot
            );
        }
    }

    #[test]
    fn marker_record_keeps_its_own_name_in_tenpct() {
        for seed in 0..20 {
            let data = DatasetGenerator::new(1000).with_seed(seed).generate();
            if data.marker_slot == 9 {
                continue;
            }
            let marker = &data.records[data.marker_slot];
            let row = data
                .rows(Relation::Tenpct)
                .find(|r| r.col_key == marker.sparse_key)
                .unwrap();
            assert_eq!(row.col_name, data.displaced_name);
            assert!(row.col_name.starts_with(&crate::dataset::unique_prefix(marker.rec)));
        }
    }

    #[test]
    fn tenpct_rows_carry_the_sample_address() {
        let data = DatasetGenerator::new(1000).with_seed(4).generate();
        for (r, row) in data.records.iter().zip(data.rows(Relation::Tenpct)) {
            let t = data.tenpct_for(r.r10pct_key).unwrap();
            assert_eq!(row.col_address, t.col_address);
            assert_eq!(row.col_signed, t.col_signed);
        }
    }

    #[test]
    fn hundred_rows_start_at_the_second_sample_slot() {
        let data = DatasetGenerator::new(250).with_seed(6).generate();
        let rows: Vec<As3apRow> = data.rows(Relation::Hundred).collect();
        assert_eq!(rows[0].col_double, data.hundred.double[1]);
        assert_eq!(rows[98].col_double, data.hundred.double[99]);
        assert_eq!(rows[99].col_double, data.hundred.double[0]);
        assert_eq!(rows[199].col_name, data.hundred.name[0]);
    }

    #[test]
    fn streams_survive_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let data = DatasetGenerator::new(120).with_seed(8).generate();
        let paths = write_streams(&data, dir.path()).unwrap();
        assert_eq!(paths.len(), 5);

        let mut reader = read_stream(dir.path(), Relation::Hundred).unwrap();
        let from_file: Vec<Vec<Value>> = reader.by_ref().collect();
        assert!(reader.take_error().is_none());
        let in_memory: Vec<Vec<Value>> = data.stream(Relation::Hundred).collect();
        assert_eq!(from_file, in_memory);

        let tiny: Vec<Vec<Value>> = read_stream(dir.path(), Relation::Tiny)
            .unwrap()
            .collect();
        assert_eq!(tiny, vec![vec![Value::Integer(0)]]);
    }

    #[test]
    fn malformed_record_stops_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(Relation::Updates.file_name()),
            "1,1,1,1.0,1.0,1.0,1900-01-01,a,b,c\nnot,a,row\n",
        )
        .unwrap();
        let mut reader = read_stream(dir.path(), Relation::Updates).unwrap();
        assert_eq!(reader.by_ref().count(), 1);
        assert!(reader.take_error().is_some());
    }
}
