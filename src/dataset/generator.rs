use rand::Rng;

use super::date::format_date;
use super::encoding::{pad_random, unique_prefix, CODE_WIDTH, NAME_WIDTH};
use super::{MARKER_ADDRESS, MARKER_CODE, MARKER_NAME};
use crate::random::{gen_below, generator_rng};
use crate::log_debug;

pub const RANDOMIZER_RANGE: u64 = 1_000_000_000;
pub const MIN_SIGNED: i64 = -500_000_000;
pub const HUNDRED_SAMPLE: usize = 100;
/// Marker name/code is placed on one of the first this-many sample rows.
pub const MARKER_SLOTS: usize = 10;

pub fn sparse_key_spread(tuples: u64) -> i64 {
    std::cmp::max(1, 1_000_000_000 / tuples.max(1)) as i64
}

pub fn signed_spread(tuples: u64) -> i64 {
    std::cmp::max(1, 5_000_000_000 / tuples.max(1)) as i64
}

/// Next value of the tenpct cursor. Cycles through `0, 2, 3, .., tenpct`.
pub fn next_r10pct_key(current: u64, tenpct: u64) -> u64 {
    let mut next = current + 1;
    if next == 1 {
        next = 2;
    }
    if next > tenpct {
        next = 0;
    }
    next
}

/// One row of the base relation, in randomizer order.
#[derive(Debug, Clone)]
pub struct BaseRecord {
    pub rec: u64,
    pub randomizer: u64,
    pub dense_key: i64,
    pub sparse_key: i64,
    pub sparse_signed: i64,
    pub uniform100_dense: i64,
    pub zipf10_value: f32,
    pub zipf100_value: f32,
    pub uniform100_float: f32,
    pub double_normal: f64,
    pub r10pct_key: u64,
    pub date: String,
    pub code: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct TenpctRecord {
    pub col_key: i64,
    pub col_signed: i64,
    pub col_float: f32,
    pub col_double: f64,
    pub col_address: String,
}

/// Values of the first hundred base rows, cycled through by the `hundred` table.
#[derive(Debug, Clone, Default)]
pub struct HundredSample {
    pub float: Vec<f32>,
    pub double: Vec<f64>,
    pub name: Vec<String>,
    pub address: Vec<String>,
}

impl HundredSample {
    fn from_records(records: &[BaseRecord]) -> Self {
        let mut sample = HundredSample::default();
        for r in records.iter().take(HUNDRED_SAMPLE) {
            sample.float.push((r.double_normal / 2.0) as f32);
            sample.double.push(r.double_normal);
            sample.name.push(r.name.clone());
            sample.address.push(r.address.clone());
        }
        sample
    }

    pub fn len(&self) -> usize {
        self.double.len()
    }

    pub fn is_empty(&self) -> bool {
        self.double.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<BaseRecord>,
    pub tenpct: Vec<TenpctRecord>,
    pub hundred: HundredSample,
    /// Sample slot (and base record index) carrying the marker name and code.
    pub marker_slot: usize,
    /// Name the marker record had before the marker replaced it.
    pub displaced_name: String,
    pub sparse_spread: i64,
    pub signed_spread: i64,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Derived tenpct row referenced by a `r10pct_key`.
    pub fn tenpct_for(&self, r10pct_key: u64) -> Option<&TenpctRecord> {
        let idx = match r10pct_key {
            0 => 0,
            k => (k - 1) as usize,
        };
        self.tenpct.get(idx)
    }
}

/// Builds the synthetic AS3AP relation.
///
/// # Example
///
/// ```
/// use as3ap::dataset::DatasetGenerator;
///
/// let data = DatasetGenerator::new(1000).with_seed(1).generate();
/// assert_eq!(data.len(), 1000);
/// assert_eq!(data.tenpct.len(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetGenerator {
    tuples: u64,
    seed: Option<u64>,
}

impl DatasetGenerator {
    pub fn new(tuples: u64) -> Self {
        DatasetGenerator { tuples, seed: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn tuples(&self) -> u64 {
        self.tuples
    }

    pub fn generate(&self) -> Dataset {
        let n = self.tuples;
        let mut rng = generator_rng(self.seed);

        let zipf10: Vec<f32> = (0..10)
            .map(|_| rng.random_range(MIN_SIGNED..-MIN_SIGNED) as f32)
            .collect();
        let zipf100: Vec<f32> = (0..100)
            .map(|_| rng.random_range(MIN_SIGNED..-MIN_SIGNED) as f32)
            .collect();

        let mut randomizers: Vec<u64> = (0..n)
            .map(|_| rng.random_range(0..RANDOMIZER_RANGE))
            .collect();
        randomizers.sort_unstable();

        let sparse_spread = sparse_key_spread(n);
        let signed_spread = signed_spread(n);
        let tenpct_count = n / 10;

        let mut records = Vec::with_capacity(n as usize);
        let mut r10pct_key = 0;
        for (i, randomizer) in randomizers.into_iter().enumerate() {
            let rec = i as u64 + 1;
            let dense_key = if rec == 1 { 0 } else { rec as i64 };

            let zipf10_value = zipf10[gen_below(&mut rng, rec % 10) as usize];
            let zipf100_value = zipf100[gen_below(&mut rng, rec % 100) as usize];
            let double_normal =
                rng.random_range(-(RANDOMIZER_RANGE as i64)..RANDOMIZER_RANGE as i64) as f64;

            let mut code = unique_prefix(rec);
            pad_random(&mut rng, &mut code, CODE_WIDTH);
            let mut name = code.clone();
            pad_random(&mut rng, &mut name, NAME_WIDTH);
            let address_len = rng.random_range(2..6 + 25 * (rec & 3)) as usize;
            let mut address = code.clone();
            pad_random(&mut rng, &mut address, address_len);

            r10pct_key = next_r10pct_key(r10pct_key, tenpct_count);

            records.push(BaseRecord {
                rec,
                randomizer,
                dense_key,
                sparse_key: dense_key * sparse_spread,
                sparse_signed: MIN_SIGNED + dense_key * signed_spread,
                uniform100_dense: 100 + (rec % 100) as i64,
                zipf10_value,
                zipf100_value,
                uniform100_float: (100 + rec % 100) as f32,
                double_normal,
                r10pct_key,
                date: format_date(dense_key as u64),
                code,
                name,
                address,
            });
        }

        // The row holding the largest randomizer, i.e. the last one drawn in order.
        if let Some(last) = records.last_mut() {
            last.address = MARKER_ADDRESS.to_string();
        }

        let mut hundred = HundredSample::from_records(&records);
        let marker_slot = gen_below(&mut rng, hundred.len().min(MARKER_SLOTS) as u64) as usize;
        let mut displaced_name = String::new();
        if let Some(r) = records.get_mut(marker_slot) {
            r.code = MARKER_CODE.to_string();
            displaced_name = std::mem::replace(&mut r.name, MARKER_NAME.to_string());
            hundred.name[marker_slot] = MARKER_NAME.to_string();
        }

        let tenpct = records
            .iter()
            .take(tenpct_count as usize)
            .map(|r| TenpctRecord {
                col_key: r.dense_key,
                col_signed: r.sparse_signed,
                col_float: (r.double_normal / 2.0) as f32,
                col_double: r.double_normal,
                col_address: r.address.clone(),
            })
            .collect();

        log_debug!(
            "Generated {} records (sparse spread {}, signed spread {}, marker slot {})",
            records.len(),
            sparse_spread,
            signed_spread,
            marker_slot
        );

        Dataset {
            records,
            tenpct,
            hundred,
            marker_slot,
            displaced_name,
            sparse_spread,
            signed_spread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    #[case(1, 1_000_000_000, 5_000_000_000)]
    #[case(1000, 1_000_000, 5_000_000)]
    #[case(10_000, 100_000, 500_000)]
    #[case(2_000_000_000, 1, 2)]
    fn spreads(#[case] n: u64, #[case] sparse: i64, #[case] signed: i64) {
        assert_eq!(sparse_key_spread(n), sparse);
        assert_eq!(signed_spread(n), signed);
    }

    #[rstest]
    #[case(1)]
    #[case(9)]
    #[case(10)]
    #[case(99)]
    #[case(100)]
    #[case(1000)]
    fn shape(#[case] n: u64) {
        let data = DatasetGenerator::new(n).with_seed(n).generate();
        assert_eq!(data.len() as u64, n);
        assert_eq!(data.tenpct.len() as u64, n / 10);
        assert_eq!(data.hundred.len(), std::cmp::min(n as usize, HUNDRED_SAMPLE));
    }

    #[test]
    fn unseeded_generation_keeps_shape() {
        let data = DatasetGenerator::new(250).generate();
        assert_eq!(data.len(), 250);
        assert_eq!(data.tenpct.len(), 25);
        assert_eq!(data.hundred.len(), 100);
    }

    #[rstest]
    #[case(1)]
    #[case(50)]
    #[case(2000)]
    fn exactly_one_marker_address_and_name_slot(#[case] n: u64) {
        let data = DatasetGenerator::new(n).with_seed(99).generate();
        let addresses = data
            .records
            .iter()
            .filter(|r| r.address == MARKER_ADDRESS)
            .count();
        assert_eq!(addresses, 1);
        let last = data.records.last().unwrap();
        assert_eq!(last.address, MARKER_ADDRESS);
        assert!(data.records.iter().all(|r| r.randomizer <= last.randomizer));

        let names = data
            .hundred
            .name
            .iter()
            .take(MARKER_SLOTS)
            .filter(|s| *s == MARKER_NAME)
            .count();
        assert_eq!(names, 1);
        assert!(data.marker_slot < MARKER_SLOTS);
        let codes = data.records.iter().filter(|r| r.code == MARKER_CODE).count();
        assert_eq!(codes, 1);
    }

    #[test]
    fn keys_and_widths() {
        let n = 1000;
        let data = DatasetGenerator::new(n).with_seed(5).generate();
        assert_eq!(data.records[0].dense_key, 0);
        assert_eq!(data.records[1].dense_key, 2);
        assert_eq!(data.records[999].sparse_key, 1000 * 1_000_000);
        assert_eq!(data.records[999].sparse_signed, MIN_SIGNED + 1000 * 5_000_000);

        let mut codes = HashSet::new();
        for r in data.records.iter() {
            assert_eq!(r.code.len(), 10);
            assert_eq!(r.name.len(), 20);
            assert!(r.address.len() <= 80);
            assert!(r.uniform100_dense >= 100 && r.uniform100_dense < 200);
            assert!(r.double_normal >= -1e9 && r.double_normal < 1e9);
            assert_eq!(r.double_normal.fract(), 0.0);
            assert!(codes.insert(r.code.clone()));
        }
        let randomizers: Vec<u64> = data.records.iter().map(|r| r.randomizer).collect();
        assert!(randomizers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn r10pct_cycle_skips_one() {
        let mut k = 0;
        let mut seen = Vec::new();
        for _ in 0..12 {
            k = next_r10pct_key(k, 5);
            seen.push(k);
        }
        assert_eq!(seen, vec![2, 3, 4, 5, 0, 2, 3, 4, 5, 0, 2, 3]);
        assert_eq!(next_r10pct_key(0, 0), 0);
        assert_eq!(next_r10pct_key(0, 1), 0);
    }

    #[test]
    fn every_r10pct_key_resolves() {
        let data = DatasetGenerator::new(500).with_seed(3).generate();
        for r in data.records.iter() {
            let t = data.tenpct_for(r.r10pct_key).unwrap();
            if r.r10pct_key == 0 {
                assert_eq!(t.col_key, 0);
            } else {
                assert_eq!(t.col_key, r.r10pct_key as i64);
            }
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = DatasetGenerator::new(300).with_seed(11).generate();
        let b = DatasetGenerator::new(300).with_seed(11).generate();
        assert_eq!(a.marker_slot, b.marker_slot);
        for (x, y) in a.records.iter().zip(b.records.iter()) {
            assert_eq!(x.randomizer, y.randomizer);
            assert_eq!(x.address, y.address);
        }
    }
}
