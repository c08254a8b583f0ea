use std::cell::RefCell;

use rand::rngs::SmallRng;
use rand::Rng;
use rand::{RngCore, SeedableRng};

// Thread-local `SmallRng` state.
thread_local! {
    static THREAD_RNG_KEY: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

/// A handle to the thread-local `SmallRng`, similar to `rand::ThreadRng`.
#[derive(Debug, Clone)]
pub struct SmallThreadRng;

impl RngCore for SmallThreadRng {
    fn next_u32(&mut self) -> u32 {
        THREAD_RNG_KEY.with(|rng_cell| rng_cell.borrow_mut().next_u32())
    }

    fn next_u64(&mut self) -> u64 {
        THREAD_RNG_KEY.with(|rng_cell| rng_cell.borrow_mut().next_u64())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        THREAD_RNG_KEY.with(|rng_cell| rng_cell.borrow_mut().fill_bytes(dest))
    }
}

pub fn small_thread_rng() -> SmallThreadRng {
    SmallThreadRng
}

/// RNG for dataset generation. A seed makes the generated data reproducible;
/// without one it is seeded from the OS and runs are not reproducible.
pub fn generator_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

/// Draws from `[0, upper)` with `rng`, returning 0 when the range is empty.
pub fn gen_below<R: Rng + ?Sized>(rng: &mut R, upper: u64) -> u64 {
    if upper == 0 {
        0
    } else {
        rng.random_range(0..upper)
    }
}

/// Uniform key in `[0, upper)` that is never `excluded`.
///
/// Returns 0 when the range holds at most one value.
pub fn gen_random_key_excluding(upper: u64, excluded: u64) -> u64 {
    if upper <= 1 {
        return 0;
    }
    let mut rng = small_thread_rng();
    loop {
        let key = gen_below(&mut rng, upper);
        if key != excluded {
            return key;
        }
    }
}
