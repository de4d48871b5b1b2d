//! Shuffle and sample-without-replacement primitives.
//!
//! Every function takes an explicit random source so that callers can thread
//! one seeded generator through a whole session and reproduce it exactly.

use anyhow::{ensure, Result};
use rand::prelude::*;

/// Return a shuffled copy of `items`.
pub fn shuffled<T: Clone>(rng: &mut impl Rng, items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// Draw `n` distinct elements from `population` without replacement.
///
/// Fails when the population is too small; callers treat that as a
/// configuration error and abort generation.
pub fn sample_without_replacement<T: Clone>(
    rng: &mut impl Rng,
    population: &[T],
    n: usize,
) -> Result<Vec<T>> {
    ensure!(
        n <= population.len(),
        "cannot sample {} items from a population of {}",
        n,
        population.len()
    );
    let mut out = population.to_vec();
    out.shuffle(rng);
    out.truncate(n);
    Ok(out)
}
