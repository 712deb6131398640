//! Reproducible train/test split

use crate::error::DataError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `0..rows` with `seed` and cut off `ceil(test_size * rows)` test rows.
///
/// Returns `(train, test)` index lists. Both sides must be non-empty.
pub fn split_indices(
    rows: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), DataError> {
    let n_test = (test_size * rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= rows {
        return Err(DataError::SplitTooSmall { rows, test_size });
    }

    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}
