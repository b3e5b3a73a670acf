//! Usage-weighted track sampling.
//!
//! Picks which tracks enter a compilation, biased toward the least-played
//! ones so a library rotates evenly over time.

use crate::error::MedleyError;

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// Selection weight of a track from its play count.
///
/// # Mathematical Foundation
///
/// The weight is the smoothed inverse of usage:
///
/// ```text
/// weight(n) = 1 / (n + S)      S > 0
/// ```
///
/// Unplayed tracks get the maximum weight `1/S`; every additional play
/// strictly lowers the weight, so a track can never starve (weights stay
/// positive) but heavily-played tracks are drawn rarely. The smoothing
/// constant `S` sets how aggressive the bias is: small `S` makes fresh
/// tracks dominate, large `S` flattens the distribution toward uniform.
///
/// Only relative weights matter to the sampler, so no normalization pass
/// is needed.
///
/// # Examples
///
/// ```
/// use medley::algorithm::selection_weight;
///
/// let fresh = selection_weight(0, 5.0);
/// let worn = selection_weight(95, 5.0);
/// assert_eq!(fresh, 0.2);
/// assert_eq!(worn, 0.01);
/// assert!(fresh > worn);
/// ```
pub fn selection_weight(n_usage: u32, smoothing: f64) -> f64 {
    1.0 / (f64::from(n_usage) + smoothing)
}

/// Draw up to `k` distinct entries from `pool` without replacement, each
/// `(index, n_usage)` entry weighted by [`selection_weight`].
///
/// `k` larger than the pool is clamped to the pool size, so the caller may
/// always pass its cap. Returned indices are in draw order.
///
/// # Errors
///
/// [`MedleyError::EmptyEligiblePool`] when there is nothing to draw from;
/// a plain error when `smoothing` is not positive (the weight would divide
/// by zero for unplayed tracks).
pub fn weighted_sample<R: Rng + ?Sized>(
    pool: &[(usize, u32)],
    k: usize,
    smoothing: f64,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if pool.is_empty() {
        return Err(MedleyError::EmptyEligiblePool.into());
    }
    if smoothing <= 0.0 {
        bail!("Smoothing constant must be positive, got {smoothing}");
    }

    let amount = k.min(pool.len());
    let drawn = pool
        .choose_multiple_weighted(rng, amount, |&(_, n_usage)| {
            selection_weight(n_usage, smoothing)
        })
        .context("Weighted sampling failed")?
        .map(|&(index, _)| index)
        .collect();
    Ok(drawn)
}

/// Sample tracks for one compilation and fix their playback order.
///
/// The draw order out of [`weighted_sample`] is already random, but it is
/// correlated with the weights (light-usage tracks tend to surface first).
/// When `shuffle` is set the selection is re-shuffled uniformly so playback
/// order carries no usage signal; when it is not, the selection is sorted
/// by index for a stable, reproducible order.
pub fn select_tracks<R: Rng + ?Sized>(
    pool: &[(usize, u32)],
    k: usize,
    smoothing: f64,
    shuffle: bool,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let mut selected = weighted_sample(pool, k, smoothing, rng)?;
    if shuffle {
        selected.shuffle(rng);
    } else {
        selected.sort_unstable();
    }
    Ok(selected)
}
