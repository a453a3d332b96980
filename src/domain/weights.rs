//! Weight constraint enforcement.
//!
//! Raw strategy weights are split into a long and a short group. Each group is
//! clipped to `[min_abs, max_abs]` in magnitude and the clipped excess (or
//! deficit) is spread evenly over the entries that were strictly inside the
//! bounds. Redistribution is not re-clipped within the same pass; the next
//! pass corrects any overshoot. Finally the gross exposure is rescaled to 1.

use crate::domain::error::LongshortError;
use crate::domain::prices::Weights;
use std::collections::BTreeMap;
use tracing::warn;

pub const MAX_ITERATIONS: usize = 100;

/// Adjustments smaller than this are left undistributed.
const REDISTRIBUTION_THRESHOLD: f64 = 1e-3;

/// Tolerance on the gross exposure before the final rescale kicks in.
pub const GROSS_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct EnforcedWeights {
    pub weights: Weights,
    /// False when either group exhausted [`MAX_ITERATIONS`] passes.
    pub converged: bool,
}

impl EnforcedWeights {
    pub fn gross_exposure(&self) -> f64 {
        gross_exposure(&self.weights)
    }

    pub fn within_bounds(&self, min_abs: f64, max_abs: f64, tol: f64) -> bool {
        self.weights
            .values()
            .all(|w| w.abs() >= min_abs - tol && w.abs() <= max_abs + tol)
    }
}

pub fn gross_exposure(weights: &Weights) -> f64 {
    weights.values().map(|w| w.abs()).sum()
}

/// Clip every weight's magnitude into `[min_abs, max_abs]` and renormalize so
/// the absolute weights sum to 1.
pub fn enforce(
    weights: &Weights,
    min_abs: f64,
    max_abs: f64,
) -> Result<EnforcedWeights, LongshortError> {
    enforce_with_cap(weights, min_abs, max_abs, MAX_ITERATIONS)
}

fn enforce_with_cap(
    weights: &Weights,
    min_abs: f64,
    max_abs: f64,
    max_passes: usize,
) -> Result<EnforcedWeights, LongshortError> {
    if !(min_abs > 0.0 && min_abs < max_abs) {
        return Err(LongshortError::invalid_argument(format!(
            "weight bounds require 0 < min < max, got min={min_abs} max={max_abs}"
        )));
    }

    let mut longs = BTreeMap::new();
    let mut shorts = BTreeMap::new();
    for (ticker, &w) in weights {
        if w >= 0.0 {
            longs.insert(ticker.clone(), w);
        } else {
            shorts.insert(ticker.clone(), w.abs());
        }
    }

    let longs_converged = clip_group(&mut longs, min_abs, max_abs, max_passes);
    let shorts_converged = clip_group(&mut shorts, min_abs, max_abs, max_passes);
    let converged = longs_converged && shorts_converged;
    if !converged {
        warn!(
            assets = weights.len(),
            min_abs, max_abs, "weight clipping hit the iteration cap without settling"
        );
    }

    let mut adjusted: Weights = longs;
    adjusted.extend(shorts.into_iter().map(|(ticker, w)| (ticker, -w)));

    let gross = gross_exposure(&adjusted);
    if gross > 0.0 && (gross - 1.0).abs() > GROSS_TOLERANCE {
        for w in adjusted.values_mut() {
            *w /= gross;
        }
    }

    Ok(EnforcedWeights {
        weights: adjusted,
        converged,
    })
}

/// Iterative clip-and-redistribute over non-negative magnitudes. Returns
/// whether the group settled within `max_passes`.
fn clip_group(group: &mut BTreeMap<String, f64>, min: f64, max: f64, max_passes: usize) -> bool {
    for _ in 0..max_passes {
        let unconstrained: Vec<String> = group
            .iter()
            .filter(|&(_, &w)| w > min && w < max)
            .map(|(ticker, _)| ticker.clone())
            .collect();

        if unconstrained.len() == group.len() {
            return true;
        }

        let mut changed = false;
        let mut adjustment = 0.0;
        for w in group.values_mut() {
            if *w > max {
                adjustment += *w - max;
                *w = max;
                changed = true;
            } else if *w < min {
                adjustment -= min - *w;
                *w = min;
                changed = true;
            }
        }

        if adjustment.abs() > REDISTRIBUTION_THRESHOLD {
            if !unconstrained.is_empty() {
                let delta = adjustment / unconstrained.len() as f64;
                for ticker in &unconstrained {
                    if let Some(w) = group.get_mut(ticker) {
                        *w += delta;
                    }
                }
            }
            changed = true;
        }

        if !changed {
            return true;
        }
    }
    false
}
