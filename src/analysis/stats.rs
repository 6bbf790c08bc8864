//! Descriptive statistics over aggregate series.

use crate::error::{AnalysisError, Result};
use crate::models::{Composition, CompositionShare, LinearFit, ResidualPolicy};
use tracing::warn;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Centered sums: (Σdx·dy, Σdx², Σdy²).
fn co_moments(xs: &[f64], ys: &[f64]) -> (f64, f64, f64) {
    let (mx, my) = (mean(xs), mean(ys));
    xs.iter()
        .zip(ys)
        .fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (x, y)| {
            let (dx, dy) = (x - mx, y - my);
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        })
}

/// Every element equal to the first. Exact, unlike a variance threshold.
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

fn check_lengths(xs: &[f64], ys: &[f64]) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(AnalysisError::LengthMismatch {
            left: xs.len(),
            right: ys.len(),
        });
    }
    Ok(())
}

/// Pearson correlation coefficient.
///
/// `NaN` when there are fewer than two points or either side is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<f64> {
    check_lengths(xs, ys)?;
    if xs.len() < 2 || is_constant(xs) || is_constant(ys) {
        return Ok(f64::NAN);
    }

    let (sxy, sxx, syy) = co_moments(xs, ys);
    Ok((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Least-squares fit of `ys` on `xs`; `None` when `xs` is constant.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Result<Option<LinearFit>> {
    check_lengths(xs, ys)?;
    if xs.len() < 2 || is_constant(xs) {
        return Ok(None);
    }

    let (sxy, sxx, _) = co_moments(xs, ys);
    let slope = sxy / sxx;
    Ok(Some(LinearFit {
        slope,
        intercept: mean(ys) - slope * mean(xs),
    }))
}

/// Percent change against the previous value.
///
/// The first entry is `Some(0.0)`; a zero predecessor gives `None`.
pub fn percent_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(values.len());

    for (idx, value) in values.iter().enumerate() {
        if idx == 0 {
            changes.push(Some(0.0));
            continue;
        }
        let previous = values[idx - 1];
        changes.push(if previous == 0.0 {
            None
        } else {
            Some((value - previous) / previous * 100.0)
        });
    }

    changes
}

/// Split one year's total into food, recycled and the remainder.
pub fn composition(
    year: i32,
    total: f64,
    food: f64,
    recycled: f64,
    policy: ResidualPolicy,
) -> Result<Composition> {
    if total <= 0.0 {
        return Err(AnalysisError::Degenerate(format!(
            "total waste for {} is {}, expected a positive amount",
            year, total
        )));
    }

    let raw_residual = total - food - recycled;
    let (residual, clamped_residual) = if raw_residual < 0.0 {
        match policy {
            ResidualPolicy::Reject => {
                return Err(AnalysisError::Degenerate(format!(
                    "food ({}) and recycled ({}) exceed the total ({}) for {}; \
                     check that both files use the same unit",
                    food, recycled, total, year
                )));
            }
            ResidualPolicy::Clamp => {
                warn!(
                    "Residual for {} is negative ({:.1}); clamping to zero",
                    year, raw_residual
                );
                (0.0, Some(raw_residual))
            }
        }
    } else {
        (raw_residual, None)
    };

    let parts = [
        ("Food waste", food),
        ("Recycled waste", recycled),
        ("Other / residual", residual),
    ];
    let whole: f64 = parts.iter().map(|(_, amount)| amount).sum();

    let shares = parts
        .iter()
        .map(|(label, amount)| CompositionShare {
            label: label.to_string(),
            amount: *amount,
            percent: if whole > 0.0 {
                amount / whole * 100.0
            } else {
                0.0
            },
        })
        .collect();

    Ok(Composition {
        year,
        total,
        shares,
        clamped_residual,
    })
}
