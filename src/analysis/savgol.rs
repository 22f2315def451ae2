//! Savitzky–Golay smoothing.
//!
//! Every output point is the value, at that point, of a least-squares
//! polynomial fitted over a window of neighbouring samples. Near the edges
//! the first (or last) full window is fitted once and evaluated at each
//! edge position, so the output has the same length as the input.

use super::AnalysisError;

/// Window used for frame analysis.
pub const WINDOW: usize = 31;
/// Polynomial order used for frame analysis.
pub const ORDER: usize = 3;

/// Smooth `y` with a `window`-point, `order`-degree Savitzky–Golay filter.
pub fn savgol_filter(y: &[f64], window: usize, order: usize) -> Result<Vec<f64>, AnalysisError> {
    if window % 2 == 0 || order >= window {
        return Err(AnalysisError::InvalidFilter { window, order });
    }
    if y.len() < window {
        return Err(AnalysisError::InsufficientSamples {
            len: y.len(),
            window,
        });
    }

    let hat = hat_matrix(window, order);
    let half = window / 2;
    let n = y.len();
    let tail_start = n - window;

    let out = (0..n)
        .map(|i| {
            let (row, start) = if i < half {
                (i, 0)
            } else if i >= n - half {
                (i - tail_start, tail_start)
            } else {
                (half, i - half)
            };
            dot(&hat[row], &y[start..start + window])
        })
        .collect();
    Ok(out)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `H = V (VᵀV)⁻¹ Vᵀ` for the Vandermonde matrix `V` of the window.
///
/// Row `t` gives the weights that evaluate the fitted polynomial at window
/// position `t`. Positions are scaled to `[-1, 1]` to keep `VᵀV` well
/// conditioned; `H` does not depend on the scaling.
fn hat_matrix(window: usize, order: usize) -> Vec<Vec<f64>> {
    let half = (window / 2) as f64;
    let terms = order + 1;
    let vander: Vec<Vec<f64>> = (0..window)
        .map(|j| {
            let t = (j as f64 - half) / half.max(1.0);
            (0..terms).map(|k| t.powi(k as i32)).collect()
        })
        .collect();

    // Normal equations: (VᵀV) G = Vᵀ, solved for G by Gauss–Jordan.
    let mut gram = vec![vec![0.0; terms]; terms];
    for row in &vander {
        for a in 0..terms {
            for b in 0..terms {
                gram[a][b] += row[a] * row[b];
            }
        }
    }
    let mut rhs: Vec<Vec<f64>> = (0..terms)
        .map(|k| vander.iter().map(|row| row[k]).collect())
        .collect();
    solve_in_place(&mut gram, &mut rhs);

    vander
        .iter()
        .map(|v_row| {
            (0..window)
                .map(|j| (0..terms).map(|k| v_row[k] * rhs[k][j]).sum())
                .collect()
        })
        .collect()
}

/// Gauss–Jordan elimination with partial pivoting. On return `rhs` holds
/// `a⁻¹ · rhs`. `a` is symmetric positive definite here, so pivots are
/// never zero.
fn solve_in_place(a: &mut [Vec<f64>], rhs: &mut [Vec<f64>]) {
    let n = a.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        rhs.swap(col, pivot);

        let p = a[col][col];
        a[col].iter_mut().for_each(|v| *v /= p);
        rhs[col].iter_mut().for_each(|v| *v /= p);

        let pivot_a = a[col].clone();
        let pivot_rhs = rhs[col].clone();
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in a[row].iter_mut().zip(&pivot_a) {
                *v -= factor * p;
            }
            for (v, p) in rhs[row].iter_mut().zip(&pivot_rhs) {
                *v -= factor * p;
            }
        }
    }
}
