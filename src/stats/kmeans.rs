use super::Thresholds;

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_EPSILON: f64 = 1e-9;

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let pos = q * (sorted.len() as f64 - 1.0);
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    let a = sorted[idx];
    let b = sorted[(idx + 1).min(sorted.len() - 1)];
    Some(a + (b - a) * frac)
}

/// One-dimensional k-means (Lloyd). Returns `k` centroids sorted ascending.
///
/// Centroids start at evenly spaced quantiles, so the result is deterministic.
/// With fewer than `k` distinct values the distinct values are returned, padded
/// with the largest one.
pub fn kmeans_1d(values: &[f64], k: usize) -> Option<Vec<f64>> {
    if k == 0 {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() <= k {
        let last = distinct[distinct.len() - 1];
        distinct.resize(k, last);
        return Some(distinct);
    }

    let mut centers: Vec<f64> = (0..k)
        .map(|i| quantile_sorted(&sorted, (2 * i + 1) as f64 / (2 * k) as f64))
        .collect::<Option<Vec<f64>>>()?;

    for _ in 0..MAX_ITERATIONS {
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for value in &sorted {
            let nearest = nearest_center(&centers, *value);
            sums[nearest] += value;
            counts[nearest] += 1;
        }

        let mut shift: f64 = 0.0;
        for idx in 0..k {
            if counts[idx] == 0 {
                continue;
            }
            let updated = sums[idx] / counts[idx] as f64;
            shift = shift.max((updated - centers[idx]).abs());
            centers[idx] = updated;
        }
        if shift < CONVERGENCE_EPSILON {
            break;
        }
    }

    centers.sort_by(|a, b| a.total_cmp(b));
    Some(centers)
}

fn nearest_center(centers: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, center) in centers.iter().enumerate() {
        let dist = (value - center).abs();
        if dist < best_dist {
            best = idx;
            best_dist = dist;
        }
    }
    best
}

/// Medium/high cutoffs: the 2nd and 3rd of three ascending cluster centroids.
pub fn severity_cutoffs(values: &[f64]) -> Option<Thresholds> {
    let centers = kmeans_1d(values, 3)?;
    Some(Thresholds {
        medium: centers[1],
        high: centers[2],
    })
}
