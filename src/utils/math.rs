/// Quantile of sorted data using linear interpolation between the two
/// closest ranks (`(n - 1) * q`).
pub fn quantile_sorted(sorted: &[i64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    let low = sorted[lower] as f64;
    let high = sorted[upper] as f64;
    Some(low + (high - low) * frac)
}

pub fn mean(data: &[i64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let sum: f64 = data.iter().map(|&x| x as f64).sum();
    Some(sum / data.len() as f64)
}

/// Sample standard deviation (divisor `n - 1`), undefined below two values.
pub fn sample_std(data: &[i64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let mean = mean(data)?;
    let ss: f64 = data.iter().map(|&x| (x as f64 - mean).powi(2)).sum();
    Some((ss / (data.len() - 1) as f64).sqrt())
}
