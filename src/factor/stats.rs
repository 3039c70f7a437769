//! Cross-sectional statistics

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n); 0 for an empty slice
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Z-scores clipped to `[-bound, bound]`; all zeros when the spread is zero
pub fn winsorized_z_scores(values: &[f64], bound: f64) -> Vec<f64> {
    let m = mean(values);
    let std = population_std(values);
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| ((v - m) / std).clamp(-bound, bound))
        .collect()
}
