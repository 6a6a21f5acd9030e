/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Divides `part` by `total`, yielding `None` when the denominator is missing or zero.
pub fn ratio(part: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => Some(part as f64 / total as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_ratio_undefined_denominators() {
        assert_eq!(ratio(10, Some(0)), None);
        assert_eq!(ratio(10, None), None);
        assert_eq!(ratio(1, Some(4)), Some(0.25));
    }
}
