//! crates/aravalli_core/src/trend.rs
//!
//! Least-squares trend over an evenly spaced series.

/// A slope below this is read as long-term vegetation loss.
pub const DEGRADATION_SLOPE: f64 = -0.01;

/// Yearly mean NDVI for the monitored range.
pub const NDVI_BY_YEAR: [(i32, f64); 6] = [
    (2019, 0.65),
    (2020, 0.68),
    (2021, 0.62),
    (2022, 0.55),
    (2023, 0.48),
    (2024, 0.42),
];

/// Monthly nightlight intensity; the April jump marks new construction.
pub const NIGHTLIGHT_BY_MONTH: [(&str, f64); 6] = [
    ("Jan", 20.0),
    ("Feb", 22.0),
    ("Mar", 25.0),
    ("Apr", 85.0),
    ("May", 80.0),
    ("Jun", 30.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendLabel {
    Degradation,
    Natural,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Degradation => "Degradation",
            TrendLabel::Natural => "Natural",
        }
    }
}

/// Slope of the least-squares line through `(index, value)` points.
///
/// Returns `None` for fewer than two points, where the slope is undefined.
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    Some((n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x))
}

pub fn label_for_slope(slope: f64) -> TrendLabel {
    if slope < DEGRADATION_SLOPE {
        TrendLabel::Degradation
    } else {
        TrendLabel::Natural
    }
}

/// Slope and label of the yearly NDVI series.
pub fn ndvi_trend() -> (f64, TrendLabel) {
    let values: Vec<f64> = NDVI_BY_YEAR.iter().map(|(_, ndvi)| *ndvi).collect();
    let slope = linear_slope(&values).unwrap_or(0.0);
    (slope, label_for_slope(slope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slope_of_yearly_ndvi_series() {
        let slope = linear_slope(&[0.65, 0.68, 0.62, 0.55, 0.48, 0.42]).unwrap();
        // (6 * 7.59 - 15 * 3.4) / (6 * 55 - 15 * 15)
        assert!((slope - (-0.052)).abs() < 1e-9);
        assert_eq!(label_for_slope(slope), TrendLabel::Degradation);
    }

    #[test]
    fn built_in_series_reads_as_degradation() {
        let (slope, label) = ndvi_trend();
        assert!(slope < 0.0);
        assert_eq!(label, TrendLabel::Degradation);
    }

    #[test]
    fn flat_series_is_natural() {
        let slope = linear_slope(&[0.5, 0.5, 0.5]).unwrap();
        assert_eq!(slope, 0.0);
        assert_eq!(label_for_slope(slope), TrendLabel::Natural);
    }

    #[test]
    fn threshold_itself_is_natural() {
        assert_eq!(label_for_slope(-0.01), TrendLabel::Natural);
    }

    #[test]
    fn too_few_points() {
        assert_eq!(linear_slope(&[]), None);
        assert_eq!(linear_slope(&[0.3]), None);
    }
}
