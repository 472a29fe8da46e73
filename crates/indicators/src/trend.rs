use core_types::{DataPoint, DataSeries};
use serde::{Deserialize, Serialize};

/// Slopes whose magnitude does not exceed this are considered flat.
pub const DEFAULT_TREND_EPSILON: f64 = 1e-9;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn classify(slope: f64, epsilon: f64) -> Self {
        if slope > epsilon {
            TrendDirection::Increasing
        } else if slope < -epsilon {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "Increasing",
            TrendDirection::Decreasing => "Decreasing",
            TrendDirection::Stable => "Stable",
        }
    }
}

/// An ordinary least-squares fit `value = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
}

impl TrendLine {
    pub fn project(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fits value over point index (0, 1, 2, ...). `None` below two points.
pub fn linear_trend(series: &DataSeries, epsilon: f64) -> Option<TrendLine> {
    let xs: Vec<f64> = (0..series.len()).map(|i| i as f64).collect();
    fit(&xs, &series.values(), epsilon)
}

/// Fits value over time, measured in fractional days since the first point.
///
/// `None` when any point lacks a timestamp or fewer than two points exist.
pub fn linear_trend_by_time(series: &DataSeries, epsilon: f64) -> Option<TrendLine> {
    let first = series.points.first()?.timestamp?;
    let xs = series
        .points
        .iter()
        .map(|p| p.timestamp.map(|t| (t - first).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY))
        .collect::<Option<Vec<f64>>>()?;
    fit(&xs, &series.values(), epsilon)
}

/// The fitted index trend rendered as a series with one point per input point.
pub fn trend_line_series(series: &DataSeries, epsilon: f64) -> DataSeries {
    let mut output = series.derive(format!("{} (Trend)", series.name));
    let Some(line) = linear_trend(series, epsilon) else {
        return output;
    };

    output.points = series
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut point = DataPoint::new(p.label.clone(), line.project(i as f64));
            point.timestamp = p.timestamp;
            point
        })
        .collect();
    output
        .metadata
        .insert("slope".to_string(), serde_json::json!(line.slope));
    output
        .metadata
        .insert("r_squared".to_string(), serde_json::json!(line.r_squared));
    output
}

fn fit(xs: &[f64], ys: &[f64], epsilon: f64) -> Option<TrendLine> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let n_f = n as f64;
    let mean_x = xs.iter().sum::<f64>() / n_f;
    let mean_y = ys.iter().sum::<f64>() / n_f;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    if sxx == 0.0 {
        // Every x identical: no line can be fitted.
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    // A constant series is fitted perfectly by a flat line.
    let r_squared = if ss_tot == 0.0 { 1.0 } else { (1.0 - ss_res / ss_tot).max(0.0) };

    Some(TrendLine {
        slope,
        intercept,
        r_squared,
        direction: TrendDirection::classify(slope, epsilon),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    const EPS: f64 = 1e-9;

    #[test]
    fn perfect_line_is_recovered() {
        let series = DataSeries::from_pairs("Leads", (0..6).map(|i| (i.to_string(), 3.0 + 2.0 * i as f64)));
        let line = linear_trend(&series, DEFAULT_TREND_EPSILON).unwrap();
        assert!((line.slope - 2.0).abs() < EPS);
        assert!((line.intercept - 3.0).abs() < EPS);
        assert!((line.r_squared - 1.0).abs() < EPS);
        assert_eq!(line.direction, TrendDirection::Increasing);
    }

    #[test]
    fn constant_series_is_stable() {
        let series = DataSeries::from_pairs("Flat", (0..5).map(|i| (i.to_string(), 7.0)));
        let line = linear_trend(&series, DEFAULT_TREND_EPSILON).unwrap();
        assert_eq!(line.slope, 0.0);
        assert_eq!(line.direction, TrendDirection::Stable);
    }

    #[test]
    fn classify_respects_epsilon() {
        assert_eq!(TrendDirection::classify(0.05, 0.1), TrendDirection::Stable);
        assert_eq!(TrendDirection::classify(-0.05, 0.1), TrendDirection::Stable);
        assert_eq!(TrendDirection::classify(0.2, 0.1), TrendDirection::Increasing);
        assert_eq!(TrendDirection::classify(-0.2, 0.1), TrendDirection::Decreasing);
    }

    #[test]
    fn needs_two_points() {
        let series = DataSeries::from_pairs("One", [("a", 1.0)]);
        assert!(linear_trend(&series, DEFAULT_TREND_EPSILON).is_none());
        assert!(trend_line_series(&series, DEFAULT_TREND_EPSILON).is_empty());
    }

    #[test]
    fn time_based_fit_uses_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut series = DataSeries::new("Revenue");
        for (i, value) in [100.0, 90.0, 80.0].into_iter().enumerate() {
            // Points two days apart, dropping 10 each time: slope -5 per day.
            series.push(DataPoint::new(i.to_string(), value).with_timestamp(start + Duration::days(2 * i as i64)));
        }
        let line = linear_trend_by_time(&series, DEFAULT_TREND_EPSILON).unwrap();
        assert!((line.slope + 5.0).abs() < EPS);
        assert_eq!(line.direction, TrendDirection::Decreasing);

        series.points[1].timestamp = None;
        assert!(linear_trend_by_time(&series, DEFAULT_TREND_EPSILON).is_none());
    }

    #[test]
    fn trend_series_projects_fit() {
        let series = DataSeries::from_pairs("Deals", [("a", 1.0), ("b", 3.0), ("c", 5.0)]);
        let trend = trend_line_series(&series, DEFAULT_TREND_EPSILON);
        assert_eq!(trend.name, "Deals (Trend)");
        assert_eq!(trend.len(), 3);
        assert!((trend.points[2].value - 5.0).abs() < EPS);
    }
}
