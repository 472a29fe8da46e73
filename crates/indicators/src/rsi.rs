use core_types::DataSeries;
use std::collections::VecDeque;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Relative Strength Index over a rolling window of `period` changes.
///
/// For every index `i >= period` the average gain and average loss of the last
/// `period` successive differences give `RS = gain / loss` and
/// `RSI = 100 - 100 / (1 + RS)`. A window without losses reads 100.
///
/// The output holds `max(0, n - period)` points, labelled like their input.
pub fn relative_strength_index(series: &DataSeries, period: usize) -> DataSeries {
    let mut output = series.derive(format!("{} (RSI{})", series.name, period));
    if period == 0 || series.len() <= period {
        return output;
    }

    let mut window: VecDeque<f64> = VecDeque::with_capacity(period);
    for i in 1..series.len() {
        let change = series.points[i].value - series.points[i - 1].value;
        if window.len() == period {
            window.pop_front();
        }
        window.push_back(change);

        if window.len() < period {
            continue;
        }

        let gain = window.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
        let loss = window.iter().filter(|c| **c < 0.0).map(|c| -c).sum::<f64>() / period as f64;

        let mut point = series.points[i].clone();
        point.value = rsi_value(gain, loss);
        output.push(point);
    }
    output
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn rising_series_reads_one_hundred() {
        let series = DataSeries::from_pairs("Pipeline", (0..30).map(|i| (i.to_string(), 10.0 + i as f64 * 1.5)));
        let rsi = relative_strength_index(&series, DEFAULT_RSI_PERIOD);
        assert_eq!(rsi.len(), 30 - DEFAULT_RSI_PERIOD);
        assert!(rsi.values().iter().all(|v| *v == 100.0));
    }

    #[test]
    fn falling_series_reads_zero() {
        let series = DataSeries::from_pairs("Churn", (0..10).map(|i| (i.to_string(), 100.0 - i as f64)));
        let rsi = relative_strength_index(&series, 3);
        assert_eq!(rsi.len(), 7);
        assert!(rsi.values().iter().all(|v| v.abs() < EPS));
    }

    #[test]
    fn mixed_window_matches_hand_calculation() {
        // Changes: +2, -1, +3 -> gain 5/3, loss 1/3, RS 5, RSI 100 - 100/6.
        let series = DataSeries::from_pairs("Score", [("a", 10.0), ("b", 12.0), ("c", 11.0), ("d", 14.0)]);
        let rsi = relative_strength_index(&series, 3);
        assert_eq!(rsi.len(), 1);
        assert_eq!(rsi.points[0].label, "d");
        assert!((rsi.points[0].value - (100.0 - 100.0 / 6.0)).abs() < EPS);
    }

    #[test]
    fn too_short_input_yields_empty_series() {
        let series = DataSeries::from_pairs("Score", [("a", 1.0), ("b", 2.0)]);
        assert!(relative_strength_index(&series, 2).is_empty());
        assert!(relative_strength_index(&series, 0).is_empty());
    }
}
