use core_types::DataSeries;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage as Ema, SimpleMovingAverage as Sma};

/// Simple moving average over a window of `period` points.
///
/// Emits one point per index `i >= period - 1`, so the output holds exactly
/// `max(0, n - period + 1)` points. Each output point takes its label,
/// timestamp and metadata from the last point of its window.
pub fn moving_average(series: &DataSeries, period: usize) -> DataSeries {
    let mut output = series.derive(format!("{} (MA{})", series.name, period));
    if period == 0 || period > series.len() {
        tracing::debug!(series = %series.name, period, len = series.len(), "Moving average needs more points");
        return output;
    }

    let mut sma = match Sma::new(period) {
        Ok(sma) => sma,
        Err(e) => {
            tracing::warn!("Failed to initialize SMA({}): {:?}", period, e);
            return output;
        }
    };

    for (i, point) in series.points.iter().enumerate() {
        // `ta` averages over the points seen so far during warm-up; those
        // partial windows are discarded.
        let value = sma.next(point.value);
        if i + 1 >= period {
            let mut derived = point.clone();
            derived.value = value;
            output.push(derived);
        }
    }
    output
}

/// Exponential moving average with smoothing factor `k = 2 / (period + 1)`.
///
/// Seeded with the first raw value, so the first output equals the first input
/// exactly; afterwards `ema[i] = value[i] * k + ema[i - 1] * (1 - k)`.
pub fn exponential_moving_average(series: &DataSeries, period: usize) -> DataSeries {
    let mut output = series.derive(format!("{} (EMA{})", series.name, period));
    if period == 0 || series.is_empty() {
        return output;
    }

    let mut ema = match Ema::new(period) {
        Ok(ema) => ema,
        Err(e) => {
            tracing::warn!("Failed to initialize EMA({}): {:?}", period, e);
            return output;
        }
    };

    for point in &series.points {
        let mut derived = point.clone();
        derived.value = ema.next(point.value);
        output.push(derived);
    }
    output
}
