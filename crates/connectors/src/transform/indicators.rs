use crate::{config::settings, error::ConnectorError, transform::rename_all};
use engine_core::{
    connectors::{Transform, TransformFactory},
    error::{PluginError, ValidationError},
    registry::Registry,
};
use model::{
    core::{
        utils::{format_timestamp, parse_timestamp},
        value::Value,
    },
    execution::step::ConfigMap,
    records::{dataset::Dataset, row::RowData},
};
use serde::Deserialize;
use std::cmp::Ordering;
use tracing::info;

pub const KEY: &str = "technical_indicators";

const REQUIRED_COLUMNS: [&str; 6] = ["close", "date", "high", "low", "open", "volume"];
const NUMERIC_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

pub const SMA_COLUMN: &str = "sma_50";
pub const RSI_COLUMN: &str = "rsi_14";
pub const BB_UPPER_COLUMN: &str = "bb_upper";
pub const BB_LOWER_COLUMN: &str = "bb_lower";
pub const MACD_COLUMN: &str = "macd";
pub const MACD_SIGNAL_COLUMN: &str = "macd_signal";
pub const MACD_HISTOGRAM_COLUMN: &str = "macd_histogram";

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorSettings {
    #[serde(default = "IndicatorSettings::default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "IndicatorSettings::default_sma_period")]
    pub sma_period: usize,
    #[serde(default = "IndicatorSettings::default_bb_period")]
    pub bb_period: usize,
    #[serde(default = "IndicatorSettings::default_bb_std")]
    pub bb_std: f64,
    #[serde(default = "IndicatorSettings::default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "IndicatorSettings::default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "IndicatorSettings::default_macd_signal")]
    pub macd_signal: usize,
}

impl IndicatorSettings {
    fn default_rsi_period() -> usize {
        14
    }
    fn default_sma_period() -> usize {
        50
    }
    fn default_bb_period() -> usize {
        20
    }
    fn default_bb_std() -> f64 {
        2.0
    }
    fn default_macd_fast() -> usize {
        12
    }
    fn default_macd_slow() -> usize {
        26
    }
    fn default_macd_signal() -> usize {
        9
    }
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        IndicatorSettings {
            rsi_period: Self::default_rsi_period(),
            sma_period: Self::default_sma_period(),
            bb_period: Self::default_bb_period(),
            bb_std: Self::default_bb_std(),
            macd_fast: Self::default_macd_fast(),
            macd_slow: Self::default_macd_slow(),
            macd_signal: Self::default_macd_signal(),
        }
    }
}

/// Adds trend and momentum indicators to daily OHLCV bars.
///
/// Output is sorted by date, and every row still warming up a rolling window is dropped,
/// so the sink only ever sees complete indicator rows.
pub struct TechnicalIndicators {
    settings: IndicatorSettings,
}

impl TechnicalIndicators {
    pub fn new(settings: IndicatorSettings) -> Result<Self, ConnectorError> {
        let periods = [
            ("rsi_period", settings.rsi_period),
            ("sma_period", settings.sma_period),
            ("bb_period", settings.bb_period),
            ("macd_fast", settings.macd_fast),
            ("macd_slow", settings.macd_slow),
            ("macd_signal", settings.macd_signal),
        ];
        for (name, period) in periods {
            if period == 0 {
                return Err(ConnectorError::invalid_config(
                    KEY,
                    format!("{name} must be at least 1"),
                ));
            }
        }
        if !settings.bb_std.is_finite() {
            return Err(ConnectorError::invalid_config(KEY, "bb_std must be finite"));
        }
        Ok(TechnicalIndicators { settings })
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }
}

impl Transform for TechnicalIndicators {
    fn name(&self) -> &str {
        KEY
    }

    fn validate(&self, dataset: &Dataset) -> Result<(), ValidationError> {
        let present: Vec<String> = dataset.columns().iter().map(|c| c.to_lowercase()).collect();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|required| !present.iter().any(|c| c == required))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(
                KEY,
                format!("requires columns {REQUIRED_COLUMNS:?}. Missing: {missing:?}"),
            ))
        }
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset, PluginError> {
        let mut ds = rename_all(dataset, |c| c.to_lowercase());

        let mut unparseable: Option<String> = None;
        ds.map_column("date", |value| match normalize_date(value) {
            Some(v) => v,
            None => {
                unparseable.get_or_insert_with(|| value.to_string());
                Value::Null
            }
        });
        if let Some(raw) = unparseable {
            return Err(PluginError::Other(format!(
                "{KEY}: cannot parse date '{raw}'"
            )));
        }

        for column in NUMERIC_COLUMNS {
            ds.map_column(column, |value| {
                value
                    .as_f64()
                    .filter(|v| !v.is_nan())
                    .map(Value::Float)
                    .unwrap_or(Value::Null)
            });
        }

        let mut columns = ds.columns().to_vec();
        let mut rows = ds.into_rows();
        rows.sort_by(by_date);
        let rows_before = rows.len();

        let close: Vec<Option<f64>> = rows.iter().map(|r| r.get_value("close").as_f64()).collect();
        let s = &self.settings;

        let sma_values = sma(&close, s.sma_period);
        let rsi_values = rsi(&close, s.rsi_period);
        let (bb_upper, bb_lower) = bollinger(&close, s.bb_period, s.bb_std);
        let (macd_line, signal_line, histogram) =
            macd(&close, s.macd_fast, s.macd_slow, s.macd_signal);

        let computed = [
            (SMA_COLUMN, sma_values),
            (RSI_COLUMN, rsi_values),
            (BB_UPPER_COLUMN, bb_upper),
            (BB_LOWER_COLUMN, bb_lower),
            (MACD_COLUMN, macd_line),
            (MACD_SIGNAL_COLUMN, signal_line),
            (MACD_HISTOGRAM_COLUMN, histogram),
        ];
        for (name, values) in &computed {
            columns.push(name.to_string());
            for (row, value) in rows.iter_mut().zip(values) {
                row.set(*name, value.map(Value::Float).unwrap_or(Value::Null));
            }
        }

        let mut result = Dataset::new(columns, rows);
        let all_columns = result.columns().to_vec();
        result.retain_rows(|row| {
            all_columns
                .iter()
                .all(|c| row.get(c).is_some_and(|v| !v.is_missing()))
        });

        info!(
            transform = KEY,
            rows_before,
            rows_after = result.len(),
            warmup_dropped = rows_before - result.len(),
            "Indicators computed"
        );
        Ok(result)
    }
}

/// `Some(Null)` for missing dates, `None` when the value cannot be read as a date.
fn normalize_date(value: &Value) -> Option<Value> {
    let ts = match value {
        v if v.is_missing() => return Some(Value::Null),
        Value::Timestamp(ts) => *ts,
        Value::Date(d) => d.and_hms_opt(0, 0, 0)?.and_utc(),
        Value::String(s) => parse_timestamp(s)?,
        Value::Int(v) => parse_timestamp(&v.to_string())?,
        _ => return None,
    };
    Some(Value::String(format_timestamp(&ts)))
}

/// Dates are uniform ISO strings at this point, so string order is chronological.
/// Rows without a date sort last.
fn by_date(a: &RowData, b: &RowData) -> Ordering {
    match (a.get("date").and_then(Value::as_str), b.get("date").and_then(Value::as_str)) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rolling mean over a full window; any gap inside the window yields `None`.
pub fn sma(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        Some(window.iter().sum::<f64>() / window.len() as f64)
    })
}

/// Rolling sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |window| {
        let n = window.len();
        if n < 2 {
            return None;
        }
        let mean = window.iter().sum::<f64>() / n as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(var.sqrt())
    })
}

fn rolling<F>(values: &[Option<f64>], period: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window: Option<Vec<f64>> = values[i + 1 - period..=i].iter().copied().collect();
            window.and_then(|w| reduce(&w))
        })
        .collect()
}

/// Recursive exponential average `y = (1 - alpha) * y_prev + alpha * x`, seeded with the first
/// observation. Values appear once `min_periods` observations have been seen.
pub fn ewm(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let mut state: Option<f64> = None;
    let mut seen = 0usize;
    values
        .iter()
        .map(|value| {
            let x = (*value)?;
            seen += 1;
            let next = match state {
                None => x,
                Some(prev) => (1.0 - alpha) * prev + alpha * x,
            };
            state = Some(next);
            (seen >= min_periods).then_some(next)
        })
        .collect()
}

fn ema(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    ewm(values, 2.0 / (span as f64 + 1.0), 1)
}

/// Wilder's RSI. A window with no losses reads 100; a flat window has no value.
pub fn rsi(close: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let delta: Vec<Option<f64>> = (0..close.len())
        .map(|i| match (i.checked_sub(1).and_then(|p| close[p]), close[i]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        })
        .collect();
    let gains: Vec<Option<f64>> = delta.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let losses: Vec<Option<f64>> = delta.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm(&gains, alpha, period);
    let avg_loss = ewm(&losses, alpha, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(gain, loss)| match ((*gain)?, (*loss)?) {
            (g, l) if l == 0.0 && g == 0.0 => None,
            (_, l) if l == 0.0 => Some(100.0),
            (g, l) => Some(100.0 - 100.0 / (1.0 + g / l)),
        })
        .collect()
}

pub fn bollinger(
    close: &[Option<f64>],
    period: usize,
    num_std: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mid = sma(close, period);
    let std = rolling_std(close, period);
    mid.iter()
        .zip(&std)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => (Some(m + num_std * s), Some(m - num_std * s)),
            _ => (None, None),
        })
        .unzip()
}

pub fn macd(
    close: &[Option<f64>],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();
    (line, signal_line, histogram)
}

pub struct TechnicalIndicatorsFactory;

impl TransformFactory for TechnicalIndicatorsFactory {
    fn label(&self) -> &str {
        "TechnicalIndicatorTransform"
    }

    fn create(
        &self,
        config: ConfigMap,
        _registry: &Registry,
    ) -> Result<Box<dyn Transform>, PluginError> {
        Ok(Box::new(TechnicalIndicators::new(settings(KEY, config)?)?))
    }
}
