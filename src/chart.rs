// Turns fetched sensor samples into chart series.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::i18n::{Locale, Text};
use crate::model::{Dimension, Reading, SensorSample};

pub const TEMPERATURE_MIN_C: f64 = 25.;
pub const TEMPERATURE_MAX_C: f64 = 40.;
pub const HEART_RATE_MIN_BPM: f64 = 60.;
pub const HEART_RATE_MAX_BPM: f64 = 200.;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AxisSide {
    Left,
    Right,
}

impl AxisSide {
    pub fn for_dimension(dimension: Dimension) -> Self {
        if dimension.is_temperature() {
            AxisSide::Left
        } else {
            AxisSide::Right
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Axis {
    pub side: AxisSide,
    pub label: String,
    pub suggested_min: f64,
    pub suggested_max: f64,
}

impl Axis {
    fn span(&self) -> f64 {
        self.suggested_max - self.suggested_min
    }

    /// Maps `value` on this axis to the equivalent position on `other`, used to draw a
    /// secondary axis series on a plot that only has one Y scale.
    pub fn project_onto(&self, other: &Axis, value: f64) -> f64 {
        other.suggested_min + (value - self.suggested_min) * other.span() / self.span()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub reading: Reading,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub dimension: Dimension,
    pub label: String,
    pub axis: AxisSide,
    pub points: Vec<ChartPoint>,
}

impl Series {
    /// Present values in input order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.reading.value()).collect()
    }

    /// `[seconds since origin, value]` pairs, absent readings skipped.
    pub fn plot_points(&self, origin: DateTime<Utc>) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .filter_map(|p| {
                let value = p.reading.value()?;
                let x = (p.timestamp - origin).num_milliseconds() as f64 / 1000.;
                Some([x, value])
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartData {
    pub series: Vec<Series>,
    pub temperature_axis: Axis,
    pub heart_rate_axis: Axis,
}

impl ChartData {
    pub fn series_for(&self, dimension: Dimension) -> Option<&Series> {
        self.series.iter().find(|s| s.dimension == dimension)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn axis(&self, side: AxisSide) -> &Axis {
        match side {
            AxisSide::Left => &self.temperature_axis,
            AxisSide::Right => &self.heart_rate_axis,
        }
    }
}

/// Builds one series per dimension that at least one sample reports. Dimensions that never
/// appear produce no series at all.
pub fn format_chart_data(samples: &[SensorSample], locale: Locale) -> ChartData {
    let series = Dimension::ALL
        .iter()
        .filter(|dimension| samples.iter().any(|s| s.reading(**dimension).is_present()))
        .map(|dimension| Series {
            dimension: *dimension,
            label: locale.text(dimension.label()).to_string(),
            axis: AxisSide::for_dimension(*dimension),
            points: samples
                .iter()
                .map(|s| ChartPoint {
                    timestamp: s.timestamp,
                    reading: s.reading(*dimension),
                })
                .collect_vec(),
        })
        .collect_vec();

    ChartData {
        series,
        temperature_axis: Axis {
            side: AxisSide::Left,
            label: locale.text(Text::TemperatureAxis).to_string(),
            suggested_min: TEMPERATURE_MIN_C,
            suggested_max: TEMPERATURE_MAX_C,
        },
        heart_rate_axis: Axis {
            side: AxisSide::Right,
            label: locale.text(Text::HeartRateAxis).to_string(),
            suggested_min: HEART_RATE_MIN_BPM,
            suggested_max: HEART_RATE_MAX_BPM,
        },
    }
}
