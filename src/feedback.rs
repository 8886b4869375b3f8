// Race feedback: a participant's sensor data for one competition, drawn over their race legs.

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::TridashError;
use crate::api::ApiClient;
use crate::chart::{ChartData, format_chart_data};
use crate::i18n::Locale;
use crate::model::{CompetitionRace, RaceRecord, SensorSample};
use crate::race::{RaceWindow, derive_race_window};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedbackData {
    pub sensor_data: Vec<SensorSample>,
    pub race_record: Option<RaceRecord>,
    pub competition: Option<CompetitionRace>,
}

impl FeedbackData {
    /// Parses every section on its own. A broken section is logged and left empty so the rest
    /// of the view can still render.
    pub fn from_value(mut value: Value) -> Self {
        let sensor_data = match value.get_mut("sensor_data").map(Value::take) {
            Some(Value::Object(mut wrapped)) => {
                section(wrapped.remove("data").unwrap_or(Value::Null), "sensor_data")
            }
            Some(rows) => section(rows, "sensor_data"),
            None => None,
        };
        Self {
            sensor_data: sensor_data.unwrap_or_default(),
            race_record: value
                .get_mut("race_record")
                .map(Value::take)
                .and_then(|v| section(v, "race_record")),
            competition: value
                .get_mut("competition")
                .map(Value::take)
                .and_then(|v| section(v, "competition")),
        }
    }
}

fn section<T: DeserializeOwned>(value: Value, name: &str) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring malformed {} in feedback payload: {}", name, e);
            None
        }
    }
}

pub async fn load_feedback(
    client: &ApiClient,
    competition_id: &str,
) -> Result<FeedbackData, TridashError> {
    Ok(FeedbackData::from_value(
        client.feedback_data(competition_id).await?,
    ))
}

/// Everything the feedback chart draws.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackChart {
    pub chart: ChartData,
    pub window: RaceWindow,
}

impl FeedbackChart {
    pub fn build(data: &FeedbackData, offset_minutes: u32, now: DateTime<Utc>, locale: Locale) -> Self {
        Self {
            chart: format_chart_data(&data.sensor_data, locale),
            window: derive_race_window(data.race_record.as_ref(), offset_minutes, now),
        }
    }

    /// False when the chart should show its "no data" state.
    pub fn has_data(&self) -> bool {
        self.window.range.is_some() && !self.chart.is_empty()
    }

    /// X origin of the plot, plot coordinates are seconds from here.
    pub fn origin(&self) -> Option<DateTime<Utc>> {
        self.window.range.map(|r| r.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dimension;
    use crate::race::SegmentKind;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let data = FeedbackData::from_value(json!({
            "sensor_data": [
                {"timestamp": "2024-06-01T08:10:00Z", "sensor_id": "S1", "core_temperature": 37.8},
                {"timestamp": "2024-06-01T08:20:00Z", "sensor_id": "S1", "core_temperature": 38.1}
            ],
            "race_record": {
                "swim_start": "2024-06-01T08:00:00Z",
                "bike_start": "2024-06-01T08:30:00Z",
                "run_start": "2024-06-01T09:30:00Z",
                "run_finish": "2024-06-01T10:00:00Z"
            },
            "competition": {"id": 1, "name": "Sprint", "date": "2024-06-01"}
        }));
        assert_eq!(data.sensor_data.len(), 2);
        assert!(data.race_record.is_some());
        assert_eq!(data.competition.as_ref().unwrap().name, "Sprint");

        let now = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        let chart = FeedbackChart::build(&data, 5, now, Locale::English);
        assert!(chart.has_data());
        assert_eq!(
            chart.origin(),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 7, 55, 0).unwrap())
        );
        assert_eq!(chart.window.segments.len(), 3);
        assert_eq!(chart.window.segments[0].kind, SegmentKind::Swim);
        assert!(chart.chart.series_for(Dimension::CoreTemperature).is_some());
    }

    #[test]
    fn test_broken_race_record_keeps_sensor_data() {
        let data = FeedbackData::from_value(json!({
            "sensor_data": {"data": [
                {"timestamp": "2024-06-01T08:10:00Z", "sensor_id": "S1", "heart_rate": 150}
            ]},
            "race_record": {"swim_start": "not a date"},
            "competition": null
        }));
        assert_eq!(data.sensor_data.len(), 1);
        assert!(data.race_record.is_none());
        assert!(data.competition.is_none());

        // no race record falls back to the last hour
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let chart = FeedbackChart::build(&data, 5, now, Locale::English);
        assert!(chart.has_data());
        assert!(chart.window.segments.is_empty());
    }

    #[test]
    fn test_broken_sensor_data_keeps_race_record() {
        let data = FeedbackData::from_value(json!({
            "sensor_data": "oops",
            "race_record": {"swim_start": "2024-06-01T08:00:00Z"}
        }));
        assert!(data.sensor_data.is_empty());
        assert!(data.race_record.is_some());
        let chart = FeedbackChart::build(&data, 0, Utc::now(), Locale::English);
        assert!(!chart.has_data());
    }
}
