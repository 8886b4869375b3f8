// Race window derivation and chart formatting through the public API

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tridash::chart::AxisSide;
use tridash::i18n::Locale;
use tridash::model::{Dimension, Reading};
use tridash::race::{derive_segments, derive_time_range};
use tridash::{
    RaceRecord, SegmentKind, SensorSample, TimeRange, derive_race_window, format_chart_data,
};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 14, hour, minute, 0).unwrap()
}

fn sprint_record() -> RaceRecord {
    RaceRecord {
        swim_start: Some(at(7, 0)),
        swim_finish: Some(at(7, 20)),
        bike_start: Some(at(7, 23)),
        bike_finish: Some(at(8, 30)),
        run_start: Some(at(8, 32)),
        run_finish: Some(at(9, 5)),
    }
}

#[test]
fn test_full_race_at_zero_offset() {
    let window = derive_race_window(Some(&sprint_record()), 0, at(12, 0));
    assert_eq!(window.range, TimeRange::new(at(7, 0), at(9, 5)));
    let kinds: Vec<SegmentKind> = window.segments.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SegmentKind::Swim, SegmentKind::Bike, SegmentKind::Run]);
    assert_eq!(window.segments[2].end, at(9, 5));
}

#[test]
fn test_missing_finishes_are_filled_from_next_start() {
    let record = RaceRecord {
        swim_finish: None,
        bike_finish: None,
        run_finish: None,
        ..sprint_record()
    };
    let now = at(8, 50);
    let window = derive_race_window(Some(&record), 10, now);
    let range = window.range.unwrap();
    assert_eq!(range.start, at(6, 50));
    assert_eq!(range.end, now);

    assert_eq!(window.segments[0].end, at(7, 23));
    assert_eq!(window.segments[1].end, at(8, 32));
    // an unfinished run reaches the edge of the window
    assert_eq!(window.segments[2].end, range.end);
}

#[test]
fn test_no_record_shows_last_hour() {
    let now = at(10, 0);
    let range = derive_time_range(None, 30, now).unwrap();
    assert_eq!(range.end, now);
    assert_eq!(range.start, now - Duration::hours(1));
    assert!(derive_race_window(None, 30, now).segments.is_empty());
}

#[test]
fn test_record_without_swim_start_has_no_range() {
    let record = RaceRecord {
        swim_start: None,
        ..sprint_record()
    };
    let window = derive_race_window(Some(&record), 5, at(12, 0));
    assert!(window.range.is_none());
    assert!(window.segments.is_empty());
}

#[test]
fn test_segments_outside_canvas_are_dropped_and_partial_ones_truncated() {
    let canvas = TimeRange::new(at(7, 10), at(8, 0)).unwrap();
    let record = RaceRecord {
        swim_start: Some(at(6, 0)),
        swim_finish: Some(at(6, 30)),
        bike_start: Some(at(7, 0)),
        bike_finish: Some(at(7, 40)),
        run_start: Some(at(7, 50)),
        run_finish: Some(at(9, 0)),
    };
    let segments = derive_segments(&record, &canvas);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].kind, SegmentKind::Bike);
    assert_eq!((segments[0].start, segments[0].end), (at(7, 10), at(7, 40)));
    assert_eq!(segments[1].kind, SegmentKind::Run);
    assert_eq!((segments[1].start, segments[1].end), (at(7, 50), at(8, 0)));
}

#[test]
fn test_overlapping_legs_are_not_corrected() {
    let record = RaceRecord {
        swim_finish: Some(at(7, 40)),
        ..sprint_record()
    };
    let window = derive_race_window(Some(&record), 0, at(12, 0));
    assert_eq!(window.segments[0].end, at(7, 40));
    assert!(window.segments[0].end > window.segments[1].start);
}

#[test]
fn test_two_skin_temperature_samples() {
    let samples = vec![
        SensorSample {
            skin_temperature: Some(36.5),
            ..SensorSample::new(at(7, 0), "S1")
        },
        SensorSample {
            skin_temperature: Some(36.8),
            ..SensorSample::new(at(7, 1), "S1")
        },
    ];
    let chart = format_chart_data(&samples, Locale::English);
    assert_eq!(chart.series.len(), 1);
    let series = &chart.series[0];
    assert_eq!(series.dimension, Dimension::SkinTemperature);
    assert_eq!(series.label, "Skin temperature");
    assert_eq!(series.values(), vec![36.5, 36.8]);
    assert!(chart.series_for(Dimension::HeartRate).is_none());
}

#[test]
fn test_heart_rate_goes_on_the_right_axis() {
    let samples = vec![
        SensorSample {
            heart_rate: Some(150.),
            core_temperature: Some(38.2),
            ..SensorSample::new(at(7, 0), "S1")
        },
        SensorSample {
            core_temperature: Some(38.4),
            ..SensorSample::new(at(7, 1), "S1")
        },
    ];
    let chart = format_chart_data(&samples, Locale::Japanese);
    let heart_rate = chart.series_for(Dimension::HeartRate).unwrap();
    assert_eq!(heart_rate.axis, AxisSide::Right);
    assert_eq!(heart_rate.label, "心拍数");
    assert_eq!(heart_rate.points[1].reading, Reading::Absent);
    assert_eq!(
        chart.series_for(Dimension::CoreTemperature).unwrap().axis,
        AxisSide::Left
    );
    assert_eq!(chart.axis(AxisSide::Right).suggested_max, 200.);
    assert_eq!(chart.axis(AxisSide::Left).suggested_min, 25.);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_zero_offset_range_matches_race(duration in 30i64..600) {
        let record = RaceRecord {
            swim_start: Some(at(6, 0)),
            run_finish: Some(at(6, 0) + Duration::minutes(duration)),
            ..RaceRecord::default()
        };
        let range = derive_time_range(Some(&record), 0, at(23, 0)).unwrap();
        prop_assert_eq!(range.start, at(6, 0));
        prop_assert_eq!(range.end, at(6, 0) + Duration::minutes(duration));
    }

    #[test]
    fn prop_swim_ends_at_bike_start_when_unfinished(
        swim in 1i64..90,
        transition in 0i64..15,
        offset in 0u32..60,
    ) {
        let bike_start = at(6, 0) + Duration::minutes(swim + transition);
        let record = RaceRecord {
            swim_start: Some(at(6, 0)),
            bike_start: Some(bike_start),
            ..RaceRecord::default()
        };
        let window = derive_race_window(Some(&record), offset, at(23, 0));
        let swim_segment = &window.segments[0];
        prop_assert_eq!(swim_segment.kind, SegmentKind::Swim);
        prop_assert_eq!(swim_segment.end, bike_start);
    }

    #[test]
    fn prop_series_exist_only_for_reported_dimensions(
        readings in prop::collection::vec(
            (prop::option::of(30.0f64..40.0), prop::option::of(60.0f64..200.0)),
            0..20,
        ),
    ) {
        let samples: Vec<SensorSample> = readings
            .iter()
            .enumerate()
            .map(|(i, (skin, heart_rate))| SensorSample {
                skin_temperature: *skin,
                heart_rate: *heart_rate,
                ..SensorSample::new(at(6, 0) + Duration::seconds(i as i64), "S1")
            })
            .collect();
        let chart = format_chart_data(&samples, Locale::English);
        let any_heart_rate = readings.iter().any(|(_, hr)| hr.is_some());
        let any_skin = readings.iter().any(|(skin, _)| skin.is_some());
        prop_assert_eq!(chart.series_for(Dimension::HeartRate).is_some(), any_heart_rate);
        prop_assert_eq!(chart.series_for(Dimension::SkinTemperature).is_some(), any_skin);
        prop_assert!(chart.series_for(Dimension::Wbgt).is_none());
        for series in &chart.series {
            prop_assert_eq!(series.points.len(), samples.len());
        }
    }
}
