// Race time window and swim/bike/run overlays for the feedback chart.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::i18n::Text;
use crate::model::RaceRecord;

/// Window shown when a competitor has no race record at all.
pub const DEFAULT_WINDOW_MINUTES: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "crate::timestamp::required")]
    pub start: DateTime<Utc>,
    #[serde(with = "crate::timestamp::required")]
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Returns `None` for empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn last_hour(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::minutes(DEFAULT_WINDOW_MINUTES),
            end: now,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts <= self.end
    }

    /// Truncates `[start, end]` to this range, `None` when nothing is left.
    pub fn clamp(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<TimeRange> {
        TimeRange::new(start.max(self.start), end.min(self.end))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    Swim,
    Bike,
    Run,
}

impl SegmentKind {
    /// Emission order, which is also the draw order.
    pub const ORDER: [SegmentKind; 3] = [SegmentKind::Swim, SegmentKind::Bike, SegmentKind::Run];

    pub fn color(self) -> SegmentColor {
        match self {
            SegmentKind::Swim => SegmentColor::rgba(54, 162, 235, 48),
            SegmentKind::Bike => SegmentColor::rgba(75, 192, 92, 48),
            SegmentKind::Run => SegmentColor::rgba(255, 159, 64, 48),
        }
    }

    pub fn label(self) -> Text {
        match self {
            SegmentKind::Swim => Text::Swim,
            SegmentKind::Bike => Text::Bike,
            SegmentKind::Run => Text::Run,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SegmentColor {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    #[serde(with = "crate::timestamp::required")]
    pub start: DateTime<Utc>,
    #[serde(with = "crate::timestamp::required")]
    pub end: DateTime<Utc>,
    pub color: SegmentColor,
}

/// Chart X bounds plus the overlays to shade inside them.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceWindow {
    pub range: Option<TimeRange>,
    pub segments: Vec<Segment>,
}

/// Fills missing leg finishes from the next leg's start. A missing run finish is left alone, the
/// run extends to the window edge instead.
pub fn gap_filled(record: &RaceRecord) -> RaceRecord {
    RaceRecord {
        swim_finish: record.swim_finish.or(record.bike_start),
        bike_finish: record.bike_finish.or(record.run_start),
        ..record.clone()
    }
}

/// Computes the chart X bounds for a race.
///
/// Without a record the last hour before `now` is shown. With a record the window spans
/// `swim_start - offset` to `run_finish + offset`, or to `now` while the run has no finish.
/// A record without `swim_start` has no usable window.
pub fn derive_time_range(
    record: Option<&RaceRecord>,
    offset_minutes: u32,
    now: DateTime<Utc>,
) -> Option<TimeRange> {
    let Some(record) = record else {
        return Some(TimeRange::last_hour(now));
    };
    let offset = Duration::minutes(i64::from(offset_minutes));
    let start = record.swim_start? - offset;
    let end = match gap_filled(record).run_finish {
        Some(run_finish) => run_finish + offset,
        None => now,
    };
    TimeRange::new(start, end)
}

/// Builds the swim, bike and run overlays clamped to `canvas`.
///
/// Legs without a start, or without an end after gap filling, are skipped, as are legs that
/// fall entirely outside the canvas. Overlapping legs are kept as is.
pub fn derive_segments(record: &RaceRecord, canvas: &TimeRange) -> Vec<Segment> {
    let filled = gap_filled(record);
    SegmentKind::ORDER
        .iter()
        .filter_map(|kind| {
            let (start, end) = match kind {
                SegmentKind::Swim => (filled.swim_start?, filled.swim_finish?),
                SegmentKind::Bike => (filled.bike_start?, filled.bike_finish?),
                SegmentKind::Run => (filled.run_start?, filled.run_finish.unwrap_or(canvas.end)),
            };
            let visible = canvas.clamp(start, end)?;
            Some(Segment {
                kind: *kind,
                start: visible.start,
                end: visible.end,
                color: kind.color(),
            })
        })
        .collect()
}

pub fn derive_race_window(
    record: Option<&RaceRecord>,
    offset_minutes: u32,
    now: DateTime<Utc>,
) -> RaceWindow {
    let range = derive_time_range(record, offset_minutes, now);
    let segments = match (record, range.as_ref()) {
        (Some(record), Some(canvas)) => derive_segments(record, canvas),
        _ => Vec::new(),
    };
    RaceWindow { range, segments }
}
