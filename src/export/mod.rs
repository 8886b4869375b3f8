// Sensor data export: formats, file naming and split exports.

pub mod excel;
pub mod history;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::TridashError;
use crate::api::{ApiClient, DataScope};
use crate::filters::{DataFilters, DataQuery, SortOrder};
use crate::race::TimeRange;

pub use history::{ExportHistory, ExportRecord, MAX_HISTORY_ENTRIES};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Excel,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Excel];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "xlsx",
        }
    }

    /// Format requested from the API. There is no server side Excel export.
    pub fn wire_format(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json | ExportFormat::Excel => "json",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Excel => "Excel",
        }
    }
}

pub fn file_name(prefix: &str, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Name of one file of a split export, `part` counts from 1.
pub fn part_file_name(
    prefix: &str,
    format: ExportFormat,
    part: usize,
    window_start: DateTime<Utc>,
) -> String {
    format!(
        "{}_part{:02}_{}.{}",
        prefix,
        part,
        window_start.format("%Y%m%d"),
        format.extension()
    )
}

/// Cuts `range` into consecutive windows of `days` days, the last one shortened to fit.
pub fn split_windows(range: &TimeRange, days: u32) -> Vec<TimeRange> {
    let step = Duration::days(i64::from(days.max(1)));
    let mut windows = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = (start + step).min(range.end);
        windows.push(TimeRange { start, end });
        start = end;
    }
    windows
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportJob {
    pub scope: DataScope,
    pub filters: DataFilters,
    pub order: SortOrder,
    pub format: ExportFormat,
    /// Split into files of this many days. Needs both a start and an end date.
    pub split_days: Option<u32>,
}

impl ExportJob {
    /// The list of (file name, query) pairs this job downloads, in request order.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<Vec<(String, DataQuery)>, TridashError> {
        let prefix = self.scope.file_prefix();
        let Some(days) = self.split_days else {
            return Ok(vec![(
                file_name(&prefix, self.format, now),
                DataQuery::unpaged(self.filters.clone(), self.order),
            )]);
        };

        let (Some(start), Some(end)) = (self.filters.start_date, self.filters.end_date) else {
            return Err(TridashError::InvalidUserInput {
                field: "date range".to_string(),
                reason: "split exports need both a start and an end date".to_string(),
            });
        };
        let range = TimeRange::new(start, end).ok_or_else(|| TridashError::InvalidUserInput {
            field: "date range".to_string(),
            reason: "end date must be after start date".to_string(),
        })?;

        // Both bounds are inclusive on the API side, so every window but the last stops one
        // second short of the next one.
        let windows = split_windows(&range, days);
        let last = windows.len().saturating_sub(1);
        Ok(windows
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                let end = if index == last {
                    window.end
                } else {
                    window.end - Duration::seconds(1)
                };
                let filters = DataFilters {
                    start_date: Some(window.start),
                    end_date: Some(end),
                    ..self.filters.clone()
                };
                (
                    part_file_name(&prefix, self.format, index + 1, window.start),
                    DataQuery::unpaged(filters, self.order),
                )
            })
            .collect())
    }
}

/// Converts a downloaded body into the bytes written to disk, counting rows where possible.
pub fn render(format: ExportFormat, body: Vec<u8>) -> Result<(Vec<u8>, Option<u64>), TridashError> {
    match format {
        ExportFormat::Csv => {
            let rows = body.iter().filter(|b| **b == b'\n').count() as u64;
            let ends_with_newline = body.last() == Some(&b'\n');
            let lines = if ends_with_newline || body.is_empty() { rows } else { rows + 1 };
            Ok((body, Some(lines.saturating_sub(1))))
        }
        ExportFormat::Json => {
            let rows = excel::parse_samples(&body).ok().map(|s| s.len() as u64);
            Ok((body, rows))
        }
        ExportFormat::Excel => {
            let samples = excel::parse_samples(&body)?;
            let rows = samples.len() as u64;
            Ok((excel::workbook_bytes(&samples)?, Some(rows)))
        }
    }
}

/// Runs an export one request at a time, pausing `delay` between requests, and writes every
/// file into `output_dir`. Stops at the first failure; files already written are kept.
pub async fn run_export(
    client: &ApiClient,
    job: &ExportJob,
    output_dir: &Path,
    delay: StdDuration,
    now: DateTime<Utc>,
) -> Result<Vec<ExportRecord>, TridashError> {
    let plan = job.plan(now)?;
    fs::create_dir_all(output_dir).map_err(|e| TridashError::ExportIOError { source: e })?;

    let mut records = Vec::with_capacity(plan.len());
    for (index, (file_name, query)) in plan.iter().enumerate() {
        if index > 0 {
            debug!("Waiting {:?} before next export request", delay);
            tokio::time::sleep(delay).await;
        }
        let body = client.export_data(&job.scope, query, job.format).await?;
        let (bytes, rows) = render(job.format, body)?;
        let path: PathBuf = output_dir.join(file_name);
        fs::write(&path, &bytes).map_err(|e| TridashError::ExportIOError { source: e })?;
        info!("Exported {} ({} of {})", path.display(), index + 1, plan.len());
        records.push(ExportRecord {
            file_name: file_name.clone(),
            path,
            format: job.format,
            exported_at: Utc::now(),
            rows,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SensorSample;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_file_names() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 7).unwrap();
        assert_eq!(
            file_name("my_sensor_data", ExportFormat::Excel, now),
            "my_sensor_data_20240601_090507.xlsx"
        );
        assert_eq!(
            part_file_name("my_sensor_data", ExportFormat::Csv, 3, now),
            "my_sensor_data_part03_20240601.csv"
        );
    }

    #[test]
    fn test_split_windows_cover_range() {
        let range = TimeRange::new(at(1, 12), at(4, 0)).unwrap();
        let windows = split_windows(&range, 1);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start, at(1, 12));
        assert_eq!(windows[0].end, at(2, 12));
        assert_eq!(windows[2].end, at(4, 0));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_plan_without_split_is_single_file() {
        let job = ExportJob {
            scope: DataScope::Own,
            filters: DataFilters::default(),
            order: SortOrder::Asc,
            format: ExportFormat::Json,
            split_days: None,
        };
        let plan = job.plan(at(1, 0)).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].1.pagination.is_none());
    }

    #[test]
    fn test_split_plan_needs_dates() {
        let mut job = ExportJob {
            scope: DataScope::User("7".to_string()),
            filters: DataFilters::default(),
            order: SortOrder::Asc,
            format: ExportFormat::Csv,
            split_days: Some(1),
        };
        assert!(matches!(
            job.plan(at(1, 0)),
            Err(TridashError::InvalidUserInput { .. })
        ));

        job.filters.start_date = Some(at(1, 0));
        job.filters.end_date = Some(at(3, 0));
        let plan = job.plan(at(5, 0)).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].0, "user_7_sensor_data_part02_20240602.csv");
        assert_eq!(plan[1].1.filters.start_date, Some(at(2, 0)));
        assert_eq!(plan[1].1.filters.end_date, Some(at(3, 0)));
        assert_eq!(
            plan[0].1.filters.end_date,
            Some(at(2, 0) - Duration::seconds(1))
        );
    }

    #[test]
    fn test_boundary_sample_lands_in_one_part() {
        let job = ExportJob {
            scope: DataScope::Own,
            filters: DataFilters {
                start_date: Some(at(1, 0)),
                end_date: Some(at(3, 0)),
                ..Default::default()
            },
            order: SortOrder::Asc,
            format: ExportFormat::Csv,
            split_days: Some(1),
        };
        let plan = job.plan(at(5, 0)).unwrap();
        for ts in [at(1, 0), at(2, 0), at(3, 0)] {
            let sample = SensorSample::new(ts, "S1");
            let parts: Vec<&str> = plan
                .iter()
                .filter(|(_, query)| query.filters.matches(&sample))
                .map(|(name, _)| name.as_str())
                .collect();
            assert_eq!(parts.len(), 1, "{ts} matched {parts:?}");
        }
    }

    #[test]
    fn test_render_counts_csv_rows() {
        let body = b"timestamp,sensor_id\n2024-06-01T08:00:00,S1\n2024-06-01T08:01:00,S1\n".to_vec();
        let (bytes, rows) = render(ExportFormat::Csv, body.clone()).unwrap();
        assert_eq!(bytes, body);
        assert_eq!(rows, Some(2));

        let (_, rows) = render(ExportFormat::Csv, b"timestamp\nx".to_vec()).unwrap();
        assert_eq!(rows, Some(1));
    }
}
