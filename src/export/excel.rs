use rust_xlsxwriter::{Format, Workbook};
use serde::Deserialize;

use crate::TridashError;
use crate::model::{Dimension, SensorSample};
use crate::timestamp;

const SHEET_NAME: &str = "Sensor data";

#[derive(Deserialize)]
#[serde(untagged)]
enum ExportBody {
    Rows(Vec<SensorSample>),
    Wrapped { data: Vec<SensorSample> },
}

/// Reads a JSON export body, either a bare array or `{"data": [...]}`.
pub fn parse_samples(body: &[u8]) -> Result<Vec<SensorSample>, TridashError> {
    let parsed: ExportBody = serde_json::from_slice(body)
        .map_err(|e| TridashError::ResponseDecodeError { source: e })?;
    Ok(match parsed {
        ExportBody::Rows(rows) => rows,
        ExportBody::Wrapped { data } => data,
    })
}

pub fn workbook_bytes(samples: &[SensorSample]) -> Result<Vec<u8>, TridashError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| TridashError::ExcelError { source: e })?;

    let mut headers = vec!["timestamp", "sensor_id", "user_id"];
    headers.extend(Dimension::ALL.iter().map(|d| d.field_name()));
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(|e| TridashError::ExcelError { source: e })?;
    }

    for (index, sample) in samples.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet
            .write_string(row, 0, timestamp::to_display_string(&sample.timestamp))
            .map_err(|e| TridashError::ExcelError { source: e })?;
        worksheet
            .write_string(row, 1, &sample.sensor_id)
            .map_err(|e| TridashError::ExcelError { source: e })?;
        if let Some(user_id) = &sample.user_id {
            worksheet
                .write_string(row, 2, user_id)
                .map_err(|e| TridashError::ExcelError { source: e })?;
        }
        for (offset, dimension) in Dimension::ALL.iter().enumerate() {
            // absent readings stay as empty cells
            if let Some(value) = sample.reading(*dimension).value() {
                worksheet
                    .write_number(row, 3 + offset as u16, value)
                    .map_err(|e| TridashError::ExcelError { source: e })?;
            }
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| TridashError::ExcelError { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_body_shapes() {
        let bare = br#"[{"timestamp": "2024-06-01T08:00:00", "sensor_id": "S1", "heart_rate": 120}]"#;
        let wrapped = br#"{"data": [{"timestamp": "2024-06-01T08:00:00", "sensor_id": "S1"}], "total": 1}"#;
        assert_eq!(parse_samples(bare).unwrap()[0].heart_rate, Some(120.));
        assert_eq!(parse_samples(wrapped).unwrap().len(), 1);
        assert!(parse_samples(b"not json").is_err());
    }

    #[test]
    fn test_workbook_is_a_zip_archive() {
        let samples = parse_samples(
            br#"[{"timestamp": "2024-06-01T08:00:00", "sensor_id": "S1", "skin_temperature": 36.5}]"#,
        )
        .unwrap();
        let bytes = workbook_bytes(&samples).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
