// Checks a user CSV locally before it is uploaded for bulk registration.

use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::TridashError;

pub const REQUIRED_COLUMNS: [&str; 2] = ["username", "password"];
pub const OPTIONAL_COLUMNS: [&str; 3] = ["email", "full_name", "sensor_id"];

#[derive(Clone, Debug, PartialEq)]
pub struct ImportRow {
    pub line: u64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub sensor_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RowProblem {
    pub line: u64,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportPreview {
    pub rows: Vec<ImportRow>,
    pub problems: Vec<RowProblem>,
    /// Header columns the server will ignore
    pub unknown_columns: Vec<String>,
}

impl ImportPreview {
    pub fn is_uploadable(&self) -> bool {
        self.problems.is_empty() && !self.rows.is_empty()
    }
}

struct Columns {
    username: usize,
    password: usize,
    email: Option<usize>,
    full_name: Option<usize>,
    sensor_id: Option<usize>,
}

fn cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Parses the CSV and reports per-line problems. Passwords are checked for presence only and
/// never kept. A missing required column fails the whole file.
pub fn preview_users_csv(bytes: &[u8]) -> Result<ImportPreview, TridashError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TridashError::CsvImportError { source: e })?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        position(name).ok_or_else(|| TridashError::InvalidUserInput {
            field: "CSV header".to_string(),
            reason: format!("missing required column '{}'", name),
        })
    };
    let columns = Columns {
        username: required("username")?,
        password: required("password")?,
        email: position("email"),
        full_name: position("full_name"),
        sensor_id: position("sensor_id"),
    };

    let mut preview = ImportPreview {
        unknown_columns: headers
            .iter()
            .filter(|h| {
                !REQUIRED_COLUMNS.contains(&h.as_str()) && !OPTIONAL_COLUMNS.contains(&h.as_str())
            })
            .cloned()
            .collect(),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record.map_err(|e| TridashError::CsvImportError { source: e })?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.iter().all(str::is_empty) {
            continue;
        }

        let Some(username) = cell(&record, Some(columns.username)) else {
            preview.problems.push(RowProblem {
                line,
                reason: "username is empty".to_string(),
            });
            continue;
        };
        if cell(&record, Some(columns.password)).is_none() {
            preview.problems.push(RowProblem {
                line,
                reason: format!("password is empty for '{}'", username),
            });
            continue;
        }
        if !seen.insert(username.clone()) {
            preview.problems.push(RowProblem {
                line,
                reason: format!("duplicate username '{}'", username),
            });
            continue;
        }

        preview.rows.push(ImportRow {
            line,
            username,
            email: cell(&record, columns.email),
            full_name: cell(&record, columns.full_name),
            sensor_id: cell(&record, columns.sensor_id),
        });
    }
    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_file() {
        let csv = "\u{feff}Username,Password,email,team\nalice,secret,alice@example.org,A\nbob,hunter2,,B\n";
        let preview = preview_users_csv(csv.as_bytes()).unwrap();
        assert!(preview.is_uploadable());
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.rows[0].email.as_deref(), Some("alice@example.org"));
        assert_eq!(preview.rows[1].email, None);
        assert_eq!(preview.rows[1].line, 3);
        assert_eq!(preview.unknown_columns, vec!["team".to_string()]);
    }

    #[test]
    fn test_missing_required_column() {
        let err = preview_users_csv(b"username,email\nalice,a@example.org\n").unwrap_err();
        match err {
            TridashError::InvalidUserInput { reason, .. } => assert!(reason.contains("password")),
            other => panic!("Expected InvalidUserInput, got {:?}", other),
        }
    }

    #[test]
    fn test_row_problems_are_reported_by_line() {
        let csv = "username,password\nalice,pw\n,pw\ncarol,\nalice,pw2\n\n";
        let preview = preview_users_csv(csv.as_bytes()).unwrap();
        assert!(!preview.is_uploadable());
        assert_eq!(preview.rows.len(), 1);
        let lines: Vec<u64> = preview.problems.iter().map(|p| p.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(preview.problems[2].reason.contains("duplicate"));
    }
}
