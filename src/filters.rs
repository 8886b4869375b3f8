use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TridashError;
use crate::i18n::{Locale, Text};
use crate::model::SensorSample;
use crate::timestamp;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const PAGE_SIZE_CHOICES: [u32; 4] = [25, 50, 100, 200];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Optional constraints on sensor data, all combined with AND.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFilters {
    pub sensor_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub search: Option<String>,
}

impl DataFilters {
    pub fn is_empty(&self) -> bool {
        *self == DataFilters::default()
    }

    /// Client side check mirroring what the API applies. Temperature bounds refer to skin
    /// temperature, so a sample without one never passes a bound.
    pub fn matches(&self, sample: &SensorSample) -> bool {
        if let Some(sensor_id) = non_blank(&self.sensor_id)
            && sample.sensor_id != sensor_id
        {
            return false;
        }
        if let Some(start) = self.start_date
            && sample.timestamp < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && sample.timestamp > end
        {
            return false;
        }
        if self.min_temperature.is_some() || self.max_temperature.is_some() {
            let Some(temperature) = sample.skin_temperature else {
                return false;
            };
            if self.min_temperature.is_some_and(|min| temperature < min)
                || self.max_temperature.is_some_and(|max| temperature > max)
            {
                return false;
            }
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            let in_sensor = sample.sensor_id.to_lowercase().contains(&needle);
            let in_user = sample
                .user_id
                .as_ref()
                .is_some_and(|u| u.to_lowercase().contains(&needle));
            if !in_sensor && !in_user {
                return false;
            }
        }
        true
    }

    /// The set filters as `label: value` pairs, in form order.
    pub fn describe(&self, locale: Locale) -> Vec<String> {
        let dates = [
            (Text::StartDate, self.start_date),
            (Text::EndDate, self.end_date),
        ];
        let numbers = [
            (Text::MinTemperature, self.min_temperature),
            (Text::MaxTemperature, self.max_temperature),
        ];
        let mut parts = Vec::new();
        if let Some(sensor_id) = non_blank(&self.sensor_id) {
            parts.push(format!("{}: {}", locale.text(Text::SensorId), sensor_id));
        }
        for (label, value) in dates {
            if let Some(ts) = value {
                parts.push(format!(
                    "{}: {}",
                    locale.text(label),
                    timestamp::to_display_string(&ts)
                ));
            }
        }
        for (label, value) in numbers {
            if let Some(value) = value {
                parts.push(format!("{}: {:.1}°C", locale.text(label), value));
            }
        }
        if let Some(search) = non_blank(&self.search) {
            parts.push(format!("{}: {}", locale.text(Text::Search), search));
        }
        parts
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Filters as typed into text fields, before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterInput {
    pub sensor_id: String,
    pub start_date: String,
    pub end_date: String,
    pub min_temperature: String,
    pub max_temperature: String,
    pub search: String,
}

impl FilterInput {
    pub fn from_filters(filters: &DataFilters) -> Self {
        let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let date = |v: Option<DateTime<Utc>>| {
            v.map(|ts| timestamp::to_display_string(&ts))
                .unwrap_or_default()
        };
        Self {
            sensor_id: filters.sensor_id.clone().unwrap_or_default(),
            start_date: date(filters.start_date),
            end_date: date(filters.end_date),
            min_temperature: number(filters.min_temperature),
            max_temperature: number(filters.max_temperature),
            search: filters.search.clone().unwrap_or_default(),
        }
    }

    /// Blank fields mean "no constraint". A bare end date covers that whole day.
    pub fn parse(&self) -> Result<DataFilters, TridashError> {
        let start_date = parse_bound("start_date", &self.start_date, false)?;
        let end_date = parse_bound("end_date", &self.end_date, true)?;
        if let (Some(start), Some(end)) = (start_date, end_date)
            && start > end
        {
            return Err(invalid("end_date", "must not be before the start date"));
        }
        let min_temperature = parse_number("min_temperature", &self.min_temperature)?;
        let max_temperature = parse_number("max_temperature", &self.max_temperature)?;
        if let (Some(min), Some(max)) = (min_temperature, max_temperature)
            && min > max
        {
            return Err(invalid("max_temperature", "must not be below the minimum"));
        }
        Ok(DataFilters {
            sensor_id: text(&self.sensor_id),
            start_date,
            end_date,
            min_temperature,
            max_temperature,
            search: text(&self.search),
        })
    }
}

fn invalid(field: &str, reason: &str) -> TridashError {
    TridashError::InvalidUserInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

fn parse_bound(field: &str, raw: &str, end_of_day: bool) -> Result<Option<DateTime<Utc>>, TridashError> {
    let Some(raw) = text(raw) else {
        return Ok(None);
    };
    if end_of_day && let Some(date) = timestamp::parse_date(&raw) {
        return Ok(date.and_hms_opt(23, 59, 59).map(|naive| naive.and_utc()));
    }
    timestamp::parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| invalid(field, "expected a date like 2024-06-01 or 2024-06-01 08:30"))
}

fn parse_number(field: &str, raw: &str) -> Result<Option<f64>, TridashError> {
    let Some(raw) = text(raw) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(invalid(field, "expected a number")),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Zero based
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn total_pages(&self, total: u64) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        u32::try_from(total.div_ceil(u64::from(self.page_size))).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self, total: u64) -> bool {
        self.page + 1 < self.total_pages(total)
    }
}

/// Query parameters of the sensor data listing and export endpoints.
#[derive(Clone, Debug, PartialEq)]
pub struct DataQuery {
    pub filters: DataFilters,
    pub pagination: Option<Pagination>,
    pub order: SortOrder,
}

impl DataQuery {
    /// Query without paging, used by exports.
    pub fn unpaged(filters: DataFilters, order: SortOrder) -> Self {
        Self {
            filters,
            pagination: None,
            order,
        }
    }

    /// The API pages from 1.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let filters = &self.filters;
        let mut params = Vec::new();
        if let Some(sensor_id) = non_blank(&filters.sensor_id) {
            params.push(("sensor_id", sensor_id.to_string()));
        }
        if let Some(start) = &filters.start_date {
            params.push(("start_date", timestamp::to_query_string(start)));
        }
        if let Some(end) = &filters.end_date {
            params.push(("end_date", timestamp::to_query_string(end)));
        }
        if let Some(min) = filters.min_temperature {
            params.push(("min_temperature", min.to_string()));
        }
        if let Some(max) = filters.max_temperature {
            params.push(("max_temperature", max.to_string()));
        }
        if let Some(search) = non_blank(&filters.search) {
            params.push(("search", search.to_string()));
        }
        if let Some(pagination) = &self.pagination {
            params.push(("page", (pagination.page + 1).to_string()));
            params.push(("limit", pagination.page_size.to_string()));
        }
        params.push(("order", self.order.as_str().to_string()));
        params
    }
}

/// Filter, paging and ordering state of a data table. Every change that can alter which rows
/// exist sends the table back to the first page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    filters: DataFilters,
    pagination: Pagination,
    order: SortOrder,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            pagination: Pagination { page: 0, page_size },
            ..Default::default()
        }
    }

    pub fn filters(&self) -> &DataFilters {
        &self.filters
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Applies `change` to the filters, going back to page 0 if anything changed.
    /// Returns whether the filters changed.
    pub fn update(&mut self, change: impl FnOnce(&mut DataFilters)) -> bool {
        let before = self.filters.clone();
        change(&mut self.filters);
        let changed = before != self.filters;
        if changed {
            self.pagination.page = 0;
        }
        changed
    }

    pub fn replace_filters(&mut self, filters: DataFilters) -> bool {
        self.update(|current| *current = filters)
    }

    pub fn reset(&mut self) {
        self.filters = DataFilters::default();
        self.pagination.page = 0;
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.pagination.page_size = page_size.max(1);
        self.pagination.page = 0;
    }

    pub fn set_order(&mut self, order: SortOrder) {
        if order != self.order {
            self.order = order;
            self.pagination.page = 0;
        }
    }

    pub fn set_page(&mut self, page: u32) {
        self.pagination.page = page;
    }

    pub fn next_page(&mut self, total: u64) {
        if self.pagination.has_next(total) {
            self.pagination.page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        self.pagination.page = self.pagination.page.saturating_sub(1);
    }

    pub fn query(&self) -> DataQuery {
        DataQuery {
            filters: self.filters.clone(),
            pagination: Some(self.pagination),
            order: self.order,
        }
    }
}
