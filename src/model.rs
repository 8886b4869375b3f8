use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::i18n::Text;

/// A single dimension of a sensor sample. Absent readings are explicit so they never leak into
/// a chart as NaN or zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Reading {
    Present(f64),
    #[default]
    Absent,
}

impl Reading {
    pub fn value(self) -> Option<f64> {
        match self {
            Reading::Present(value) => Some(value),
            Reading::Absent => None,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Reading::Present(_))
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Reading::Present(v),
            _ => Reading::Absent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    SkinTemperature,
    CoreTemperature,
    Wbgt,
    HeartRate,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::SkinTemperature,
        Dimension::CoreTemperature,
        Dimension::Wbgt,
        Dimension::HeartRate,
    ];

    pub fn label(self) -> Text {
        match self {
            Dimension::SkinTemperature => Text::SkinTemperature,
            Dimension::CoreTemperature => Text::CoreTemperature,
            Dimension::Wbgt => Text::Wbgt,
            Dimension::HeartRate => Text::HeartRate,
        }
    }

    /// Field name used by the API and by exported files.
    pub fn field_name(self) -> &'static str {
        match self {
            Dimension::SkinTemperature => "skin_temperature",
            Dimension::CoreTemperature => "core_temperature",
            Dimension::Wbgt => "wbgt",
            Dimension::HeartRate => "heart_rate",
        }
    }

    pub fn is_temperature(self) -> bool {
        !matches!(self, Dimension::HeartRate)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SensorSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(with = "crate::timestamp::required")]
    pub timestamp: DateTime<Utc>,
    pub sensor_id: String,
    #[serde(
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Older payloads report skin temperature as plain `temperature`
    #[serde(default, alias = "temperature")]
    pub skin_temperature: Option<f64>,
    #[serde(default)]
    pub core_temperature: Option<f64>,
    #[serde(default, alias = "wbgt_value")]
    pub wbgt: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<f64>,
}

impl SensorSample {
    pub fn new(timestamp: DateTime<Utc>, sensor_id: &str) -> Self {
        Self {
            id: None,
            timestamp,
            sensor_id: sensor_id.to_string(),
            user_id: None,
            skin_temperature: None,
            core_temperature: None,
            wbgt: None,
            heart_rate: None,
        }
    }

    pub fn reading(&self, dimension: Dimension) -> Reading {
        match dimension {
            Dimension::SkinTemperature => self.skin_temperature.into(),
            Dimension::CoreTemperature => self.core_temperature.into(),
            Dimension::Wbgt => self.wbgt.into(),
            Dimension::HeartRate => self.heart_rate.into(),
        }
    }
}

/// Start and finish timestamps of each triathlon leg for one competitor in one competition.
/// Any subset may be missing and the ordering is not validated.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RaceRecord {
    #[serde(default, with = "crate::timestamp::optional")]
    pub swim_start: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub swim_finish: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub bike_start: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub bike_finish: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub run_start: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub run_finish: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompetitionRace {
    #[serde(deserialize_with = "required_id")]
    pub id: String,
    pub name: String,
    #[serde(with = "crate::timestamp::date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of competition create and update requests.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CompetitionDraft {
    pub name: String,
    #[serde(with = "crate::timestamp::date")]
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&CompetitionRace> for CompetitionDraft {
    fn from(value: &CompetitionRace) -> Self {
        Self {
            name: value.name.clone(),
            date: value.date,
            location: value.location.clone(),
            description: value.description.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub user_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdminInfo {
    pub admin_id: String,
    pub username: String,
    pub role: Option<String>,
}

/// Who is logged in. The API does not tag its user info, so the conversion from the wire
/// shape happens once in [`RawUserInfo::into_account`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Account {
    User(UserInfo),
    Admin(AdminInfo),
}

impl Account {
    pub fn username(&self) -> &str {
        match self {
            Account::User(user) => &user.username,
            Account::Admin(admin) => &admin.username,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Account::Admin(_))
    }
}

/// User info exactly as `/auth/login` returns it.
#[derive(Clone, Debug, Deserialize)]
pub struct RawUserInfo {
    #[serde(default, deserialize_with = "optional_id")]
    pub admin_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl RawUserInfo {
    pub fn into_account(self) -> Account {
        match self.admin_id {
            Some(admin_id) => Account::Admin(AdminInfo {
                admin_id,
                username: self.username,
                role: self.role,
            }),
            None => Account::User(UserInfo {
                user_id: self.user_id.or(self.id).unwrap_or_default(),
                username: self.username,
                full_name: self.full_name,
                email: self.email,
            }),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user_info: RawUserInfo,
}

/// An authenticated session as persisted by the token store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub account: Account,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataPage<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Default for DataPage<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
        }
    }
}

/// A participant as listed in the admin user table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ManagedUser {
    #[serde(alias = "id", deserialize_with = "required_id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UserImportResult {
    #[serde(default, alias = "created_count")]
    pub created: u32,
    #[serde(default, alias = "skipped_count")]
    pub skipped: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(id_from_value))
}

fn required_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    id_from_value(Value::deserialize(d)?).ok_or_else(|| de::Error::custom("missing identifier"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_id_presence_maps_to_admin_account() {
        let raw: RawUserInfo =
            serde_json::from_value(json!({"admin_id": 3, "username": "root", "role": "super"}))
                .unwrap();
        let account = raw.into_account();
        assert!(account.is_admin());
        assert_eq!(
            account,
            Account::Admin(AdminInfo {
                admin_id: "3".to_string(),
                username: "root".to_string(),
                role: Some("super".to_string()),
            })
        );
    }

    #[test]
    fn test_plain_user_info_maps_to_user_account() {
        let raw: RawUserInfo = serde_json::from_value(
            json!({"user_id": "U0042", "username": "athlete", "full_name": "A. Thlete"}),
        )
        .unwrap();
        let account = raw.into_account();
        assert!(!account.is_admin());
        assert_eq!(account.username(), "athlete");
        match account {
            Account::User(user) => assert_eq!(user.user_id, "U0042"),
            Account::Admin(_) => panic!("Expected user account"),
        }
    }

    #[test]
    fn test_account_serializes_with_explicit_kind() {
        let account = Account::User(UserInfo {
            user_id: "1".to_string(),
            username: "u".to_string(),
            full_name: None,
            email: None,
        });
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["kind"], "user");
        let back: Account = serde_json::from_value(value).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_sensor_sample_accepts_legacy_temperature_field() {
        let sample: SensorSample = serde_json::from_value(json!({
            "timestamp": "2024-06-01T08:00:00",
            "sensor_id": "S1",
            "temperature": 36.5
        }))
        .unwrap();
        assert_eq!(
            sample.reading(Dimension::SkinTemperature),
            Reading::Present(36.5)
        );
        assert_eq!(sample.reading(Dimension::HeartRate), Reading::Absent);
    }

    #[test]
    fn test_race_record_tolerates_nulls_and_missing_fields() {
        let record: RaceRecord = serde_json::from_value(json!({
            "swim_start": "2024-06-01T08:00:00+09:00",
            "swim_finish": null,
            "bike_start": ""
        }))
        .unwrap();
        assert!(record.swim_start.is_some());
        assert!(record.swim_finish.is_none());
        assert!(record.bike_start.is_none());
        assert!(record.run_finish.is_none());
    }

    #[test]
    fn test_competition_date_accepts_timestamp() {
        let competition: CompetitionRace = serde_json::from_value(json!({
            "id": 7,
            "name": "Summer Sprint",
            "date": "2024-07-14T00:00:00"
        }))
        .unwrap();
        assert_eq!(competition.id, "7");
        assert_eq!(
            competition.date,
            NaiveDate::from_ymd_opt(2024, 7, 14).unwrap()
        );
    }
}
