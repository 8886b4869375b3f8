/// Whose sensor data a query targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataScope {
    /// The logged in participant
    Own,
    /// Any participant, admin only
    User(String),
}

impl DataScope {
    pub fn data_path(&self) -> String {
        match self {
            DataScope::Own => "/data/my-data".to_string(),
            DataScope::User(user_id) => format!("/admin/users/{}/data", user_id),
        }
    }

    pub fn export_path(&self) -> String {
        format!("{}/export", self.data_path())
    }

    /// Prefix of generated export file names.
    pub fn file_prefix(&self) -> String {
        match self {
            DataScope::Own => "my_sensor_data".to_string(),
            DataScope::User(user_id) => format!("user_{}_sensor_data", sanitize(user_id)),
        }
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
