// Client for the sensor platform REST API.

mod scope;

use std::time::Duration;

use log::{debug, warn};
use reqwest::{RequestBuilder, Response, StatusCode, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::TridashError;
use crate::auth::{AuthState, LogoutReason};
use crate::export::ExportFormat;
use crate::filters::DataQuery;
use crate::model::{
    CompetitionDraft, CompetitionRace, DataPage, LoginResponse, ManagedUser, SensorSample,
    Session, UserImportResult,
};

pub use scope::DataScope;

const REQUEST_TIMEOUT_S: u64 = 30;

/// Some list endpoints wrap their rows, others return a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Plain(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> From<ListResponse<T>> for Vec<T> {
    fn from(value: ListResponse<T>) -> Self {
        match value {
            ListResponse::Plain(rows) => rows,
            ListResponse::Wrapped { data } => data,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    auth: AuthState,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: AuthState) -> Result<Self, TridashError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tridash/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_S))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth,
        })
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends an authenticated request. A 401 ends the session for everyone holding the
    /// same `AuthState`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, TridashError> {
        let response = self.authorized(request).send().await?;
        debug!("{} {}", response.status(), response.url());
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Request to {} was rejected, ending session", response.url());
            self.auth.logout(LogoutReason::Unauthorized);
            return Err(TridashError::Unauthorized);
        }
        ensure_success(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TridashError> {
        let body = self.send(request).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| TridashError::ResponseDecodeError { source: e })
    }

    /// Exchanges credentials for a token and stores the new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, TridashError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let body = ensure_success(response).await?.bytes().await?;
        let login: LoginResponse = serde_json::from_slice(&body)
            .map_err(|e| TridashError::ResponseDecodeError { source: e })?;
        let session = Session {
            access_token: login.access_token,
            account: login.user_info.into_account(),
        };
        self.auth.login(session.clone())?;
        Ok(session)
    }

    pub fn logout(&self) {
        self.auth.logout(LogoutReason::UserRequested);
    }

    pub async fn sensor_data(
        &self,
        scope: &DataScope,
        query: &DataQuery,
    ) -> Result<DataPage<SensorSample>, TridashError> {
        let request = self
            .client
            .get(self.url(&scope.data_path()))
            .query(&query.to_params());
        self.send_json(request).await
    }

    /// Downloads an export as raw bytes. Excel exports are fetched as JSON and converted
    /// locally.
    pub async fn export_data(
        &self,
        scope: &DataScope,
        query: &DataQuery,
        format: ExportFormat,
    ) -> Result<Vec<u8>, TridashError> {
        let mut params = query.to_params();
        params.push(("format", format.wire_format().to_string()));
        let request = self
            .client
            .get(self.url(&scope.export_path()))
            .query(&params);
        Ok(self.send(request).await?.bytes().await?.to_vec())
    }

    /// Raw feedback payload; see [`crate::feedback::FeedbackData::from_value`].
    pub async fn feedback_data(&self, competition_id: &str) -> Result<Value, TridashError> {
        let request = self
            .client
            .get(self.url(&format!("/me/feedback-data/{}", competition_id)));
        self.send_json(request).await
    }

    pub async fn competitions(&self) -> Result<Vec<CompetitionRace>, TridashError> {
        let request = self.client.get(self.url("/competitions"));
        let rows: ListResponse<CompetitionRace> = self.send_json(request).await?;
        Ok(rows.into())
    }

    pub async fn create_competition(
        &self,
        draft: &CompetitionDraft,
    ) -> Result<CompetitionRace, TridashError> {
        let request = self.client.post(self.url("/admin/competitions")).json(draft);
        self.send_json(request).await
    }

    pub async fn update_competition(
        &self,
        id: &str,
        draft: &CompetitionDraft,
    ) -> Result<CompetitionRace, TridashError> {
        let request = self
            .client
            .put(self.url(&format!("/admin/competitions/{}", id)))
            .json(draft);
        self.send_json(request).await
    }

    pub async fn delete_competition(&self, id: &str) -> Result<(), TridashError> {
        let request = self
            .client
            .delete(self.url(&format!("/admin/competitions/{}", id)));
        self.send(request).await?;
        Ok(())
    }

    pub async fn users(&self) -> Result<Vec<ManagedUser>, TridashError> {
        let request = self.client.get(self.url("/admin/users"));
        let rows: ListResponse<ManagedUser> = self.send_json(request).await?;
        Ok(rows.into())
    }

    /// Uploads a user CSV as is, parsing happens on the server.
    pub async fn import_users(
        &self,
        file_name: &str,
        csv_bytes: Vec<u8>,
    ) -> Result<UserImportResult, TridashError> {
        let part = multipart::Part::bytes(csv_bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);
        let request = self
            .client
            .post(self.url("/admin/users/import"))
            .multipart(form);
        self.send_json(request).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, TridashError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TridashError::ApiStatus {
        status: status.as_u16(),
        message: error_detail(&body, status),
    })
}

/// Pulls a readable message out of an error body (`{"detail": ...}` or `{"message": ...}`).
fn error_detail(body: &str, status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    };
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match value.get("detail").or_else(|| value.get("message")) {
            Some(Value::String(detail)) => detail.clone(),
            Some(Value::Array(details)) => details
                .iter()
                .filter_map(|d| d.get("msg").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; "),
            _ => fallback(),
        },
        Err(_) if !body.trim().is_empty() && body.len() < 200 => body.trim().to_string(),
        Err(_) => fallback(),
    }
}
