// Canned HTTP responder for exercising the API client.
//
// An axum router answers every path with the next queued response and records what it was
// asked through the usual extractors.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;

use tridash::auth::AuthState;
use tridash::model::{Account, AdminInfo, Session, UserInfo};
use tridash::ApiClient;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: Uri,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query_value(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

pub fn json(status: u16, body: &str) -> CannedResponse {
    CannedResponse {
        status,
        content_type: "application/json",
        body: body.to_string(),
    }
}

pub fn csv(body: &str) -> CannedResponse {
    CannedResponse {
        status: 200,
        content_type: "text/csv",
        body: body.to_string(),
    }
}

#[derive(Clone)]
struct CannedState {
    responses: Arc<Mutex<VecDeque<CannedResponse>>>,
    requests: Sender<RecordedRequest>,
}

async fn respond(
    State(state): State<CannedState>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let _ = state.requests.send(RecordedRequest {
        method: method.to_string(),
        uri,
        query,
        headers,
        body,
    });
    let next = state.responses.lock().unwrap().pop_front();
    let Some(response) = next else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "no canned response left").into_response();
    };
    let status = StatusCode::from_u16(response.status).unwrap();
    (status, [(CONTENT_TYPE, response.content_type)], response.body).into_response()
}

/// Serves `responses` in order, whatever the path. Returns the base URL and the requests as
/// they arrive.
pub async fn serve(responses: Vec<CannedResponse>) -> (String, Receiver<RecordedRequest>) {
    let (tx, rx) = mpsc::channel();
    let state = CannedState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: tx,
    };
    let app = Router::new().fallback(respond).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", address), rx)
}

pub fn participant_session(token: &str) -> Session {
    Session {
        access_token: token.to_string(),
        account: Account::User(UserInfo {
            user_id: "42".to_string(),
            username: "runner".to_string(),
            full_name: None,
            email: None,
        }),
    }
}

pub fn admin_session(token: &str) -> Session {
    Session {
        access_token: token.to_string(),
        account: Account::Admin(AdminInfo {
            admin_id: "1".to_string(),
            username: "admin".to_string(),
            role: None,
        }),
    }
}

/// A client already holding `session`, sharing its `AuthState` with the caller.
pub fn logged_in_client(base_url: &str, session: Session) -> (ApiClient, AuthState) {
    let auth = AuthState::in_memory();
    auth.login(session).unwrap();
    let client = ApiClient::new(base_url, auth.clone()).unwrap();
    (client, auth)
}
