// API client behaviour against a local canned HTTP responder

mod common;

use common::{admin_session, json, logged_in_client, participant_session, serve};
use tridash::api::{ApiClient, DataScope};
use tridash::auth::{AuthState, LogoutReason};
use tridash::feedback::load_feedback;
use tridash::filters::FilterState;
use tridash::model::{Account, CompetitionDraft};
use tridash::TridashError;

#[tokio::test]
async fn test_login_posts_form_and_stores_session() {
    let (base_url, requests) = serve(vec![json(
        200,
        r#"{"access_token": "tok-1", "token_type": "bearer",
            "user_info": {"admin_id": 7, "username": "admin", "role": "staff"}}"#,
    )]).await;
    let auth = AuthState::in_memory();
    let client = ApiClient::new(&base_url, auth.clone()).unwrap();

    let session = client.login("admin", "secret").await.unwrap();
    assert!(matches!(&session.account, Account::Admin(admin) if admin.admin_id == "7"));
    assert_eq!(auth.token().as_deref(), Some("tok-1"));

    let request = requests.recv().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path(), "/auth/login");
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.body_text(), "username=admin&password=secret");
    assert!(request.header("authorization").is_none());
}

#[tokio::test]
async fn test_login_without_admin_id_is_a_participant() {
    let (base_url, _requests) = serve(vec![json(
        200,
        r#"{"access_token": "tok-2", "user_info": {"user_id": 42, "username": "runner"}}"#,
    )]).await;
    let client = ApiClient::new(&base_url, AuthState::in_memory()).unwrap();
    let session = client.login("runner", "pw").await.unwrap();
    assert!(!session.account.is_admin());
    assert_eq!(session.account.username(), "runner");
}

#[tokio::test]
async fn test_rejected_login_does_not_broadcast_logout() {
    let (base_url, _requests) = serve(vec![json(401, r#"{"detail": "Incorrect username or password"}"#)]).await;
    let auth = AuthState::in_memory();
    let subscription = auth.subscribe_logout();
    let client = ApiClient::new(&base_url, auth.clone()).unwrap();

    let err = client.login("runner", "wrong").await.unwrap_err();
    match err {
        TridashError::ApiStatus { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect username or password");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(subscription.try_next(), None);
}

#[tokio::test]
async fn test_requests_carry_token_and_one_based_page() {
    let (base_url, requests) = serve(vec![json(
        200,
        r#"{"data": [{"timestamp": "2024-06-01T08:00:00", "sensor_id": "S1", "temperature": 36.4}],
            "total": 120}"#,
    )]).await;
    let (client, _auth) = logged_in_client(&base_url, participant_session("tok-3"));

    let mut state = FilterState::new(25);
    state.update(|f| f.sensor_id = Some("S1".to_string()));
    state.set_page(2);
    let page = client
        .sensor_data(&DataScope::Own, &state.query())
        .await
        .unwrap();
    assert_eq!(page.total, 120);
    assert_eq!(page.data[0].skin_temperature, Some(36.4));

    let request = requests.recv().unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path(), "/data/my-data");
    assert_eq!(request.header("authorization"), Some("Bearer tok-3"));
    assert_eq!(request.query_value("sensor_id").as_deref(), Some("S1"));
    assert_eq!(request.query_value("page").as_deref(), Some("3"));
    assert_eq!(request.query_value("limit").as_deref(), Some("25"));
    assert_eq!(request.query_value("order").as_deref(), Some("desc"));
}

#[tokio::test]
async fn test_admin_scope_targets_user_path() {
    let (base_url, requests) = serve(vec![json(200, r#"{"data": [], "total": 0}"#)]).await;
    let (client, _auth) = logged_in_client(&base_url, admin_session("tok-4"));
    let page = client
        .sensor_data(&DataScope::User("17".to_string()), &FilterState::new(50).query())
        .await
        .unwrap();
    assert!(page.data.is_empty());
    assert_eq!(requests.recv().unwrap().path(), "/admin/users/17/data");
}

#[tokio::test]
async fn test_unauthorized_response_ends_session_everywhere() {
    let (base_url, _requests) = serve(vec![json(401, r#"{"detail": "Token expired"}"#)]).await;
    let (client, auth) = logged_in_client(&base_url, participant_session("tok-5"));
    let first = auth.subscribe_logout();
    let second = auth.subscribe_logout();

    let err = client.competitions().await.unwrap_err();
    assert!(matches!(err, TridashError::Unauthorized));
    assert!(!auth.is_authenticated());
    assert_eq!(first.try_next(), Some(LogoutReason::Unauthorized));
    assert_eq!(second.try_next(), Some(LogoutReason::Unauthorized));
}

#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let (base_url, _requests) = serve(vec![json(404, r#"{"detail": "Competition not found"}"#)]).await;
    let (client, auth) = logged_in_client(&base_url, participant_session("tok-6"));
    let err = load_feedback(&client, "99").await.unwrap_err();
    match err {
        TridashError::ApiStatus { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Competition not found");
        }
        other => panic!("unexpected error {:?}", other),
    }
    // only 401 ends the session
    assert!(auth.is_authenticated());
}

#[tokio::test]
async fn test_feedback_payload_is_parsed() {
    let (base_url, requests) = serve(vec![json(
        200,
        r#"{
            "sensor_data": [
                {"timestamp": "2024-06-01T08:05:00Z", "sensor_id": "S1", "heart_rate": 140},
                {"timestamp": "2024-06-01T08:35:00Z", "sensor_id": "S1", "heart_rate": 165}
            ],
            "race_record": {"swim_start": "2024-06-01T08:00:00Z", "bike_start": "2024-06-01T08:30:00Z"},
            "competition": {"id": "c-1", "name": "Odaiba Sprint", "date": "2024-06-01"}
        }"#,
    )]).await;
    let (client, _auth) = logged_in_client(&base_url, participant_session("tok-7"));
    let data = load_feedback(&client, "c-1").await.unwrap();
    assert_eq!(data.sensor_data.len(), 2);
    assert_eq!(data.competition.unwrap().name, "Odaiba Sprint");
    assert!(data.race_record.unwrap().bike_start.is_some());
    assert_eq!(requests.recv().unwrap().path(), "/me/feedback-data/c-1");
}

#[tokio::test]
async fn test_competition_lifecycle_requests() {
    let created = r#"{"id": 5, "name": "Kanto Cup", "date": "2024-09-01", "location": "Chiba"}"#;
    let (base_url, requests) = serve(vec![
        json(200, created),
        json(200, created),
        json(204, ""),
        json(200, &format!("[{}]", created)),
    ]).await;
    let (client, _auth) = logged_in_client(&base_url, admin_session("tok-8"));

    let draft = CompetitionDraft {
        name: "Kanto Cup".to_string(),
        date: chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        location: Some("Chiba".to_string()),
        description: None,
    };
    let competition = client.create_competition(&draft).await.unwrap();
    assert_eq!(competition.id, "5");
    client.update_competition(&competition.id, &draft).await.unwrap();
    client.delete_competition(&competition.id).await.unwrap();
    let listed = client.competitions().await.unwrap();
    assert_eq!(listed, vec![competition]);

    let create = requests.recv().unwrap();
    assert_eq!((create.method.as_str(), create.path()), ("POST", "/admin/competitions"));
    let body: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(body["date"], "2024-09-01");
    assert!(body.get("description").is_none());

    let update = requests.recv().unwrap();
    assert_eq!((update.method.as_str(), update.path()), ("PUT", "/admin/competitions/5"));
    let delete = requests.recv().unwrap();
    assert_eq!((delete.method.as_str(), delete.path()), ("DELETE", "/admin/competitions/5"));
    assert_eq!(requests.recv().unwrap().path(), "/competitions");
}
