#![allow(clippy::unwrap_used)]
// List sessions and the dashboard facade against a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paydesk_api::realtime::mailbox;
use paydesk_api::{ApiClient, PhoneNumberQuery};
use paydesk_core::{
    ClientConfig, CoreError, CountryForm, Dashboard, ListQuery, ListSession, ResourceKind,
    SessionOptions, ViewSnapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(5);

fn api_path(suffix: &str) -> String {
    format!("/api/payments/{suffix}")
}

fn api(server: &MockServer) -> Arc<ApiClient> {
    Arc::new(ApiClient::with_client(reqwest::Client::new(), &server.uri()).unwrap())
}

fn dashboard(server: &MockServer) -> Dashboard {
    let mut config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    config.realtime_enabled = false;
    Dashboard::new(config).unwrap()
}

async fn settled(session: &mut ListSession) -> Arc<ViewSnapshot> {
    tokio::time::timeout(WAIT, session.settled())
        .await
        .expect("session did not settle")
        .unwrap()
}

/// Wait until `check` holds for a published snapshot.
async fn until(
    session: &mut ListSession,
    check: impl Fn(&ViewSnapshot) -> bool,
) -> Arc<ViewSnapshot> {
    tokio::time::timeout(WAIT, async {
        loop {
            let snap = session.latest();
            if check(&snap) {
                return snap;
            }
            session.changed().await.unwrap();
        }
    })
    .await
    .expect("condition never held")
}

// ── Sessions ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_initial_load_populates_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("countries/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": 1, "nom": "Ghana" }, { "id": 2, "nom": "Mali" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = ListSession::open(
        api(&server),
        ResourceKind::Countries,
        None,
        SessionOptions::default(),
        CancellationToken::new(),
    );

    let snap = settled(&mut session).await;
    assert_eq!(snap.collection.len(), 2);
    assert!(snap.error.is_none());
    session.close();
}

#[tokio::test]
async fn test_refresh_failure_keeps_previous_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("networks/")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "nom": "Orange" }])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("networks/")))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "detail": "Network error" })),
        )
        .mount(&server)
        .await;

    let mut session = ListSession::open(
        api(&server),
        ResourceKind::Networks,
        None,
        SessionOptions::default(),
        CancellationToken::new(),
    );
    let first = settled(&mut session).await;
    assert_eq!(first.collection.len(), 1);

    session.refresh().await.unwrap();
    let snap = until(&mut session, |s| s.error.is_some() && !s.loading).await;

    assert_eq!(snap.error.as_deref(), Some("Network error"));
    assert_eq!(snap.collection, first.collection);
    session.close();
}

#[tokio::test]
async fn test_initial_failure_uses_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("stats/devices/")))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let mut session = ListSession::open(
        api(&server),
        ResourceKind::Devices,
        None,
        SessionOptions::default(),
        CancellationToken::new(),
    );
    let snap = settled(&mut session).await;

    assert_eq!(snap.error.as_deref(), Some("Failed to load devices"));
    assert!(snap.collection.is_empty());
    session.close();
}

#[tokio::test]
async fn test_realtime_message_patches_devices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("stats/devices/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "Kiosk", "is_online": false, "last_seen": null },
            { "id": 2, "name": "Booth", "is_online": true, "last_seen": "t0" }
        ])))
        .mount(&server)
        .await;

    let (tx, latest) = mailbox();
    let mut session = ListSession::open(
        api(&server),
        ResourceKind::Devices,
        Some(latest),
        SessionOptions::default(),
        CancellationToken::new(),
    );
    settled(&mut session).await;

    tx.publish("definitely not json");
    tx.publish(
        json!({
            "type": "device_status_update",
            "device_id": 1,
            "is_online": true,
            "last_seen": "2024-01-01T00:00:00Z"
        })
        .to_string(),
    );

    let snap = until(&mut session, |s| {
        s.collection.get(0).is_some_and(|d| d.truthy("is_online"))
    })
    .await;

    let first = snap.collection.get(0).unwrap();
    assert_eq!(first.str("last_seen"), Some("2024-01-01T00:00:00Z"));
    assert_eq!(first.str("name"), Some("Kiosk"));
    assert_eq!(snap.collection.get(1).unwrap().str("last_seen"), Some("t0"));
    assert!(snap.error.is_none());
    session.close();
}

#[tokio::test]
async fn test_closed_session_rejects_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("countries/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let mut session = ListSession::open(
        api(&server),
        ResourceKind::Countries,
        None,
        SessionOptions::default(),
        cancel.clone(),
    );
    settled(&mut session).await;

    cancel.cancel();
    assert!(session.is_closed());

    // The driver drops its end once it observes the cancellation.
    let ended = tokio::time::timeout(WAIT, async {
        while session.changed().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok());
    assert!(matches!(session.refresh().await, Err(CoreError::ViewClosed)));
}

#[tokio::test]
async fn test_subscriber_outlives_the_handle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("networks/")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 1, "nom": "Orange" }]))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let session = ListSession::open(
        api(&server),
        ResourceKind::Networks,
        None,
        SessionOptions::default(),
        cancel.clone(),
    );
    let mut rx = session.subscribe();
    drop(session);

    let snap = tokio::time::timeout(WAIT, async {
        loop {
            rx.changed().await.unwrap();
            let snap = rx.borrow_and_update().clone();
            if !snap.loading && snap.revision > 0 {
                return snap;
            }
        }
    })
    .await
    .expect("subscriber never saw the load");
    assert_eq!(snap.collection.len(), 1);
    cancel.cancel();
}

#[tokio::test]
async fn test_phone_numbers_send_server_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("numeros/")))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "25"))
        .and(query_param("network", "4"))
        .and(query_param("ordering", "-phone_number"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [{ "id": 9, "phone_number": "+221770000000", "network": 4 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = SessionOptions {
        phone_query: PhoneNumberQuery {
            page_size: 25,
            network: Some("4".into()),
            ordering: Some("-phone_number".into()),
            ..PhoneNumberQuery::default()
        },
        refresh_every: None,
    };
    let mut session = ListSession::open(
        api(&server),
        ResourceKind::PhoneNumbers,
        None,
        options,
        CancellationToken::new(),
    );

    let snap = settled(&mut session).await;
    assert_eq!(snap.collection.len(), 1);
    session.close();
}

// ── Dashboard ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_dashboard_list_projects_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("networks/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "nom": "Orange", "code": "OM", "country": 1, "is_active": true },
            { "id": 2, "nom": "Wave", "code": "WV", "country": 1, "is_active": false },
            { "id": 3, "nom": "MTN", "code": "MTN", "country": { "id": 2 }, "is_active": true }
        ])))
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let query = ListQuery {
        status: "active".parse().unwrap(),
        dimension: Some("1".into()),
        ..ListQuery::default()
    };
    let rows = dash.list(ResourceKind::Networks, &query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].str("nom"), Some("Orange"));
}

#[tokio::test]
async fn test_dashboard_get_device_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("stats/devices/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "device_id": "D1" }])))
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let found = dash.get(ResourceKind::Devices, "D1").await.unwrap();
    assert_eq!(found.str("device_id"), Some("D1"));

    let missing = dash.get(ResourceKind::Devices, "D9").await;
    assert!(matches!(missing, Err(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_invalid_country_form_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("countries/")))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let form = CountryForm {
        nom: "Ghana".into(),
        ..CountryForm::default()
    };
    let result = dash.create_country(&form).await;
    assert!(matches!(result, Err(CoreError::ValidationFailed { .. })));
}

#[tokio::test]
async fn test_create_country_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("countries/")))
        .and(body_json(json!({ "nom": "Ghana", "code": "GH", "is_active": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 5, "nom": "Ghana", "code": "GH", "is_active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let form = CountryForm {
        nom: "Ghana".into(),
        code: "GH".into(),
        ..CountryForm::default()
    };
    let created = dash.create_country(&form).await.unwrap();
    assert_eq!(created.get("id"), Some(&json!(5)));
}

#[tokio::test]
async fn test_update_country_surfaces_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(api_path("countries/5/")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": ["country with this code already exists."]
        })))
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let form = CountryForm {
        nom: "Ghana".into(),
        code: "SN".into(),
        ..CountryForm::default()
    };
    let err = dash.update_country("5", &form).await.unwrap_err();
    assert_eq!(
        err.user_message("Failed to update country"),
        "code: country with this code already exists."
    );
}

#[tokio::test]
async fn test_transaction_logs_fail_independently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("transactions/tx-1/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": "tx-1",
            "status": "pending",
            "recipient_name": "Awa",
            "objet": "Fees"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("transaction-logs/")))
        .and(query_param("transaction", "tx-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let editor = dash.open_transaction("tx-1").await;

    assert!(editor.error().is_none());
    assert_eq!(editor.form.recipient_name, "Awa");
    assert_eq!(editor.form.objet, "Fees");
    assert_eq!(editor.logs_error(), Some("Failed to load transaction logs"));
}

#[tokio::test]
async fn test_save_transaction_patches_five_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("transactions/tx-2/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": "tx-2",
            "display_recipient_name": "Moussa",
            "amount": 5000
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("transaction-logs/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(api_path("transactions/tx-2/")))
        .and(body_json(json!({
            "recipient_name": "Moussa",
            "objet": "Refund",
            "external_transaction_id": "",
            "raw_sms": "",
            "processed_by_phone": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "uid": "tx-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let dash = dashboard(&server);
    let mut editor = dash.open_transaction("tx-2").await;
    editor.form.set("objet", "Refund".into());

    assert!(dash.save_transaction(&mut editor).await);
    assert!(editor.error().is_none());
}
