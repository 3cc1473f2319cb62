//! # Integration Tests for savania-api
//!
//! Drives the assembled router end to end: health probes, OpenAPI, the
//! public contact form, admin setup and sign-in, the identity gate,
//! contact management, CSV export, the live dashboard, advisory security
//! reports, rate limiting and metrics.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use savania_api::state::{AppConfig, AppState};

/// Helper: build the test app with a short live poll.
fn test_state() -> AppState {
    AppState::with_config(AppConfig {
        live_poll: Duration::from_millis(200),
        ..AppConfig::default()
    })
}

/// Helper: read response body as string.
async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "196.170.1.1");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn submission(name: &str) -> Value {
    json!({
        "name": name,
        "email": "afi@example.tg",
        "phone": "+228 90 12 34 56",
        "service": "piscine",
        "subject": "Réservation",
        "message": "Bonjour, je voudrais réserver la piscine samedi.",
        "newsletter": false
    })
}

/// Create the first admin and sign in; returns the bearer token.
async fn admin_token(app: &axum::Router) -> String {
    let credentials = json!({
        "email": "admin@savania.tg",
        "password": "longpass1",
        "confirmation": "longpass1"
    });
    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/setup/admin", None, credentials))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/session/login",
            None,
            json!({"email": "admin@savania.tg", "password": "longpass1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn submit(app: &axum::Router, name: &str) -> String {
    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/contacts", None, submission(name)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = savania_api::app(test_state());
    let response = app.oneshot(get("/health/liveness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = savania_api::app(test_state());
    let response = app.oneshot(get("/health/readiness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_openapi_is_served_without_auth() {
    let app = savania_api::app(test_state());
    let response = app.oneshot(get("/openapi.json", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/v1/contacts"].is_object());
}

// -- Public Contact Form ------------------------------------------------------

#[tokio::test]
async fn test_contact_submission_is_recorded_as_new() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    let id = submit(&app, "Afi Mensah").await;

    let response = app
        .oneshot(get(&format!("/v1/admin/contacts/{id}"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["nom"], "Afi Mensah");
    assert_eq!(record["statut"], "nouveau");
}

#[tokio::test]
async fn test_invalid_submission_lists_field_errors() {
    let app = savania_api::app(test_state());
    let mut body = submission("Afi");
    body["email"] = json!("not-an-email");
    body["message"] = json!("   ");
    let response = app
        .oneshot(send_json("POST", "/v1/contacts", None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error = body_json(response).await;
    let fields: Vec<&str> = error["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"message"));
}

#[tokio::test]
async fn test_script_injection_is_blocked_and_logged() {
    let state = test_state();
    let app = savania_api::app(state.clone());
    let token = admin_token(&app).await;

    let mut body = submission("Afi");
    body["message"] = json!("Bonjour <script>alert(1)</script> à vous");
    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/contacts", None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INPUT_BLOCKED");

    let response = app
        .oneshot(get("/v1/admin/security/logs", Some(&token)))
        .await
        .unwrap();
    let logs = body_json(response).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = savania_api::app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/contacts")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Setup and Identity Gate --------------------------------------------------

#[tokio::test]
async fn test_setup_closes_after_first_admin() {
    let app = savania_api::app(test_state());
    let response = app.clone().oneshot(get("/v1/setup/status", None)).await.unwrap();
    assert_eq!(body_json(response).await["completed"], false);

    admin_token(&app).await;

    let response = app.clone().oneshot(get("/v1/setup/status", None)).await.unwrap();
    assert_eq!(body_json(response).await["completed"], true);

    let response = app
        .oneshot(send_json(
            "POST",
            "/v1/setup/admin",
            None,
            json!({"email": "second@savania.tg", "password": "longpass1", "confirmation": "longpass1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_routes_require_a_session() {
    let app = savania_api::app(test_state());
    let response = app.oneshot(get("/v1/admin/contacts", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::LOCATION], "admin-login.html");
}

#[tokio::test]
async fn test_unknown_admin_path_is_not_found() {
    let app = savania_api::app(test_state());
    let response = app.oneshot(get("/v1/admin/nothing-here", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/session/logout", Some(&token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get("/v1/admin/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = savania_api::app(test_state());
    admin_token(&app).await;
    let response = app
        .oneshot(send_json(
            "POST",
            "/v1/session/login",
            None,
            json!({"email": "admin@savania.tg", "password": "wrongpass"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// -- Contact Management -------------------------------------------------------

#[tokio::test]
async fn test_list_filters_and_pages() {
    let state = AppState::with_config(AppConfig {
        page_size: 2,
        ..AppConfig::default()
    });
    let app = savania_api::app(state);
    let token = admin_token(&app).await;
    for name in ["Afi", "Kofi", "Ama"] {
        submit(&app, name).await;
    }

    let response = app
        .clone()
        .oneshot(get("/v1/admin/contacts?statut=nouveau&page=2", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["contacts"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get("/v1/admin/contacts?statut=traite", Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 0);
}

#[tokio::test]
async fn test_bad_filter_is_bad_request() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    let response = app
        .oneshot(get("/v1/admin/contacts?statut=archive", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_update_then_delete() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    let id = submit(&app, "Afi").await;

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/v1/admin/contacts/{id}/status"),
            Some(&token),
            json!({"statut": "en_cours"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["statut"], "en_cours");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/v1/admin/contacts/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/v1/admin/contacts/{id}"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_is_a_csv_attachment() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    submit(&app, "Afi Mensah").await;
    submit(&app, "Kofi \"K\" Agbo").await;

    let response = app
        .oneshot(get("/v1/admin/export/contacts", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"contacts_savania_"));

    let body = body_string(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("\"Nom\";\"Email\""));
    assert!(body.contains("\"Kofi \"\"K\"\" Agbo\""));
}

#[tokio::test]
async fn test_export_rejects_reversed_range() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    let response = app
        .oneshot(get(
            "/v1/admin/export/contacts?from=2025-03-10&to=2025-03-01",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_last_calendar_day_is_rejected_by_list_and_export() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;

    for uri in [
        "/v1/admin/contacts?date=%2B262142-12-31",
        "/v1/admin/export/contacts?to=%2B262142-12-31",
        "/v1/admin/fragments/contacts?date=%2B262142-12-31",
    ] {
        let response = app.clone().oneshot(get(uri, Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(body_json(response).await["error"]["message"]
            .as_str()
            .unwrap()
            .contains("outside the supported calendar"));
    }
}

#[tokio::test]
async fn test_search_needs_two_characters() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    submit(&app, "Afi Mensah").await;

    let response = app
        .clone()
        .oneshot(get("/v1/admin/search?q=A", Some(&token)))
        .await
        .unwrap();
    assert!(body_json(response).await["contacts"].as_array().unwrap().is_empty());

    let response = app
        .oneshot(get("/v1/admin/search?q=Af", Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["contacts"].as_array().unwrap().len(), 1);
}

// -- Dashboard ----------------------------------------------------------------

#[tokio::test]
async fn test_stats_count_todays_contacts() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    submit(&app, "Afi").await;
    submit(&app, "Kofi").await;

    let response = app
        .oneshot(get("/v1/admin/dashboard/stats", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["new_contacts_today"], 2);
}

#[tokio::test]
async fn test_live_long_poll_sees_new_contact() {
    let state = AppState::with_config(AppConfig {
        live_poll: Duration::from_secs(5),
        ..AppConfig::default()
    });
    let app = savania_api::app(state);
    let token = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(get("/v1/admin/dashboard/live", Some(&token)))
        .await
        .unwrap();
    let first = body_json(response).await;
    let generation = first["generation"].as_u64().unwrap();

    submit(&app, "Afi").await;

    let response = app
        .oneshot(get(
            &format!("/v1/admin/dashboard/live?after={generation}"),
            Some(&token),
        ))
        .await
        .unwrap();
    let next = body_json(response).await;
    assert!(next["generation"].as_u64().unwrap() > generation);
}

#[tokio::test]
async fn test_live_long_poll_times_out_with_current_state() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(get("/v1/admin/dashboard/live", Some(&token)))
        .await
        .unwrap();
    let generation = body_json(response).await["generation"].as_u64().unwrap();

    let response = app
        .oneshot(get(
            &format!("/v1/admin/dashboard/live?after={generation}"),
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["generation"].as_u64().unwrap(), generation);
}

#[tokio::test]
async fn test_fragments_are_html() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;
    submit(&app, "Afi <b>Mensah</b>").await;

    let response = app
        .oneshot(get("/v1/admin/fragments/contacts", Some(&token)))
        .await
        .unwrap();
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let html = body_string(response).await;
    assert!(html.contains("Afi &lt;b&gt;Mensah&lt;/b&gt;"));
}

// -- Advisory Security Reports ------------------------------------------------

async fn security_logs(app: &axum::Router, token: &str) -> Vec<Value> {
    let response = app
        .clone()
        .oneshot(get("/v1/admin/security/logs", Some(token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await.as_array().unwrap().clone()
}

fn viewport(outer_width: i64, inner_width: i64) -> Value {
    json!({
        "outerWidth": outer_width,
        "innerWidth": inner_width,
        "outerHeight": 900,
        "innerHeight": 800
    })
}

#[tokio::test]
async fn test_viewport_over_threshold_redirects_and_logs() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/security/viewport", None, viewport(1440, 1280)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verdict = body_json(response).await;
    assert_eq!(verdict["devtools_suspected"], false);
    assert!(verdict.get("redirect").is_none());
    assert!(security_logs(&app, &token).await.is_empty());

    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/security/viewport", None, viewport(1441, 1280)))
        .await
        .unwrap();
    let verdict = body_json(response).await;
    assert_eq!(verdict["devtools_suspected"], true);
    assert_eq!(verdict["redirect"], "/");

    let logs = security_logs(&app, &token).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["type"], "dev_tools_detected");
    assert_eq!(logs[0]["data"]["outerWidth"], 1441);
}

#[tokio::test]
async fn test_extreme_viewport_is_answered() {
    let app = savania_api::app(test_state());
    let body = json!({
        "outerWidth": i64::MIN,
        "innerWidth": 1,
        "outerHeight": 0,
        "innerHeight": 0
    });
    let response = app
        .oneshot(send_json("POST", "/v1/security/viewport", None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["devtools_suspected"], false);
}

#[tokio::test]
async fn test_event_report_appears_in_admin_log() {
    let app = savania_api::app(test_state());
    let token = admin_token(&app).await;

    let clicks: Vec<i64> = (0..=11).map(|i| i * 50).collect();
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/security/events",
            None,
            json!({
                "type": "rapid_clicks_detected",
                "data": {"clickTimes": clicks},
                "url": "https://savania.tg/contact.html"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let logs = security_logs(&app, &token).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["id"], id.as_str());
    assert_eq!(logs[0]["type"], "rapid_clicks_detected");
    assert_eq!(logs[0]["url"], "https://savania.tg/contact.html");
    assert_eq!(logs[0]["data"]["confirmed_run"], 11);
}

#[tokio::test]
async fn test_password_reset_known_and_unknown_email() {
    let app = savania_api::app(test_state());
    admin_token(&app).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/v1/session/password-reset",
            None,
            json!({"email": "admin@savania.tg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_json(response).await["message"]
        .as_str()
        .unwrap()
        .contains("réinitialisation"));

    let response = app
        .oneshot(send_json(
            "POST",
            "/v1/session/password-reset",
            None,
            json!({"email": "nobody@savania.tg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// -- Rate Limiting and Metrics ------------------------------------------------

#[tokio::test]
async fn test_public_routes_are_rate_limited() {
    let state = AppState::with_config(AppConfig {
        rate_limit: 2,
        ..AppConfig::default()
    });
    let app = savania_api::app(state);
    submit(&app, "Afi").await;
    submit(&app, "Kofi").await;

    let response = app
        .clone()
        .oneshot(send_json("POST", "/v1/contacts", None, submission("Ama")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.oneshot(get("/metrics", None)).await.unwrap();
    let metrics = body_json(response).await;
    assert_eq!(metrics["rate_limited"], 1);
    assert!(metrics["requests"].as_u64().unwrap() >= 3);
}
