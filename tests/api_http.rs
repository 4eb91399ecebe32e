use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use punch_capture::api::HttpPunchApi;
use punch_capture::config::ApiConfig;
use punch_capture::contract::PunchApi;
use punch_capture::draft::PunchPayload;
use punch_capture::error::ApiError;

const PUNCH_ID: &str = "3f6f3b1e-8f4a-4c1e-9a59-2b1f0d7c9e11";

fn api(server: &MockServer) -> HttpPunchApi {
    HttpPunchApi::new(&ApiConfig {
        base_url: format!("{}/", server.uri()),
        timeout_secs: 5,
    })
    .unwrap()
}

fn payload(image_url: Option<&str>) -> PunchPayload {
    PunchPayload {
        project_id: "b7c0d7a4-1111-4d0e-8a3c-5f0e2d9c0a01".to_string(),
        system_id: "hvac".to_string(),
        title: "Missing damper".to_string(),
        description: "Fire damper absent in duct run 3".to_string(),
        category: "B".to_string(),
        status: "OPEN".to_string(),
        image_url: image_url.map(str::to_string),
    }
}

fn record_json(image_url: Option<&str>) -> Value {
    json!({
        "uuid": PUNCH_ID,
        "title": "Missing damper",
        "description": "Fire damper absent in duct run 3",
        "status": "OPEN",
        "category": "B",
        "image_url": image_url,
        "project": { "uuid": "b7c0d7a4-1111-4d0e-8a3c-5f0e2d9c0a01", "name": "Plant 7" },
        "system": { "id": "hvac", "name": "HVAC" },
        "created_by": {
            "uuid": "0d5b5b8e-2a8e-4a0b-b0d4-0c6a8e1f2a33",
            "name": "Site Engineer",
            "email": "engineer@example.com",
            "role": "inspector"
        },
        "created_at": "2024-05-01T08:30:00Z",
        "updated_at": "2024-05-01T08:30:00Z"
    })
}

#[tokio::test]
async fn create_posts_payload_with_bearer_token() {
    let server = MockServer::start().await;
    let url = "https://store/punch-images/punch_1714552200000.jpg";
    let body = payload(Some(url));

    Mock::given(method("POST"))
        .and(path("/punches"))
        .and(header("authorization", "Bearer session-token"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201).set_body_json(record_json(Some(url))))
        .expect(1)
        .mount(&server)
        .await;

    let record = api(&server)
        .create_punch(&body, "session-token")
        .await
        .unwrap();

    assert_eq!(record.uuid, Uuid::parse_str(PUNCH_ID).unwrap());
    assert_eq!(record.image_url.as_deref(), Some(url));
    assert_eq!(record.system.unwrap().name, "HVAC");
    assert!(record.modified_by.is_none());
}

#[tokio::test]
async fn payload_without_image_omits_the_field() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/punches/{PUNCH_ID}")))
        .and(body_json(json!({
            "project_id": "b7c0d7a4-1111-4d0e-8a3c-5f0e2d9c0a01",
            "system_id": "hvac",
            "title": "Missing damper",
            "description": "Fire damper absent in duct run 3",
            "category": "B",
            "status": "OPEN"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json(None)))
        .expect(1)
        .mount(&server)
        .await;

    let record = api(&server)
        .update_punch(PUNCH_ID, &payload(None), "session-token")
        .await
        .unwrap();
    assert_eq!(record.image_url, None);
}

#[tokio::test]
async fn get_fetches_a_single_punch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/punches/{PUNCH_ID}")))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json(None)))
        .expect(1)
        .mount(&server)
        .await;

    let record = api(&server)
        .get_punch(PUNCH_ID, "session-token")
        .await
        .unwrap();
    assert_eq!(record.title, "Missing damper");
    assert_eq!(record.project.name, "Plant 7");
}

#[tokio::test]
async fn server_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/punches"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "database unavailable" })),
        )
        .mount(&server)
        .await;

    let err = api(&server)
        .create_punch(&payload(None), "session-token")
        .await
        .unwrap_err();
    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("database unavailable"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_without_json_body_has_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let err = api(&server)
        .get_punch(PUNCH_ID, "session-token")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Server {
            status: 404,
            message: None
        }
    ));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let api = HttpPunchApi::new(&ApiConfig {
        base_url,
        timeout_secs: 5,
    })
    .unwrap();
    let err = api
        .create_punch(&payload(None), "session-token")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }), "got {err:?}");
}

#[test]
fn build_url_joins_without_double_slash() {
    let api = HttpPunchApi::new(&ApiConfig {
        base_url: "https://api.example.com/v1/".to_string(),
        timeout_secs: 60,
    })
    .unwrap();
    assert_eq!(api.build_url("/punches"), "https://api.example.com/v1/punches");
}
