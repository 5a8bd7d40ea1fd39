use basecrm_sync::{
    HttpConfig, HttpTransport, MAIN_QUEUE, ObserverRegistry, SyncClient, SyncError, SyncService,
};
use basecrm_types::entities::Contact;
use basecrm_types::{AckKey, DeviceId, SessionId};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> HttpConfig {
    HttpConfig {
        base_url: format!("{}/v2", server.uri()),
        access_token: Some("test-token".to_string()),
        ..Default::default()
    }
}

fn service(server: &MockServer) -> SyncService<HttpTransport> {
    SyncService::new(HttpTransport::new(mock_config(server)).unwrap())
}

fn device() -> DeviceId {
    DeviceId::new("device-1").unwrap()
}

// ── Wire format ─────────────────────────────────────────────────

#[tokio::test]
async fn start_sends_device_and_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/sync/start"))
        .and(header("X-Basecrm-Device-UUID", "device-1"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let session = service(&server).start(&device()).await.unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn fetch_hits_queue_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sync/abc/queues/main"))
        .and(header("X-Basecrm-Device-UUID", "device-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "data": { "id": 1 },
                "meta": { "type": "contact", "sync": { "event_type": "created", "ack_key": "c-1" } }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = service(&server)
        .fetch(&device(), &SessionId::new("abc").unwrap(), MAIN_QUEUE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn ack_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/sync/ack"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "ack_keys": ["c-1", "c-2"] })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let acked = service(&server)
        .ack(&device(), &[AckKey::new("c-1"), AckKey::new("c-2")])
        .await
        .unwrap();
    assert!(acked);
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let transport = HttpTransport::new(HttpConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    })
    .unwrap();

    let err = SyncService::new(transport).start(&device()).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
}

// ── End to end ──────────────────────────────────────────────────

#[tokio::test]
async fn full_run_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/sync/start"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": "s-42",
                "queues": [{ "data": { "name": "main", "pages": 2, "total_count": 2 } }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/sync/s-42/queues/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "data": { "id": 1, "name": "Acme" , "is_organization": true },
                    "meta": { "type": "contact", "sync": { "event_type": "created", "ack_key": "c-1" } }
                },
                {
                    "data": { "id": 2 },
                    "meta": { "type": "call_outcome", "sync": { "event_type": "created", "ack_key": "x-1" } }
                }
            ]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/sync/s-42/queues/main"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/sync/ack"))
        .and(body_json(json!({ "ack_keys": ["c-1"] })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let observers = ObserverRegistry::new().subscribe(|c: Contact| c.is_organization);
    let mut sync = SyncClient::with_observers(service(&server), device(), observers).unwrap();
    let report = sync.run().await;

    assert!(report.is_success());
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.records_acked, 1);
    assert_eq!(report.skipped.unsupported_type, 1);
}
