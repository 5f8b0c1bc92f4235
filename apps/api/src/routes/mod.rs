pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::drafting::handlers as drafting;
use crate::ledger::handlers as ledger;
use crate::state::AppState;

/// Upper bound for request bodies, PDF uploads included.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assistant API
        .route("/api/v1/assistant/tasks", post(drafting::handle_run_task))
        .route(
            "/api/v1/assistant/tasks/preview",
            post(drafting::handle_preview_task),
        )
        .route(
            "/api/v1/assistant/tasks/upload",
            post(drafting::handle_upload_task),
        )
        .route(
            "/api/v1/assistant/contract-types",
            get(drafting::handle_contract_types),
        )
        // Documents API
        .route("/api/v1/documents/extract", post(documents::handle_extract))
        .route("/api/v1/documents/render", post(documents::handle_render))
        .route(
            "/api/v1/documents/normalize",
            post(documents::handle_normalize),
        )
        // Ledger API
        .route("/api/v1/ledger/status", get(ledger::handle_status))
        .route("/api/v1/ledger/contracts", post(ledger::handle_deploy))
        .route(
            "/api/v1/ledger/contracts/:address",
            get(ledger::handle_get_contract),
        )
        .route("/api/v1/ledger/verify", post(ledger::handle_verify))
        .route(
            "/api/v1/ledger/verify/upload",
            post(ledger::handle_verify_upload),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::documents::render::render_pdf;
    use crate::drafting::tasks::tests::RecordingGenerator;
    use crate::ledger::fake::FakeLedger;
    use crate::ledger::store::ReceiptPolling;
    use crate::ledger::{parse_address, Address};
    use crate::state::LedgerHandle;

    const ACCOUNT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const BOUNDARY: &str = "counsel-test-boundary";

    fn state_with(generator: Arc<RecordingGenerator>, ledger: Option<Arc<FakeLedger>>) -> AppState {
        AppState {
            llm: generator,
            ledger: ledger.map(|client| LedgerHandle {
                client,
                account: parse_address(ACCOUNT).unwrap(),
                polling: ReceiptPolling {
                    interval: Duration::from_millis(1),
                    timeout: Duration::from_secs(1),
                },
            }),
            config: Config::for_tests(),
        }
    }

    fn app() -> Router {
        build_router(state_with(Arc::new(RecordingGenerator::default()), None))
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, fields: &[(&str, &str)], file: (&str, Vec<u8>)) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        let (name, data) = file;
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"contract.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn draft_body() -> Value {
        json!({
            "task": "draft",
            "contract_type": "Non-Disclosure Agreement",
            "party_one": "Acme Corp",
            "party_two": "Globex LLC",
            "contract_terms": "Two year term"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "counsel");
    }

    #[tokio::test]
    async fn test_contract_types_listed() {
        let request = Request::get("/api/v1/assistant/contract-types")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["contract_types"].as_array().unwrap().is_empty());
        assert_eq!(body["default_country"], "the United States");
    }

    #[tokio::test]
    async fn test_run_task_returns_model_text_verbatim() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = build_router(state_with(generator.clone(), None));
        let mut body = draft_body();
        body["parameters"] = json!({ "max_new_tokens": 300 });

        let (status, body) = send(app, json_request(Method::POST, "/api/v1/assistant/tasks", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"], "draft");
        assert_eq!(body["text"], "  **Generated** contract\n");
        assert_eq!(body["model_id"], "test/model");
        assert_eq!(body["parameters"]["max_new_tokens"], 300);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Acme Corp"));
        assert!(prompts[0].contains("the United States"));
    }

    #[tokio::test]
    async fn test_run_task_rejects_empty_field_without_calling_model() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = build_router(state_with(generator.clone(), None));
        let mut body = draft_body();
        body["party_two"] = json!("");

        let (status, body) = send(app, json_request(Method::POST, "/api/v1/assistant/tasks", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_task_is_rejected() {
        let body = json!({ "task": "summarize", "contract_text": "x" });
        let (status, _) = send(app(), json_request(Method::POST, "/api/v1/assistant/tasks", body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_model_failure_is_bad_gateway() {
        let generator = Arc::new(RecordingGenerator {
            fail: true,
            ..Default::default()
        });
        let app = build_router(state_with(generator, None));
        let (status, body) =
            send(app, json_request(Method::POST, "/api/v1/assistant/tasks", draft_body())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "LLM_ERROR");
    }

    #[tokio::test]
    async fn test_preview_does_not_call_model() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = build_router(state_with(generator.clone(), None));
        let body = json!({ "task": "review", "contract_text": "The tenant pays rent monthly." });

        let (status, body) =
            send(app, json_request(Method::POST, "/api/v1/assistant/tasks/preview", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"], "review");
        assert!(body["prompt"]
            .as_str()
            .unwrap()
            .contains("The tenant pays rent monthly."));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_task_runs_on_pdf_text() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = build_router(state_with(generator.clone(), None));
        let pdf = render_pdf("Termination requires ninety days written notice.", "lease").unwrap();
        let request = multipart_request(
            "/api/v1/assistant/tasks/upload",
            &[("task", "review"), ("max_new_tokens", "250")],
            ("file", pdf),
        );

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"], "review");
        assert_eq!(body["parameters"]["max_new_tokens"], 250);
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].to_lowercase().contains("termination"));
    }

    #[tokio::test]
    async fn test_upload_compare_requires_second_file() {
        let pdf = render_pdf("Original terms", "original").unwrap();
        let request = multipart_request(
            "/api/v1/assistant/tasks/upload",
            &[("task", "compare")],
            ("file", pdf),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_draft_rejected_before_reading_file() {
        let generator = Arc::new(RecordingGenerator::default());
        let app = build_router(state_with(generator.clone(), None));
        // Not a PDF: reading it would fail with PDF_ERROR instead.
        let request = multipart_request(
            "/api/v1/assistant/tasks/upload",
            &[("task", "draft")],
            ("file", b"not a pdf".to_vec()),
        );
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_normalize_route() {
        let body = json!({ "text": "## Terms\n\nSignature: ____" });
        let (status, body) =
            send(app(), json_request(Method::POST, "/api/v1/documents/normalize", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["normalized"], "terms signature: [underscore]");
    }

    #[tokio::test]
    async fn test_render_route_returns_pdf_attachment() {
        let request = json_request(
            Method::POST,
            "/api/v1/documents/render",
            json!({ "text": "Lease agreement", "filename": "lease 2024" }),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains(".pdf"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_extract_rejects_non_pdf_upload() {
        let request = multipart_request(
            "/api/v1/documents/extract",
            &[],
            ("file", b"just some text".to_vec()),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PDF_ERROR");
    }

    #[tokio::test]
    async fn test_ledger_routes_validate_before_availability() {
        let bad = json!({ "address": "0xSomeOtherAddress", "contract_text": "x" });
        let (status, _) = send(app(), json_request(Method::POST, "/api/v1/ledger/verify", bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let good = json!({ "address": ACCOUNT, "contract_text": "x" });
        let (status, body) = send(app(), json_request(Method::POST, "/api/v1/ledger/verify", good)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "LEDGER_UNAVAILABLE");

        let empty = json!({ "contract_text": "" });
        let (status, _) = send(app(), json_request(Method::POST, "/api/v1/ledger/contracts", empty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_address_never_reaches_ledger() {
        let ledger = Arc::new(FakeLedger::default());
        let app = build_router(state_with(Arc::new(RecordingGenerator::default()), Some(ledger.clone())));
        let body = json!({ "address": "0x1234", "contract_text": "Terms" });

        let (status, body) = send(app, json_request(Method::POST, "/api/v1/ledger/verify", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(ledger.call_count(), 0);
    }

    #[tokio::test]
    async fn test_store_fetch_and_verify_round_trip() {
        let ledger = Arc::new(FakeLedger::default());
        let app = build_router(state_with(Arc::new(RecordingGenerator::default()), Some(ledger)));
        let text = "# Lease\n\nTenant: **Jane Roe**\nRent: $1,200 per month";

        let (status, deployment) = send(
            app.clone(),
            json_request(Method::POST, "/api/v1/ledger/contracts", json!({ "contract_text": text })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let address = deployment["address"].as_str().unwrap().to_string();
        assert!(address.parse::<Address>().is_ok());

        let request = Request::get(format!("/api/v1/ledger/contracts/{address}"))
            .body(Body::empty())
            .unwrap();
        let (status, record) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["contract_content"], text);

        let reformatted = "LEASE\nTenant: Jane Roe\nRent: $1,200 per month";
        let (status, verification) = send(
            app.clone(),
            json_request(
                Method::POST,
                "/api/v1/ledger/verify",
                json!({ "address": address, "contract_text": reformatted }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verification["matched"], true);
        assert!(verification["diff"].is_null());

        let (_, verification) = send(
            app,
            json_request(
                Method::POST,
                "/api/v1/ledger/verify",
                json!({ "address": address, "contract_text": "Rent: $900 per month" }),
            ),
        )
        .await;
        assert_eq!(verification["matched"], false);
        assert!(!verification["diff"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_balance() {
        let ledger = Arc::new(FakeLedger::default());
        let app = build_router(state_with(Arc::new(RecordingGenerator::default()), Some(ledger)));
        let request = Request::get("/api/v1/ledger/status").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chain_id"], 11155111);
        assert_eq!(body["balance_ether"], "1.5");
        assert_eq!(body["account"], ACCOUNT);
    }

    #[tokio::test]
    async fn test_verify_upload_reads_pdf() {
        let ledger = Arc::new(FakeLedger::default());
        let app = build_router(state_with(Arc::new(RecordingGenerator::default()), Some(ledger)));
        let text = format!(
            "Consulting agreement between Acme Corp and Globex LLC\n\nSignature: {}",
            "_".repeat(100)
        );
        let (_, deployment) = send(
            app.clone(),
            json_request(Method::POST, "/api/v1/ledger/contracts", json!({ "contract_text": text })),
        )
        .await;
        let address = deployment["address"].as_str().unwrap();

        let pdf = render_pdf(&text, "consulting").unwrap();
        let request = multipart_request(
            "/api/v1/ledger/verify/upload",
            &[("address", address)],
            ("file", pdf),
        );
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], address);
        assert_eq!(body["matched"], true, "diff: {}", body["diff"]);
        assert!(body["diff"].is_null());
        assert!(body["checked_at"].is_string());

        let tampered = render_pdf(&text.replace("Globex", "Initech"), "consulting").unwrap();
        let request = multipart_request(
            "/api/v1/ledger/verify/upload",
            &[("address", address)],
            ("file", tampered),
        );
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matched"], false);
        assert!(!body["diff"].as_str().unwrap().is_empty());
        assert!(body["changed_lines"].as_u64().unwrap() > 0);
    }
}
