//! Full workflow against an in-process fake Tumblebug.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tbinit::config::LoggingConfig;
use tbinit::{
    AppConfig, Bootstrap, CipherError, DecryptionError, Decryptor, InitError,
    ResourceCounts, ResourceLoadFailure, ResourceLoadOutcome, SecretPrompt, TumblebugClient,
};
use zeroize::Zeroizing;

const PASSWORD: &str = "open-sesame";

const CREDENTIALS: &str = r#"
credentialholder:
  admin:
    aws:
      ClientId: AKIAEXAMPLE
      ClientSecret: secret
    azure:
      ClientId: abc
      ClientSecret: ""
    gcp:
      ProjectID: my-project
"#;

/// How the fake answers `loadCommonResource`.
#[derive(Clone)]
enum LoadReply {
    Body(Value),
    Status(StatusCode),
}

struct FakeTumblebug {
    health: StatusCode,
    load: LoadReply,
    registered: Mutex<Vec<String>>,
    load_calls: AtomicUsize,
    authorized: AtomicUsize,
}

impl FakeTumblebug {
    fn new(health: StatusCode, load: LoadReply) -> Arc<Self> {
        Arc::new(Self {
            health,
            load,
            registered: Mutex::new(Vec::new()),
            load_calls: AtomicUsize::new(0),
            authorized: AtomicUsize::new(0),
        })
    }

    fn registered(&self) -> Vec<String> {
        let mut providers = self.registered.lock().unwrap().clone();
        providers.sort();
        providers
    }

    fn check_auth(&self, headers: &HeaderMap) {
        // base64("default:default")
        if headers.get("authorization").and_then(|v| v.to_str().ok())
            == Some("Basic ZGVmYXVsdDpkZWZhdWx0")
        {
            self.authorized.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn readyz(State(fake): State<Arc<FakeTumblebug>>, headers: HeaderMap) -> StatusCode {
    fake.check_auth(&headers);
    fake.health
}

async fn credential(
    State(fake): State<Arc<FakeTumblebug>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fake.check_auth(&headers);
    let provider = body["providerName"].as_str().unwrap_or_default().to_string();
    fake.registered.lock().unwrap().push(provider.clone());

    if provider == "gcp" {
        // Rejections still carry a JSON body that becomes the outcome payload.
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "invalid credential for gcp"})),
        )
            .into_response();
    }
    Json(json!({"message": format!("{provider} credential registered")})).into_response()
}

async fn load_common_resource(
    State(fake): State<Arc<FakeTumblebug>>,
    headers: HeaderMap,
) -> Response {
    fake.check_auth(&headers);
    fake.load_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    match fake.load.clone() {
        LoadReply::Body(body) => Json(body).into_response(),
        LoadReply::Status(status) => (status, "boom").into_response(),
    }
}

async fn serve(fake: Arc<FakeTumblebug>) -> String {
    let app = Router::new()
        .route("/tumblebug/readyz", get(readyz))
        .route("/tumblebug/credential", post(credential))
        .route("/tumblebug/loadCommonResource", get(load_common_resource))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

/// Container bytes are the plaintext; only `PASSWORD` opens them.
struct PasswordOnly;

impl Decryptor for PasswordOnly {
    fn decrypt(
        &self,
        container: &[u8],
        passphrase: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        if passphrase == PASSWORD {
            Ok(Zeroizing::new(container.to_vec()))
        } else {
            Err(CipherError::BadDecrypt)
        }
    }
}

struct Scripted {
    answers: Vec<&'static str>,
    asked: Arc<AtomicUsize>,
}

impl SecretPrompt for Scripted {
    fn prompt_secret(&mut self, _message: &str) -> std::io::Result<String> {
        let n = self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answers.get(n).copied().unwrap_or("").to_string())
    }
}

fn config(server: String, cred_path: &Path) -> AppConfig {
    AppConfig {
        server,
        username: "default".into(),
        password: "default".into(),
        cred_path: cred_path.to_path_buf(),
        cred_file_name: "credentials.yaml.enc".into(),
        key_file_name: ".tmp_enc_key".into(),
        credential_holder: "admin".into(),
        expected_completion_secs: 3,
        registration_concurrency: 5,
        password_attempts: 3,
        logging: LoggingConfig::default(),
    }
}

fn bootstrap(
    server: String,
    cred_path: &Path,
    answers: Vec<&'static str>,
) -> (Bootstrap<PasswordOnly, Scripted>, Arc<AtomicUsize>) {
    std::fs::write(cred_path.join("credentials.yaml.enc"), CREDENTIALS).unwrap();
    let config = config(server, cred_path);
    let client = Arc::new(TumblebugClient::from_config(&config).unwrap());
    let asked = Arc::new(AtomicUsize::new(0));
    let prompt = Scripted {
        answers,
        asked: Arc::clone(&asked),
    };
    let bootstrap = Bootstrap::new(config, client, PasswordOnly, prompt)
        .auto_confirm(true)
        .with_tick(Duration::from_millis(10));
    (bootstrap, asked)
}

#[tokio::test]
async fn full_run_registers_complete_providers_and_loads_resources() {
    let fake = FakeTumblebug::new(
        StatusCode::OK,
        LoadReply::Body(json!({
            "output": ["spec:aws-m5 [OK]", "spec:aws-t2 [Failed]", "image:ubuntu2004 [OK]"]
        })),
    );
    let server = serve(Arc::clone(&fake)).await;
    let dir = tempfile::tempdir().unwrap();
    let (mut bootstrap, asked) = bootstrap(server, dir.path(), vec![PASSWORD]);

    let report = bootstrap.run().await.unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(fake.registered(), vec!["aws", "gcp"]);
    assert_eq!(fake.load_calls.load(Ordering::SeqCst), 1);
    // readyz + 2 credentials + load, all with basic auth
    assert_eq!(fake.authorized.load(Ordering::SeqCst), 4);

    let providers: Vec<_> = report
        .registrations()
        .iter()
        .map(|o| o.provider.as_str())
        .collect();
    assert_eq!(providers, vec!["aws", "azure", "gcp"]);
    assert!(report.registrations()[0].is_registered());
    assert!(report.registrations()[1].is_skipped());
    // A 400 with a JSON body is still a registered payload.
    assert!(report.registrations()[2].is_registered());

    assert_eq!(
        report.resources().outcome,
        ResourceLoadOutcome::Success(ResourceCounts {
            successful_specs: 1,
            failed_specs: 1,
            successful_images: 1,
            failed_images: 0,
        })
    );
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn cached_key_file_avoids_prompting() {
    let fake = FakeTumblebug::new(StatusCode::OK, LoadReply::Body(json!({"output": []})));
    let server = serve(Arc::clone(&fake)).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".tmp_enc_key"), format!("{PASSWORD}\n")).unwrap();
    let (mut bootstrap, asked) = bootstrap(server, dir.path(), vec![]);

    let report = bootstrap.run().await.unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 0);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn exhausted_passwords_stop_before_any_registration() {
    let fake = FakeTumblebug::new(StatusCode::OK, LoadReply::Body(json!({"output": []})));
    let server = serve(Arc::clone(&fake)).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".tmp_enc_key"), "stale").unwrap();
    let (mut bootstrap, asked) = bootstrap(server, dir.path(), vec!["a", "b", "c", PASSWORD]);

    let err = bootstrap.run().await.unwrap_err();

    assert!(matches!(
        err,
        InitError::Decryption(DecryptionError::ExhaustedAttempts { attempts: 3 })
    ));
    assert_ne!(err.exit_code(), 0);
    assert_eq!(asked.load(Ordering::SeqCst), 3);
    assert!(fake.registered().is_empty());
    assert_eq!(fake.load_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_output_field_fails_the_run() {
    let fake = FakeTumblebug::new(StatusCode::OK, LoadReply::Body(json!({"message": "done"})));
    let server = serve(Arc::clone(&fake)).await;
    let dir = tempfile::tempdir().unwrap();
    let (mut bootstrap, _) = bootstrap(server, dir.path(), vec![PASSWORD]);

    let report = bootstrap.run().await.unwrap();

    assert_eq!(
        report.resources().outcome,
        ResourceLoadOutcome::Failure(ResourceLoadFailure::NoOutput)
    );
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn server_error_on_load_is_a_request_failure() {
    let fake = FakeTumblebug::new(
        StatusCode::OK,
        LoadReply::Status(StatusCode::INTERNAL_SERVER_ERROR),
    );
    let server = serve(Arc::clone(&fake)).await;
    let dir = tempfile::tempdir().unwrap();
    let (mut bootstrap, _) = bootstrap(server, dir.path(), vec![PASSWORD]);

    let report = bootstrap.run().await.unwrap();

    match &report.resources().outcome {
        ResourceLoadOutcome::Failure(failure) => {
            assert!(!failure.is_malformed_response());
            assert!(failure.to_string().contains("500"), "got: {failure}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn unhealthy_server_is_fatal_before_decryption() {
    let fake = FakeTumblebug::new(
        StatusCode::SERVICE_UNAVAILABLE,
        LoadReply::Body(json!({"output": []})),
    );
    let server = serve(Arc::clone(&fake)).await;
    let dir = tempfile::tempdir().unwrap();
    let (mut bootstrap, asked) = bootstrap(server, dir.path(), vec![PASSWORD]);

    let err = bootstrap.run().await.unwrap_err();

    assert!(matches!(err, InitError::ServerUnhealthy { status: 503 }));
    assert_eq!(asked.load(Ordering::SeqCst), 0);
    assert!(fake.registered().is_empty());
    assert_eq!(fake.load_calls.load(Ordering::SeqCst), 0);
}
