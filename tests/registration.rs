//! Integration tests running the registrar against a mock HTTP endpoint.

use bulk_register::{
    registrar, ApiClient, ColumnNames, Console, RegistrarError, RunConfig, RunReport, RunStatus,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get path to test input file.
fn test_input(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("inputs")
        .join(filename)
}

fn config(server: &MockServer, filename: &str) -> RunConfig {
    RunConfig {
        file: test_input(filename),
        delimiter: b',',
        columns: ColumnNames::default(),
        skip: 0,
        api: format!("{}/users/unregistered", server.uri()),
        token: "secret-token".into(),
        bde: "bde-42".into(),
        wait: Duration::ZERO,
        dry_run: false,
        member_default: false,
    }
}

struct Captured {
    result: Result<RunReport, RegistrarError>,
    stdout: String,
    stderr: String,
}

/// Run the blocking registrar off the async runtime and capture its output.
async fn run_and_capture(config: RunConfig) -> Captured {
    tokio::task::spawn_blocking(move || {
        let api = ApiClient::from_config(&config).expect("client should build");
        let mut console = Console::buffered();
        let result = registrar::run(&config, &api, &mut console);
        Captured {
            result,
            stdout: console.stdout_text(),
            stderr: console.stderr_text(),
        }
    })
    .await
    .expect("registrar task should not panic")
}

// ========== Integration Tests ==========

#[tokio::test(flavor = "multi_thread")]
async fn test_created_user_is_posted_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/unregistered"))
        .and(header("Authorization", "secret-token"))
        .and(body_json(json!({
            "email": "a@b.com",
            "bde": "bde-42",
            "firstname": "A",
            "lastname": "B",
            "member": true
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let captured = run_and_capture(config(&server, "single_user.csv")).await;

    let report = captured.result.expect("run should succeed");
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.summary.registered, 1);
    assert!(captured.stdout.contains("User: a@b.com, A, B, True registered with success"));
    assert!(captured.stderr.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_on_third_row_stops_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "email": "c@x.com" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let captured = run_and_capture(config(&server, "five_users.csv")).await;

    let report = captured.result.expect("a 500 is reported, not an error");
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.summary.registered, 2);
    assert_eq!(report.summary.failed, 1);
    assert!(captured.stderr.contains("Server internal error. Canceling script."));
    assert!(!captured.stdout.contains("d@x.com"));
    assert!(!captured.stdout.contains("e@x.com"));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_url_stops_on_first_404() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let captured = run_and_capture(config(&server, "five_users.csv")).await;

    assert_eq!(captured.result.unwrap().status, RunStatus::Stopped);
    assert!(captured.stderr.contains("Got a 404. Is the API URL correct ? Exiting."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bad_request_body_is_reported_and_run_continues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "email": "b@x.com" })))
        .respond_with(ResponseTemplate::new(400).set_body_string("User already exists"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(4)
        .mount(&server)
        .await;

    let captured = run_and_capture(config(&server, "five_users.csv")).await;

    let report = captured.result.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.summary.registered, 4);
    assert_eq!(report.summary.failed, 1);
    assert!(captured
        .stderr
        .contains("Invalid request for : b@x.com, Bob, Durand, False\nError: User already exists"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_email_column_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let captured = run_and_capture(config(&server, "no_email_column.csv")).await;

    assert!(matches!(captured.result, Err(RegistrarError::MissingEmailColumn(_))));
    assert!(captured.stderr.contains("Unable to find email column with name email. Exiting."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dry_run_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let config = RunConfig { dry_run: true, ..config(&server, "single_user.csv") };
    let api = config.api.clone();

    let captured = run_and_capture(config).await;

    assert_eq!(captured.result.unwrap().summary.simulated, 1);
    let line = captured
        .stdout
        .lines()
        .find(|l| l.starts_with("Register user:"))
        .expect("a simulated line");
    for expected in ["a@b.com", "A", "B", "True", api.as_str()] {
        assert!(line.contains(expected), "{:?} missing from {:?}", expected, line);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_semicolon_file_with_custom_columns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "email": "a@x.com", "bde": "bde-42", "firstname": "Alice", "lastname": "Martin", "member": true
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "email": "c@x.com", "bde": "bde-42", "firstname": "Chloe", "lastname": "Petit", "member": true
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let config = RunConfig {
        delimiter: b';',
        columns: ColumnNames {
            email: "Courriel".into(),
            firstname: "Prenom".into(),
            lastname: "Nom".into(),
            member: "member".into(),
        },
        member_default: true,
        ..config(&server, "semicolon.csv")
    };

    let captured = run_and_capture(config).await;

    let report = captured.result.unwrap();
    assert_eq!(report.summary.registered, 2);
    assert_eq!(report.summary.skipped, 1);
    assert!(captured.stdout.contains("Skipping line 3, can't find email."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_skip_and_wait() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    let config = RunConfig {
        skip: 3,
        wait: Duration::from_millis(50),
        ..config(&server, "five_users.csv")
    };

    let started = Instant::now();
    let captured = run_and_capture(config).await;

    assert_eq!(captured.result.unwrap().summary.registered, 2);
    assert!(started.elapsed() >= Duration::from_millis(100));
    let received = server.received_requests().await.unwrap();
    let emails: Vec<String> = received
        .iter()
        .map(|r| r.body_json::<serde_json::Value>().unwrap()["email"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(emails, ["d@x.com", "e@x.com"]);
}
