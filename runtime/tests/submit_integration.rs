// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end validate and submit flows over the lightweight strategy.

use formpilot::renderer::NoopRenderer;
use formpilot::{Engine, EngineConfig, ExtractionError, FetchStrategy, FieldData};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTACT_PAGE: &str = r#"<html><head><title>Contact us</title></head><body>
    <h1>Contact us</h1>
    <form action="/send" method="post">
        <input type="hidden" name="csrf" value="t0k3n">
        <label for="name">Full name</label><input id="name" name="name">
        <label for="email">Email</label><input id="email" type="email" name="email" required>
        <label for="message">Message</label><textarea id="message" name="message"></textarea>
        <button type="submit">Send</button>
    </form>
</body></html>"#;

const THANKS_PAGE: &str = r#"<html><body>
    <h1>Thank you!</h1>
    <p>Your message has been received and we will reply within two days.</p>
</body></html>"#;

const ERROR_PAGE: &str = r#"<html><body>
    <div class="alert-danger">Something went wrong, please try again.</div>
</body></html>"#;

fn html(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

/// Engine without a browser and without real waits.
fn engine() -> Engine {
    let mut config = EngineConfig::default();
    config.submit.backoff_step_secs = 0;
    config.submit.navigation_retry_delay_ms = 0;
    config.submit.navigation_settle_ms = 0;
    config.submit.submit_settle_ms = 0;
    config.submit.result_settle_ms = 0;
    config.submit.pre_fill_delay_min_ms = 0;
    config.submit.pre_fill_delay_max_ms = 0;
    config.submit.typing_delay_min_ms = 0;
    config.submit.typing_delay_max_ms = 0;
    Engine::new(config, Arc::new(NoopRenderer))
}

async fn contact_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(html(200, CONTACT_PAGE))
        .mount(&server)
        .await;
    server
}

fn ada() -> FieldData {
    [
        ("name", "Ada Lovelace"),
        ("email", "ada@example.com"),
        ("message", "Hello there"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[tokio::test]
async fn test_validate_then_submit() {
    let server = contact_server().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_string_contains("email=ada%40example.com"))
        .and(body_string_contains("csrf=t0k3n"))
        .respond_with(html(200, THANKS_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    let url = format!("{}/contact", server.uri());
    let e = engine();

    let report = e.validate(&url, 0, &ada()).await;
    assert!(report.valid, "issues: {:?}", report.issues);
    assert_eq!(report.matched_fields, 3);

    let result = e.submit(&url, 0, &ada(), 3).await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.strategy, Some(FetchStrategy::Lightweight));
    assert!(result.url_changed);
    assert!(result.final_url.ends_with("/send"));
    assert!(result.score >= 50);
    assert_eq!(result.fill.filled, 3);
    assert_eq!(result.fill.errored, 0);
    assert!(result
        .success_indicators
        .iter()
        .any(|i| i == "text_thank_you"));

    let history = e.history().await;
    assert_eq!(history.total, 1);
    assert_eq!(history.success_rate, 1.0);
}

#[tokio::test]
async fn test_failed_submission_is_retried() {
    let server = contact_server().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(html(200, ERROR_PAGE))
        .expect(3)
        .mount(&server)
        .await;
    let url = format!("{}/contact", server.uri());
    let e = engine();

    let result = e.submit(&url, 0, &ada(), 3).await;
    assert!(!result.success);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.message, "Form submission failed after 3 attempts");
    assert!(result.error.is_some());
    assert!(result
        .error_indicators
        .iter()
        .any(|i| i == "error_element"));

    let attempts = e.attempts().await;
    let ordinals: Vec<u32> = attempts.iter().map(|a| a.attempt).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);
    assert!(attempts.iter().all(|a| !a.success));
    // No browser: every attempt ran over plain HTTP.
    assert!(attempts
        .iter()
        .all(|a| a.strategy == FetchStrategy::Lightweight));
    assert_eq!(e.history().await.success_rate, 0.0);
}

#[tokio::test]
async fn test_missing_form_index_is_terminal() {
    let server = contact_server().await;
    let url = format!("{}/contact", server.uri());
    let e = engine();

    let result = e.submit(&url, 5, &ada(), 3).await;
    assert!(!result.success);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.message, "Form index 5 not found. Found 1 forms.");
    assert_eq!(e.attempts().await.len(), 1);
}

#[tokio::test]
async fn test_page_without_forms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(200, "<html><body><p>Just text.</p></body></html>"))
        .mount(&server)
        .await;
    let url = format!("{}/about", server.uri());
    let e = engine();

    let err = e.extract_form(&url, 0).await.unwrap_err();
    assert!(matches!(err, ExtractionError::NoFormsFound));

    let report = e.validate(&url, 0, &ada()).await;
    assert!(!report.valid);
    assert_eq!(report.issues, vec!["Cannot validate: No forms found on the page"]);
}

#[tokio::test]
async fn test_extract_and_suggest() {
    let server = contact_server().await;
    let url = format!("{}/contact", server.uri());
    let e = engine();

    let form = e.extract_form(&url, 0).await.unwrap();
    assert_eq!(form.fields.len(), 3);
    assert_eq!(form.hidden_fields.len(), 1);
    assert_eq!(form.submit_controls.len(), 1);
    assert!(form.field("email").unwrap().required);

    let suggestions = e.suggest(&url, 0).await.unwrap();
    assert_eq!(suggestions.len(), 3);
    assert!(suggestions.iter().any(|s| s.label == "Email"));
}

#[tokio::test]
async fn test_multipart_form_posts_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apply"))
        .respond_with(html(
            200,
            r#"<html><body><h1>Apply for this position</h1>
            <form action="/apply" method="post" enctype="multipart/form-data">
                <label for="email">Email</label><input id="email" type="email" name="email">
                <label for="cv">Resume</label><input id="cv" type="file" name="cv">
                <button type="submit">Apply</button>
            </form></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apply"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains(r#"name="email""#))
        .and(body_string_contains("ada@example.com"))
        .respond_with(html(200, THANKS_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    // Anything else is the wrong encoding.
    Mock::given(method("POST"))
        .respond_with(html(415, "<html><body>Unsupported media type</body></html>"))
        .with_priority(10)
        .mount(&server)
        .await;
    let url = format!("{}/apply", server.uri());
    let e = engine();

    let form = e.extract_form(&url, 0).await.unwrap();
    assert!(form.is_multipart());

    let data: FieldData = [("email".to_string(), "ada@example.com".to_string())]
        .into_iter()
        .collect();
    let result = e.submit(&url, 0, &data, 1).await;
    assert!(result.success, "{} {:?}", result.message, result.error_indicators);
    assert!(!result.error_indicators.iter().any(|i| i.starts_with("http_error")));
}

#[tokio::test]
async fn test_inaccessible_page_warns_before_submitting() {
    let server = contact_server().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(html(200, THANKS_PAGE))
        .mount(&server)
        .await;
    let url = format!("{}/contact", server.uri());

    let mut config = EngineConfig::default();
    config.submit.backoff_step_secs = 0;
    config.submit.result_settle_ms = 0;
    config.submit.submit_settle_ms = 0;
    // A clean page scores 0.9, below this bar.
    config.probe.accessible_threshold = 0.95;
    let e = Engine::new(config, Arc::new(NoopRenderer));

    let report = e.probe(&url).await;
    assert!(!report.accessible);

    let result = e.submit(&url, 0, &ada(), 1).await;
    assert!(result.success);
    assert_eq!(
        result.warnings.first().map(String::as_str),
        Some("Accessibility: page scored 0.90 (needs more than 0.95), submission may fail")
    );

    // The default bar lets the same page through without a warning.
    let result = engine().submit(&url, 0, &ada(), 1).await;
    assert!(result.success);
    assert!(!result.warnings.iter().any(|w| w.starts_with("Accessibility")));
}
