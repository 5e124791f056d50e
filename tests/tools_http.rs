//! HTTP behaviour of the search and keyword tools against a mock upstream.

use agent_relay::config::{KeywordSettings, SearchSettings};
use agent_relay::tools::{KeywordDataTool, SearchTool, NO_ORGANIC_RESULTS};
use agent_relay::ToolInvoker;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_tool(server: &MockServer, timeout: Duration) -> ToolInvoker {
    let settings = SearchSettings {
        endpoint: format!("{}/v1/queries", server.uri()),
        username: Some("user".into()),
        password: Some("pass".into()),
        ..Default::default()
    };
    SearchTool::new(settings).into_invoker(timeout).unwrap()
}

fn keyword_tool(server: &MockServer) -> ToolInvoker {
    let settings = KeywordSettings {
        endpoint: format!("{}/v3/keyword_overview", server.uri()),
        login: Some("login".into()),
        password: Some("secret".into()),
        ..Default::default()
    };
    KeywordDataTool::new(settings)
        .into_invoker(Duration::from_secs(5))
        .unwrap()
}

#[tokio::test]
async fn search_renders_organic_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/queries"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "source": "google_search",
            "query": "Mastela swing reddit",
            "parse": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"content": {"results": {"organic": [
                {"title": "Mastela review", "url": "https://r.example/1", "desc": "Quiet motor"},
                {"title": "Swing vs bouncer", "url": "https://r.example/2", "desc": "Comparison"}
            ]}}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = search_tool(&server, Duration::from_secs(5))
        .invoke_with_args(&json!({"query": "Mastela swing reddit"}))
        .await;

    assert_eq!(
        output,
        "Title: Mastela review\nLink: https://r.example/1\nSnippet: Quiet motor\n\n\
         Title: Swing vs bouncer\nLink: https://r.example/2\nSnippet: Comparison"
    );
}

#[tokio::test]
async fn search_empty_organic_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"content": {"results": {"organic": []}}}]
        })))
        .mount(&server)
        .await;

    let output = search_tool(&server, Duration::from_secs(5)).invoke("anything").await;
    assert_eq!(output, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn search_non_json_body_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let output = search_tool(&server, Duration::from_secs(5)).invoke("anything").await;
    assert_eq!(output, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn search_server_error_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let output = search_tool(&server, Duration::from_secs(5)).invoke("anything").await;
    assert_eq!(output, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn search_timeout_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let output = search_tool(&server, Duration::from_millis(100))
        .invoke("slow")
        .await;
    assert_eq!(output, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn search_empty_query_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = search_tool(&server, Duration::from_secs(5))
        .invoke_with_args(&json!({"query": "  "}))
        .await;
    assert_eq!(output, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn search_connection_refused_is_sentinel() {
    let settings = SearchSettings {
        endpoint: "http://127.0.0.1:9/v1/queries".into(),
        ..Default::default()
    };
    let tool = SearchTool::new(settings)
        .into_invoker(Duration::from_secs(2))
        .unwrap();
    assert_eq!(tool.invoke("offline").await, NO_ORGANIC_RESULTS);
}

#[tokio::test]
async fn keyword_renders_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/keyword_overview"))
        .and(body_json(json!([{
            "location_code": 2710,
            "language_code": "en",
            "keywords": ["electric baby swing"]
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [{"result": [{"items": [{
                "keyword_info": {"search_volume": 2400},
                "search_intent_info": {"main_intent": "commercial"}
            }]}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = keyword_tool(&server)
        .invoke_with_args(&json!({"keyword": "electric baby swing"}))
        .await;
    assert_eq!(
        output,
        "Keyword: electric baby swing | Vol: 2400 | Intent: commercial"
    );
}

#[tokio::test]
async fn keyword_missing_items_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [{"result": [{"items": null}]}]
        })))
        .mount(&server)
        .await;

    let output = keyword_tool(&server).invoke("baby bassinet").await;
    assert_eq!(output, "No data found for 'baby bassinet'.");
}

#[tokio::test]
async fn keyword_unauthorised_is_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let output = keyword_tool(&server).invoke("crib").await;
    assert_eq!(output, "No data found for 'crib'.");
}
