//! End-to-end scenarios: logger, enricher, formatter and sinks together.

use std::fs;

use beatlog::{
    Context, Ecs, EventCategory, EventFields, EventOutcome, LogLevel, Logger, MemorySink,
    ProcessSnapshot, RequestContext, RotatingFileSink, RotationPolicy, Throwable,
};
use serde_json::{json, Value};

fn process() -> ProcessSnapshot {
    ProcessSnapshot {
        pid: 2201,
        executable: Some("/srv/shop/bin/shop-api".into()),
        args: vec!["shop-api".into(), "--port".into(), "8080".into()],
    }
}

fn parse_lines(raw: &str) -> Vec<Value> {
    raw.lines()
        .map(|l| serde_json::from_str(l).expect("every line is one JSON object"))
        .collect()
}

#[test]
fn db_down_rotates_into_two_generations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.log");
    let sink = RotatingFileSink::new(&path, RotationPolicy::new(100, 2).unwrap()).unwrap();
    let mut logger = Logger::builder("shop")
        .process_snapshot(process())
        .sink(sink)
        .build();

    for attempt in 1..=3 {
        let context = Context::new()
            .with("attempt", json!(attempt))
            .with_exception(Throwable::new("ConnectionError", "db down").with_code(2002));
        logger.log(LogLevel::Error, "db down", context);
    }
    logger.close();

    let read = |name: &str| parse_lines(&fs::read_to_string(dir.path().join(name)).unwrap());
    let live = read("shop.log");
    let first_backup = read("shop.log.1");
    let second_backup = read("shop.log.2");

    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["attempt"], 3);
    assert_eq!(first_backup[0]["attempt"], 2);
    assert_eq!(second_backup[0]["attempt"], 1);
    assert!(!dir.path().join("shop.log.3").exists());

    let record = &live[0];
    assert_eq!(record["message"], "db down");
    assert_eq!(record["log.severity"], 3);
    assert_eq!(record["stream"], "stderr");
    assert_eq!(record["error"]["type"], "ConnectionError");
    assert_eq!(record["error"]["code"], "2002");
    assert!(record.get("exception").is_none());
}

#[test]
fn no_http_context_still_has_process() {
    let sink = MemorySink::new();
    let mut logger = Logger::builder("cron")
        .process_snapshot(process())
        .sink(sink.clone())
        .build();
    logger.info("nightly export finished", Context::new());

    let record = &parse_lines(&sink.contents())[0];
    assert!(record.get("http").is_none());
    assert!(record.get("url").is_none());
    assert!(record.get("client").is_none());
    assert_eq!(
        record["process"],
        json!({
            "name": "shop-api",
            "pid": 2201,
            "executable": "/srv/shop/bin/shop-api",
            "args_count": 3,
            "command_line": "shop-api --port 8080"
        })
    );
}

#[test]
fn malformed_user_agent_still_yields_a_valid_line() {
    let sink = MemorySink::new();
    let mut logger = Logger::builder("web")
        .process_snapshot(process())
        .request_context(
            RequestContext::http("GET", "/").with_header("User-Agent", "\u{7}\u{7}\u{7}"),
        )
        .sink(sink.clone())
        .build();
    logger.notice("landing page", Context::new());

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    let record: Value = serde_json::from_str(&lines[0]).unwrap();
    assert!(record["user_agent"]["error"]["message"].is_string());
    assert_eq!(record["user_agent"]["original"], "\u{7}\u{7}\u{7}");
}

#[test]
fn full_request_enrichment_from_cgi_vars() {
    let request = RequestContext::from_cgi_vars([
        ("REQUEST_METHOD", "POST"),
        ("REQUEST_URI", "/api/orders"),
        ("REMOTE_ADDR", "10.0.0.7"),
        ("HTTP_HOST", "shop.example.com"),
        ("HTTP_REFERER", "https://shop.example.com/cart"),
        ("HTTP_CF_RAY", "8a1b2c3d4e5f6a7b-CPH"),
        ("HTTP_CF_CONNECTING_IP", "203.0.113.9"),
        ("HTTP_CF_IPCOUNTRY", "DK"),
        ("HTTP_X_FORWARDED_FOR", "203.0.113.9"),
        (
            "HTTP_USER_AGENT",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
        ),
        ("PATH", "/usr/bin"),
    ]);

    let sink = MemorySink::new();
    let mut logger = Logger::builder("api")
        .process_snapshot(process())
        .request_context(request)
        .sink(sink.clone())
        .build();
    logger.warning("payment retried", Context::new());

    let record = &parse_lines(&sink.contents())[0];
    assert_eq!(
        record["http"],
        json!({"request": {"id": "8a1b2c3d4e5f6a7b-CPH", "method": "POST"}})
    );
    assert_eq!(record["url"]["path"], "/api/orders");
    assert_eq!(record["url"]["domain"], "shop.example.com");
    assert_eq!(record["url"]["referer"], "https://shop.example.com/cart");
    assert_eq!(record["url"]["headers"]["cf-ray"], "8a1b2c3d4e5f6a7b-CPH");
    assert_eq!(record["url"]["headers"]["x-forwarded-for"], "203.0.113.9");
    assert_eq!(
        record["client"],
        json!({
            "ip": "203.0.113.9",
            "address": "203.0.113.9",
            "geo": {"country_iso_code": "DK"}
        })
    );
    assert_eq!(record["user_agent"]["browser"]["name"], "Safari");
    assert_eq!(record["user_agent"]["os"]["name"], "Mac OS X");
    assert_eq!(record["user_agent"]["device"]["name"], "Mac");
    assert_eq!(record["stream"], "stderr");
}

#[test]
fn ecs_builder_context_lands_at_top_level() {
    let sink = MemorySink::new();
    let mut logger = Logger::builder("auth")
        .process_snapshot(process())
        .sink(sink.clone())
        .build();

    let context = Ecs::new()
        .with_event(
            EventFields::new(
                "user-login",
                vec![EventCategory::Authentication, EventCategory::Session],
                "auth.login",
                EventOutcome::Failure,
            )
            .reason("password mismatch"),
        )
        .into_context();
    logger.info("login rejected", context);

    let record = &parse_lines(&sink.contents())[0];
    assert_eq!(record["event"]["category"], json!(["authentication", "session"]));
    assert_eq!(record["event"]["outcome"], "failure");
    assert_eq!(record["event"]["reason"], "password mismatch");
}
