//! Request and client enrichment from the ambient `RequestContext`.

use beatlog_core::{Ambient, Contribution, EnrichmentStep, LogEvent, RequestContext, StepError};
use serde::Serialize;
use serde_json::Map;

/// Proxy/CDN headers copied verbatim under `url.headers`.
const FORWARDED_HEADERS: &[&str] = &[
    "cf-request-id",
    "cf-ray",
    "cf-warp-tag-id",
    "cf-visitor",
    "cf-ipcountry",
    "cf-cloudflared-proxy-tunnel-hostname",
    "x-forwarded-proto",
    "x-forwarded-for",
    "x-forwarded-host",
];

#[derive(Debug, Serialize)]
struct HttpFields {
    request: HttpRequest,
}

#[derive(Debug, Serialize)]
struct HttpRequest {
    /// Edge ray id
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
}

#[derive(Debug, Serialize)]
struct UrlFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    headers: Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ClientFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo: Option<Geo>,
}

#[derive(Debug, Serialize)]
struct Geo {
    country_iso_code: String,
}

fn header(request: &RequestContext, name: &str) -> Option<String> {
    request.header(name).map(str::to_string)
}

/// `http.request.*` and `url.*` for the in-flight request.
pub struct RequestStep;

impl EnrichmentStep for RequestStep {
    fn name(&self) -> &str {
        "request"
    }

    fn enrich(&self, _event: &LogEvent, ambient: &Ambient) -> Result<Contribution, StepError> {
        let request = &ambient.request;
        if !request.is_http() {
            return Ok(Contribution::none());
        }

        let http = HttpFields {
            request: HttpRequest {
                id: header(request, "cf-ray"),
                method: request.method().map(str::to_string),
            },
        };

        let headers = FORWARDED_HEADERS
            .iter()
            .filter_map(|name| header(request, name).map(|v| (name.to_string(), v.into())))
            .collect();

        let url = UrlFields {
            path: request.uri().map(str::to_string),
            method: request.method().map(str::to_string),
            referer: header(request, "referer"),
            domain: header(request, "host"),
            headers,
        };

        Ok(Contribution::none()
            .with("http", serde_json::to_value(http)?)
            .with("url", serde_json::to_value(url)?))
    }
}

/// `client.*`: who is on the other end of the request.
pub struct ClientStep;

impl EnrichmentStep for ClientStep {
    fn name(&self) -> &str {
        "client"
    }

    fn enrich(&self, _event: &LogEvent, ambient: &Ambient) -> Result<Contribution, StepError> {
        let request = &ambient.request;
        if !request.is_http() {
            return Ok(Contribution::none());
        }

        let client = ClientFields {
            ip: header(request, "cf-connecting-ip")
                .or_else(|| request.remote_addr().map(str::to_string)),
            address: header(request, "x-forwarded-for"),
            geo: header(request, "cf-ipcountry").map(|country_iso_code| Geo { country_iso_code }),
        };

        if client.ip.is_none() && client.address.is_none() && client.geo.is_none() {
            return Ok(Contribution::none());
        }
        Ok(Contribution::none().with("client", serde_json::to_value(client)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatlog_core::{Context, LogLevel, ProcessSnapshot};
    use serde_json::json;

    fn event() -> LogEvent {
        LogEvent::new(LogLevel::Info, "web", "request", Context::new())
    }

    fn with_request(request: RequestContext) -> Ambient {
        Ambient::new(ProcessSnapshot::default(), request)
    }

    #[test]
    fn non_http_contributes_nothing() {
        let ambient = with_request(RequestContext::none());
        assert!(RequestStep.enrich(&event(), &ambient).unwrap().is_empty());
        assert!(ClientStep.enrich(&event(), &ambient).unwrap().is_empty());
    }

    #[test]
    fn request_fields_and_forwarded_headers() {
        let ambient = with_request(
            RequestContext::http("GET", "/orders/42?expand=lines")
                .with_header("Host", "shop.example.com")
                .with_header("Referer", "https://shop.example.com/cart")
                .with_header("CF-Ray", "7d1c2e3f4a5b6c7d-AMS")
                .with_header("X-Forwarded-Proto", "https")
                .with_header("Accept", "text/html"),
        );
        let c = RequestStep.enrich(&event(), &ambient).unwrap();
        assert_eq!(
            c.get("http"),
            Some(&json!({"request": {"id": "7d1c2e3f4a5b6c7d-AMS", "method": "GET"}}))
        );
        assert_eq!(
            c.get("url"),
            Some(&json!({
                "path": "/orders/42?expand=lines",
                "method": "GET",
                "referer": "https://shop.example.com/cart",
                "domain": "shop.example.com",
                "headers": {
                    "cf-ray": "7d1c2e3f4a5b6c7d-AMS",
                    "x-forwarded-proto": "https"
                }
            }))
        );
    }

    #[test]
    fn absent_fields_are_omitted() {
        let ambient = with_request(RequestContext::http("POST", "/hook"));
        let c = RequestStep.enrich(&event(), &ambient).unwrap();
        assert_eq!(c.get("http"), Some(&json!({"request": {"method": "POST"}})));
        assert_eq!(c.get("url"), Some(&json!({"path": "/hook", "method": "POST"})));
    }

    #[test]
    fn client_prefers_edge_ip() {
        let ambient = with_request(
            RequestContext::http("GET", "/")
                .with_remote_addr("10.1.2.3")
                .with_header("CF-Connecting-IP", "198.51.100.23")
                .with_header("X-Forwarded-For", "198.51.100.23, 10.0.0.1")
                .with_header("CF-IPCountry", "DK"),
        );
        let c = ClientStep.enrich(&event(), &ambient).unwrap();
        assert_eq!(
            c.get("client"),
            Some(&json!({
                "ip": "198.51.100.23",
                "address": "198.51.100.23, 10.0.0.1",
                "geo": {"country_iso_code": "DK"}
            }))
        );
    }

    #[test]
    fn client_falls_back_to_remote_addr() {
        let ambient = with_request(RequestContext::http("GET", "/").with_remote_addr("10.1.2.3"));
        let c = ClientStep.enrich(&event(), &ambient).unwrap();
        assert_eq!(c.get("client"), Some(&json!({"ip": "10.1.2.3"})));

        let bare = with_request(RequestContext::http("GET", "/"));
        assert!(ClientStep.enrich(&event(), &bare).unwrap().is_empty());
    }
}
