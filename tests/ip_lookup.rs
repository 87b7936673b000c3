//! IP lookup and dual-stack resolution against mocked HTTP services.
//!
//! Each service (provider, IPv4 echo, IPv6 echo) gets its own mock server so
//! expectations like "never called" are checked per service when the server
//! is dropped.

use ipscope::api::GeolocationClient;
use ipscope::dual_stack::DualStackResolver;
use ipscope::error::LookupError;
use ipscope::location::Locator;
use reqwest::{Client, StatusCode};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_body(ip: &str) -> serde_json::Value {
    json!({
        "ip": ip,
        "network": "203.0.113.0/24",
        "version": "IPv4",
        "city": "Toronto",
        "region": "Ontario",
        "region_code": "ON",
        "country": "CA",
        "country_name": "Canada",
        "country_code": "CA",
        "continent_code": "NA",
        "postal": "M5A",
        "latitude": 43.6547,
        "longitude": -79.3623,
        "timezone": "America/Toronto",
        "utc_offset": "-0500",
        "asn": "AS64500",
        "org": "Example Networks Inc."
    })
}

async fn provider(ip: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_body(ip)))
        .expect(1)
        .mount(&server)
        .await;
    server
}

async fn echo(response: ResponseTemplate, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(response)
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn echo_ip(ip: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ip": ip }))
}

fn locator(provider: &MockServer, v4: &MockServer, v6: &MockServer) -> Locator {
    let http = Client::new();
    Locator::new(
        GeolocationClient::new(http.clone(), format!("{}/json/", provider.uri())),
        DualStackResolver::new(http, format!("{}/", v4.uri()), format!("{}/", v6.uri())),
    )
}

#[tokio::test]
async fn fetch_location_keeps_ip_verbatim() {
    let server = provider("2001:DB8:0:0::1").await;
    let client = GeolocationClient::new(Client::new(), format!("{}/json/", server.uri()));

    let info = client.fetch_location().await.unwrap();

    assert_eq!(info.ip, "2001:DB8:0:0::1");
    assert_eq!(info.city, "Toronto");
    assert_eq!(info.country, "Canada");
    assert_eq!(info.country_code, "CA");
    assert_eq!(info.continent_code, "NA");
    assert_eq!(info.postal_code, "M5A");
    assert_eq!(info.timezone, "America/Toronto");
    assert_eq!(info.isp, "Example Networks Inc.");
    assert_eq!(info.latitude, 43.6547);
    assert_eq!(info.longitude, -79.3623);
}

#[tokio::test]
async fn ipv4_primary_resolves_ipv6_and_skips_ipv4_echo() {
    let provider = provider("203.0.113.5").await;
    let v4 = echo(echo_ip("203.0.113.5"), 0).await;
    let v6 = echo(echo_ip("2001:db8::1"), 1).await;

    let info = locator(&provider, &v4, &v6).locate().await.unwrap();

    assert_eq!(info.ip, "203.0.113.5");
    assert_eq!(info.ipv4.as_deref(), Some("203.0.113.5"));
    assert_eq!(info.ipv6.as_deref(), Some("2001:db8::1"));
}

#[tokio::test]
async fn ipv6_primary_survives_failing_ipv4_echo() {
    let provider = provider("2001:db8::1").await;
    let v4 = echo(ResponseTemplate::new(500), 1).await;
    let v6 = echo(echo_ip("2001:db8::1"), 0).await;

    let info = locator(&provider, &v4, &v6).locate().await.unwrap();

    assert_eq!(info.ipv4, None);
    assert_eq!(info.ipv6.as_deref(), Some("2001:db8::1"));
}

#[tokio::test]
async fn wrong_family_echo_value_is_discarded() {
    let provider = provider("203.0.113.5").await;
    let v4 = echo(echo_ip("203.0.113.5"), 0).await;
    // An IPv6 echo that answered over IPv4.
    let v6 = echo(echo_ip("198.51.100.20"), 1).await;

    let info = locator(&provider, &v4, &v6).locate().await.unwrap();

    assert_eq!(info.ipv4.as_deref(), Some("203.0.113.5"));
    assert_eq!(info.ipv6, None);
}

#[tokio::test]
async fn malformed_echo_body_is_discarded() {
    let provider = provider("2001:db8::1").await;
    let v4 = echo(ResponseTemplate::new(200).set_body_string("not json"), 1).await;
    let v6 = echo(echo_ip("2001:db8::1"), 0).await;

    let info = locator(&provider, &v4, &v6).locate().await.unwrap();

    assert_eq!(info.ipv4, None);
    assert_eq!(info.ipv6.as_deref(), Some("2001:db8::1"));
}

#[tokio::test]
async fn unreachable_echo_service_is_not_an_error() {
    let provider = provider("203.0.113.5").await;
    let v4 = echo(echo_ip("203.0.113.5"), 0).await;
    let http = Client::new();
    // Nothing listens on port 9 of the loopback address.
    let locator = Locator::new(
        GeolocationClient::new(http.clone(), format!("{}/json/", provider.uri())),
        DualStackResolver::new(http, format!("{}/", v4.uri()), "http://127.0.0.1:9/"),
    );

    let info = locator.locate().await.unwrap();
    assert_eq!(info.ipv4.as_deref(), Some("203.0.113.5"));
    assert_eq!(info.ipv6, None);
}

#[tokio::test]
async fn failed_primary_lookup_skips_dual_stack() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&provider)
        .await;
    let v4 = echo(echo_ip("203.0.113.5"), 0).await;
    let v6 = echo(echo_ip("2001:db8::1"), 0).await;

    let err = locator(&provider, &v4, &v6).locate().await.unwrap_err();

    match err {
        LookupError::Status(status) => assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_refusal_is_a_lookup_error() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.5",
            "error": true,
            "reason": "RateLimited",
            "message": "Visit https://ipapi.co/ratelimited/ for details"
        })))
        .mount(&provider)
        .await;
    let v4 = echo(echo_ip("203.0.113.5"), 0).await;
    let v6 = echo(echo_ip("2001:db8::1"), 0).await;

    let err = locator(&provider, &v4, &v6).locate().await.unwrap_err();

    assert!(matches!(err, LookupError::Provider(ref reason) if reason == "RateLimited"));
    assert!(err.to_string().contains("RateLimited"));
}

#[tokio::test]
async fn transport_failure_is_a_lookup_error() {
    let client = GeolocationClient::new(Client::new(), "http://127.0.0.1:9/json/");
    let err = client.fetch_location().await.unwrap_err();
    assert!(matches!(err, LookupError::Http(_)));
}
