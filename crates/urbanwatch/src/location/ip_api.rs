use super::resolver::IpLocator;
use super::{LocationFix, LocationSource};
use crate::error::{Result, UrbanError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for ipapi-style JSON endpoints: one GET, no parameters, the caller's
/// public IP decides the answer.
pub struct IpApiClient {
    client: Client,
    url: String,
}

impl IpApiClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("urbanwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl IpLocator for IpApiClient {
    async fn locate(&self) -> Result<LocationFix> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        parse_ip_payload(&body)
    }
}

/// Turns an ipapi response body into a fix.
///
/// The endpoint answers rate limiting and reserved addresses with HTTP 200 and
/// `{"error": true, "reason": ...}`, so the body is checked before the fields.
pub fn parse_ip_payload(body: &Value) -> Result<LocationFix> {
    if body.get("error").and_then(Value::as_bool).unwrap_or(false) {
        let reason = body
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(UrbanError::Location(format!("IP lookup refused: {}", reason)));
    }

    let latitude = number(body, "latitude")
        .ok_or_else(|| UrbanError::Location("IP lookup returned no latitude".to_string()))?;
    let longitude = number(body, "longitude")
        .ok_or_else(|| UrbanError::Location("IP lookup returned no longitude".to_string()))?;

    let mut fix = LocationFix::new(latitude, longitude, LocationSource::IpApi);
    fix.city = text(body, "city");
    fix.country = text(body, "country_name");
    fix.ip = text(body, "ip");
    Ok(fix)
}

fn number(body: &Value, key: &str) -> Option<f64> {
    let v = body.get(key)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
