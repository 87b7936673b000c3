use crate::config::HttpConfig;
use crate::error::LookupError;
use crate::models::{IpInfo, ProviderResponse};
use reqwest::Client;
use tracing::{debug, info};

/// Builds the HTTP client shared by the provider and echo lookups.
pub fn build_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(config.user_agent.as_str());
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Looks up the caller's public IP and its approximate location.
pub struct GeolocationClient {
    client: Client,
    url: String,
}

impl GeolocationClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// One unauthenticated GET against the provider; no retry.
    ///
    /// The returned record has `ipv4`/`ipv6` unset; see
    /// [`DualStackResolver`](crate::dual_stack::DualStackResolver).
    pub async fn fetch_location(&self) -> Result<IpInfo, LookupError> {
        debug!("Requesting geolocation from {}", self.url);

        let res = self.client.get(&self.url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let raw = res.json::<ProviderResponse>().await?;
        if raw.error {
            let reason = raw.reason.unwrap_or_else(|| "unknown reason".to_string());
            return Err(LookupError::Provider(reason));
        }

        let info = IpInfo::from(raw);
        info!(
            "Geolocation successful - {} in {}, {} ({}, {})",
            info.ip, info.city, info.country_code, info.latitude, info.longitude
        );
        Ok(info)
    }
}
