//! IP-based location resolution.
//!
//! [`Locator`] runs the provider lookup and, only once that succeeded, the
//! dual-stack pass, producing the complete [`IpInfo`] the UI shows. The two
//! steps are strictly sequential; nothing is started speculatively.

use crate::api::{build_client, GeolocationClient};
use crate::config::Config;
use crate::dual_stack::DualStackResolver;
use crate::error::LookupError;
use crate::models::IpInfo;
use tracing::error;

pub struct Locator {
    client: GeolocationClient,
    resolver: DualStackResolver,
}

impl Locator {
    pub fn new(client: GeolocationClient, resolver: DualStackResolver) -> Self {
        Self { client, resolver }
    }

    /// Builds a locator against the endpoints in `config`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = build_client(&config.http)?;
        let client = GeolocationClient::new(http.clone(), &config.endpoints.geolocation_url);
        let resolver = DualStackResolver::new(
            http,
            &config.endpoints.ipv4_echo_url,
            &config.endpoints.ipv6_echo_url,
        );
        Ok(Self::new(client, resolver))
    }

    /// Looks up the primary address and its location, then fills in the
    /// dual-stack fields.
    ///
    /// Only a failure of the primary lookup is an error; the dual-stack pass
    /// degrades to a single family instead.
    pub async fn locate(&self) -> Result<IpInfo, LookupError> {
        let mut info = self.client.fetch_location().await.inspect_err(|e| {
            error!("IP lookup failed: {}", e);
        })?;

        let stack = self.resolver.resolve(&info.ip).await;
        info.ipv4 = stack.ipv4;
        info.ipv6 = stack.ipv6;
        Ok(info)
    }
}
