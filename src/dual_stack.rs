//! Best-effort detection of both address families.
//!
//! The provider only reports the address the lookup arrived from. The
//! resolver takes that primary address as the answer for its own family and
//! asks a single-family echo service for the other one. Hosts behind NAT or
//! CGNAT often have no route for the other family, so a failed echo lookup
//! simply leaves that field empty.

use crate::error::EchoFailure;
use crate::models::{AddressFamily, EchoResponse};
use reqwest::Client;
use tracing::{debug, warn};

/// Addresses known for each family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualStack {
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
}

impl DualStack {
    fn set(&mut self, family: AddressFamily, addr: String) {
        match family {
            AddressFamily::V4 => self.ipv4 = Some(addr),
            AddressFamily::V6 => self.ipv6 = Some(addr),
        }
    }
}

pub struct DualStackResolver {
    client: Client,
    ipv4_echo_url: String,
    ipv6_echo_url: String,
}

impl DualStackResolver {
    pub fn new(
        client: Client,
        ipv4_echo_url: impl Into<String>,
        ipv6_echo_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            ipv4_echo_url: ipv4_echo_url.into(),
            ipv6_echo_url: ipv6_echo_url.into(),
        }
    }

    /// Fills in both families starting from `primary`. Never fails.
    pub async fn resolve(&self, primary: &str) -> DualStack {
        let mut stack = DualStack::default();

        let Some(family) = AddressFamily::classify(primary) else {
            warn!("Primary address {:?} has no recognisable family", primary);
            return stack;
        };
        stack.set(family, primary.to_string());

        let wanted = family.other();
        match self.echo(wanted).await {
            Ok(addr) => {
                debug!("Resolved {} address {}", wanted, addr);
                stack.set(wanted, addr);
            }
            Err(e) => debug!("No {} address, staying single-stack: {}", wanted, e),
        }

        stack
    }

    async fn echo(&self, family: AddressFamily) -> Result<String, EchoFailure> {
        let url = match family {
            AddressFamily::V4 => &self.ipv4_echo_url,
            AddressFamily::V6 => &self.ipv6_echo_url,
        };

        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(EchoFailure::Status(status));
        }

        let body = res.json::<EchoResponse>().await?;
        let addr = body.ip.trim().to_string();
        if AddressFamily::classify(&addr) != Some(family) {
            return Err(EchoFailure::WrongFamily(addr));
        }
        Ok(addr)
    }
}
