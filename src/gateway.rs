use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::redirect::Policy;
use tracing::debug;

pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs";
const DWEB_PREFIX: &str = "dweb:/ipfs/";

/// Public HTTP gateway URL for a CID.
pub fn ipfs_url(cid: &str) -> String {
    format!("{}/{}", IPFS_GATEWAY, cid)
}

/// `dweb:` URI for a CID.
pub fn dweb_url(cid: &str) -> String {
    format!("{}{}", DWEB_PREFIX, cid)
}

/// Result of one reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    /// Gateway answered with a non-2xx status.
    Unreachable(u16),
    /// Transport error or timeout.
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Liveness check for a content identifier.
pub trait Reachability {
    fn probe(&self, cid: &str) -> ProbeOutcome;
}

/// HEAD-request probe against an HTTP gateway.
pub struct GatewayProbe {
    client: Client,
    base_url: String,
}

impl GatewayProbe {
    pub fn new(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = client_builder(timeout).build()?;
        Ok(Self::from_client(client, base_url))
    }

    pub fn from_client(client: Client, base_url: &str) -> Self {
        GatewayProbe {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, cid: &str) -> String {
        format!("{}/{}", self.base_url, cid)
    }
}

/// Redirects are not followed: a 3xx answer counts as unreachable.
fn client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder().timeout(timeout).redirect(Policy::none())
}

impl Reachability for GatewayProbe {
    fn probe(&self, cid: &str) -> ProbeOutcome {
        let url = self.url_for(cid);
        let outcome = match self.client.head(&url).send() {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Reachable,
            Ok(resp) => ProbeOutcome::Unreachable(resp.status().as_u16()),
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        };
        debug!(%url, ?outcome, "gateway probe");
        outcome
    }
}
