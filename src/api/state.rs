use url::Url;

use crate::gateway::{flow::FlowSigner, IdentityBroker};

/// Process-wide state shared by every handler; built once and never mutated.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub broker: IdentityBroker,
    pub flow: FlowSigner,
    pub public_url: Url,
    /// Development mode: cookies lose `HttpOnly` and `Secure`.
    pub dev: bool,
}

impl GatewayState {
    #[must_use]
    pub const fn new(broker: IdentityBroker, flow: FlowSigner, public_url: Url, dev: bool) -> Self {
        Self {
            broker,
            flow,
            public_url,
            dev,
        }
    }

    /// Whether auxiliary cookies (the OAuth flow cookie) carry `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        !self.dev && self.public_url.scheme() == "https"
    }
}
