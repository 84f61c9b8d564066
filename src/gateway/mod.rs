//! Identity-broker core: credential verification, provider adapters, the broker and
//! session issuance. Nothing in here writes an HTTP response.

pub mod broker;
pub mod error;
pub mod flow;
pub mod identity;
pub mod provider;
pub mod session;
pub mod upstream;

pub use broker::IdentityBroker;
pub use error::AuthError;
pub use identity::{Credentials, NormalizedIdentity, UpstreamIdentity};
pub use session::{SessionCookie, SessionPolicy};
