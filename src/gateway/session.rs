//! Session issuance: turns an upstream token into the `token` cookie.

use super::identity::UpstreamIdentity;

pub const TOKEN_COOKIE_NAME: &str = "token";
pub const THIRTY_DAYS_IN_SECONDS: u64 = 2_592_000;
pub const TWO_HOURS_IN_SECONDS: u64 = 7_200;

/// Lifetime policy requested by the client at sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPolicy {
    pub remember_me: bool,
}

impl SessionPolicy {
    #[must_use]
    pub const fn max_age(self) -> u64 {
        if self.remember_me {
            THIRTY_DAYS_IN_SECONDS
        } else {
            TWO_HOURS_IN_SECONDS
        }
    }
}

/// Cookie descriptor; never persisted server-side.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub token: String,
    pub http_only: bool,
    pub secure: bool,
    pub max_age: u64,
}

impl SessionCookie {
    /// Render as a `Set-Cookie` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut cookie = format!(
            "{TOKEN_COOKIE_NAME}={}; Path=/; SameSite=Lax; Max-Age={}",
            self.token, self.max_age
        );
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Expired cookie that makes the client drop the session.
    #[must_use]
    pub fn cleared(is_dev_environment: bool) -> Self {
        Self {
            token: String::new(),
            http_only: !is_dev_environment,
            secure: !is_dev_environment,
            max_age: 0,
        }
    }
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("token", &"***")
            .field("http_only", &self.http_only)
            .field("secure", &self.secure)
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Derive the session cookie for an authenticated identity.
///
/// Development mode drops both `HttpOnly` and `Secure` so the cookie works over plain
/// HTTP on localhost.
#[must_use]
pub fn issue(
    identity: &UpstreamIdentity,
    remember_me: bool,
    is_dev_environment: bool,
) -> SessionCookie {
    SessionCookie {
        token: identity.token.clone(),
        http_only: !is_dev_environment,
        secure: !is_dev_environment,
        max_age: SessionPolicy { remember_me }.max_age(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn identity() -> UpstreamIdentity {
        UpstreamIdentity {
            token: "abc".to_string(),
            user: Map::new(),
        }
    }

    #[test]
    fn remember_me_in_production() {
        let cookie = issue(&identity(), true, false);
        assert_eq!(cookie.max_age, 2_592_000);
        assert!(cookie.http_only);
        assert!(cookie.secure);
        assert_eq!(
            cookie.header_value(),
            "token=abc; Path=/; SameSite=Lax; Max-Age=2592000; HttpOnly; Secure"
        );
    }

    #[test]
    fn default_lifetime_in_development() {
        let cookie = issue(&identity(), false, true);
        assert_eq!(cookie.max_age, 7_200);
        assert!(!cookie.http_only);
        assert!(!cookie.secure);
        assert_eq!(
            cookie.header_value(),
            "token=abc; Path=/; SameSite=Lax; Max-Age=7200"
        );
    }

    #[test]
    fn issue_is_pure() {
        assert_eq!(issue(&identity(), true, true), issue(&identity(), true, true));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = SessionCookie::cleared(false);
        assert_eq!(
            cookie.header_value(),
            "token=; Path=/; SameSite=Lax; Max-Age=0; HttpOnly; Secure"
        );
    }

    #[test]
    fn debug_output_redacts_token() {
        assert!(!format!("{:?}", issue(&identity(), false, false)).contains("abc"));
    }
}
