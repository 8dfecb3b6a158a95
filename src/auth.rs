//! Bearer-token authentication against a static tenant table.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

const BEARER_PREFIX: &str = "bearer ";

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "FxGate Currency Exchange API";

/// Reasons an `Authorization` header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Only bearer authentication is supported.")]
    NotBearer,
    #[error("Could not parse bearer token.")]
    MalformedToken,
    #[error("Given token did not match any tenants.")]
    UnknownToken,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Tenant name; this is the key the rate limiter counts against.
    pub tenant: String,
    /// The token the tenant presented.
    pub token: Uuid,
}

/// Resolves `Authorization: Bearer <uuid>` headers to tenants.
#[derive(Debug, Clone, Default)]
pub struct BearerAuthenticator {
    tenants: HashMap<Uuid, String>,
}

impl BearerAuthenticator {
    /// Create an authenticator over a token -> tenant table.
    pub fn new(tenants: HashMap<Uuid, String>) -> Self {
        Self { tenants }
    }

    /// Number of known tokens.
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Authenticate the raw `Authorization` header value.
    ///
    /// A missing header is not an error: it yields `Ok(None)` and the caller
    /// decides whether anonymous access is acceptable.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Option<Identity>, AuthError> {
        let Some(header) = header else {
            return Ok(None);
        };

        let token = match header.get(..BEARER_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
                &header[BEARER_PREFIX.len()..]
            }
            _ => return Err(AuthError::NotBearer),
        };

        let token = Uuid::parse_str(token.trim()).map_err(|_| AuthError::MalformedToken)?;

        let tenant = self.tenants.get(&token).ok_or(AuthError::UnknownToken)?;

        Ok(Some(Identity {
            tenant: tenant.clone(),
            token,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME: &str = "71fe92a8-e54b-4e99-a130-d960dcd0436e";

    fn authenticator() -> BearerAuthenticator {
        let mut tenants = HashMap::new();
        tenants.insert(Uuid::parse_str(ACME).unwrap(), "acme".to_string());
        BearerAuthenticator::new(tenants)
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(authenticator().authenticate(None), Ok(None));
    }

    #[test]
    fn test_known_token_resolves_tenant() {
        let identity = authenticator()
            .authenticate(Some(&format!("Bearer {ACME}")))
            .unwrap()
            .unwrap();

        assert_eq!(identity.tenant, "acme");
        assert_eq!(identity.token.to_string(), ACME);
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let upper = format!("BEARER {}", ACME.to_uppercase());
        let identity = authenticator().authenticate(Some(&upper)).unwrap();
        assert_eq!(identity.map(|i| i.tenant), Some("acme".to_string()));
    }

    #[test]
    fn test_other_schemes_rejected() {
        let auth = authenticator();
        assert_eq!(
            auth.authenticate(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::NotBearer)
        );
        assert_eq!(auth.authenticate(Some("Bear")), Err(AuthError::NotBearer));
        assert_eq!(auth.authenticate(Some("")), Err(AuthError::NotBearer));
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert_eq!(
            authenticator().authenticate(Some("Bearer not-a-uuid")),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn test_unknown_token_rejected() {
        let stranger = format!("Bearer {}", Uuid::new_v4());
        assert_eq!(
            authenticator().authenticate(Some(&stranger)),
            Err(AuthError::UnknownToken)
        );
    }

    #[test]
    fn test_multibyte_header_does_not_panic() {
        assert_eq!(
            authenticator().authenticate(Some("Bé ")),
            Err(AuthError::NotBearer)
        );
    }
}
