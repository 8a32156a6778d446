//! Bearer-credential extraction and the development credential verifier.

use ::sse::connection::RecipientId;
use ::sse::session::{AuthError, CredentialVerifier};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use log::*;
use std::collections::HashMap;

/// Pull the bearer credential from the request: the `token` query parameter
/// wins (the browser `EventSource` API cannot set headers), falling back to
/// an `Authorization: Bearer` header.
pub(crate) fn bearer_credential(query_token: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = query_token {
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Config-seeded token-to-recipient map implementing the handshake's
/// credential-verifier contract. Meant for development and seed
/// environments; production deployments inject their own verifier.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, RecipientId>,
}

impl StaticTokenVerifier {
    /// Build from `recipient=token` pairs. Malformed entries are skipped
    /// with a warning rather than failing startup.
    pub fn from_entries(entries: &[String]) -> Self {
        let mut tokens = HashMap::new();
        for entry in entries {
            match entry.split_once('=') {
                Some((recipient, token)) if !recipient.is_empty() && !token.is_empty() => {
                    tokens.insert(token.to_string(), recipient.to_string());
                }
                _ => warn!("Ignoring malformed stream token entry {entry:?}"),
            }
        }

        if tokens.is_empty() {
            warn!("No stream tokens configured; every stream handshake will be rejected");
        }

        Self { tokens }
    }
}

#[async_trait]
impl CredentialVerifier for StaticTokenVerifier {
    async fn verify(&self, credential: &str) -> Result<RecipientId, AuthError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or_else(|| AuthError::new("invalid credential"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_token_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );

        assert_eq!(
            bearer_credential(Some("query-token"), &headers),
            Some("query-token".to_string())
        );
        assert_eq!(
            bearer_credential(None, &headers),
            Some("header-token".to_string())
        );
    }

    #[test]
    fn missing_or_malformed_credentials_extract_to_none() {
        let empty = HeaderMap::new();
        assert_eq!(bearer_credential(None, &empty), None);
        assert_eq!(bearer_credential(Some(""), &empty), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_credential(None, &headers), None);
    }

    #[tokio::test]
    async fn verifier_maps_tokens_to_recipients() {
        let verifier = StaticTokenVerifier::from_entries(&[
            "alice=alice-token".to_string(),
            "malformed".to_string(),
            "=empty".to_string(),
        ]);

        assert_eq!(
            verifier.verify("alice-token").await.ok(),
            Some("alice".to_string())
        );
        assert!(verifier.verify("unknown-token").await.is_err());
        assert!(verifier.verify("malformed").await.is_err());
    }
}
