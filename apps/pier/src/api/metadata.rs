use std::fmt;

/// Protocol version headers sent with every call, as `(name, "current,minimum")`.
pub const PROTOCOL_HEADERS: &[(&str, &str)] = &[
    ("client-api-protocol", "1,1"),
    ("client-entrypoint-protocol", "1,1"),
];

pub const AUTHORIZATION: &str = "authorization";

/// Request metadata attached to unary calls, streams and the exec upgrade.
#[derive(Clone, Default)]
pub struct RequestMetadata {
    token: Option<String>,
}

impl RequestMetadata {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers: Vec<(&'static str, String)> = PROTOCOL_HEADERS
            .iter()
            .map(|(name, value)| (*name, (*value).to_string()))
            .collect();
        if let Some(token) = &self.token {
            headers.push((AUTHORIZATION, format!("Bearer {token}")));
        }
        headers
    }
}

impl fmt::Debug for RequestMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestMetadata")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_metadata_carries_only_protocol_headers() {
        let headers = RequestMetadata::new(None).headers();
        assert_eq!(headers.len(), PROTOCOL_HEADERS.len());
        assert!(headers.iter().all(|(name, _)| *name != AUTHORIZATION));
    }

    #[test]
    fn token_becomes_bearer_header() {
        let metadata = RequestMetadata::new(Some("s3cret".into()));
        assert!(metadata.is_authenticated());
        let headers = metadata.headers();
        assert!(headers.contains(&(AUTHORIZATION, "Bearer s3cret".to_string())));
        assert!(headers.contains(&("client-api-protocol", "1,1".to_string())));
    }

    #[test]
    fn blank_token_is_ignored_and_debug_redacts() {
        assert!(!RequestMetadata::new(Some("  ".into())).is_authenticated());
        let rendered = format!("{:?}", RequestMetadata::new(Some("s3cret".into())));
        assert!(!rendered.contains("s3cret"));
    }
}
