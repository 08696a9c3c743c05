use keyring::Entry;
use std::env;

const KEYRING_SERVICE: &str = "bulk-events";
const TOKEN_ENV: &str = "BULK_EVENTS_API_TOKEN";

/// Opaque bearer-token supplier.
///
/// Resolution order: explicit value, OS keyring entry `bulk-events/<host>`,
/// then the `BULK_EVENTS_API_TOKEN` environment variable. Tokens are never
/// refreshed here.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    explicit: Option<String>,
}

impl CredentialSource {
    pub fn new(explicit: Option<String>) -> Self {
        Self {
            explicit: explicit.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn resolve(&self, host: &str) -> Option<String> {
        if let Some(t) = &self.explicit {
            return Some(t.clone());
        }

        if let Ok(entry) = Entry::new(KEYRING_SERVICE, host) {
            if let Ok(token) = entry.get_password() {
                return Some(token);
            }
        }

        env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_token_wins() {
        let src = CredentialSource::new(Some("tok-123".into()));
        assert_eq!(src.resolve("localhost").as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_blank_explicit_token_is_ignored() {
        let src = CredentialSource::new(Some("   ".into()));
        assert!(src.explicit.is_none());
    }
}
