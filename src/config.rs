//! Configuration types.
//!
//! Read once per invocation. Missing values are reported together so the
//! entry point can log the full list before exiting.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Bluesky PDS entryway.
pub const DEFAULT_SERVICE: &str = "https://bsky.social";

/// Bluesky's post length limit.
pub const DEFAULT_MAX_POST_LENGTH: usize = 300;

pub const USERNAME_VAR: &str = "USERNAME";
pub const PASSWORD_VAR: &str = "PASSWORD";
pub const APPROVED_SENDERS_VAR: &str = "APPROVED_SENDERS";
pub const SERVICE_VAR: &str = "BLUESKY_SERVICE";
pub const MAX_POST_LENGTH_VAR: &str = "MAX_POST_LENGTH";

/// Validated relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Account handle or DID used to log in.
    pub username: String,
    /// App password for the account.
    pub password: SecretString,
    /// Senders whose mail may be republished.
    pub approved_senders: Vec<String>,
    /// Base URL of the AT Protocol service.
    pub service: String,
    /// Maximum characters per post.
    pub max_post_length: usize,
}

impl RelayConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let username = required(USERNAME_VAR);
        let password = required(PASSWORD_VAR);
        let approved_senders = lookup(APPROVED_SENDERS_VAR)
            .map(|raw| parse_sender_list(&raw))
            .filter(|list| !list.is_empty());

        let (username, password, approved_senders) = match (username, password, approved_senders) {
            (Some(u), Some(p), Some(a)) => (u, p, a),
            (u, p, a) => {
                let missing = [
                    (u.is_none(), USERNAME_VAR),
                    (p.is_none(), PASSWORD_VAR),
                    (a.is_none(), APPROVED_SENDERS_VAR),
                ]
                .into_iter()
                .filter(|(absent, _)| *absent)
                .map(|(_, name)| name.to_string())
                .collect();
                return Err(ConfigError::MissingVars(missing));
            }
        };

        let broad = broad_sender_entries(&approved_senders);
        if !broad.is_empty() {
            tracing::warn!(
                entries = ?broad,
                "{APPROVED_SENDERS_VAR} trusts whole domains, not single addresses"
            );
        }

        let service = required(SERVICE_VAR)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string());

        let max_post_length = match required(MAX_POST_LENGTH_VAR) {
            None => DEFAULT_MAX_POST_LENGTH,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: MAX_POST_LENGTH_VAR.to_string(),
                        message: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
        };

        Ok(Self {
            username,
            password: SecretString::from(password),
            approved_senders,
            service,
            max_post_length,
        })
    }

    /// Check whether mail from `sender` may be republished.
    pub fn is_sender_approved(&self, sender: &str) -> bool {
        is_sender_allowed(&self.approved_senders, sender)
    }
}

/// Split a comma-separated sender list, dropping blank entries.
pub fn parse_sender_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Allow-list entries that match more than one address (`*` or a domain).
pub fn broad_sender_entries(allowed: &[String]) -> Vec<&str> {
    allowed
        .iter()
        .map(String::as_str)
        .filter(|a| *a == "*" || !a.contains('@') || a.starts_with('@'))
        .collect()
}

/// Check if a sender email is in the allowlist.
///
/// - Empty list → deny all
/// - `*` in list → allow all
/// - `@domain.com` or `domain.com` → domain match
/// - `user@domain.com` → exact email match
pub fn is_sender_allowed(allowed: &[String], email: &str) -> bool {
    if allowed.is_empty() {
        return false;
    }
    if allowed.iter().any(|a| a == "*") {
        return true;
    }
    let email_lower = email.to_lowercase();
    allowed.iter().any(|a| {
        if a.starts_with('@') {
            email_lower.ends_with(&a.to_lowercase())
        } else if a.contains('@') {
            a.eq_ignore_ascii_case(email)
        } else {
            email_lower.ends_with(&format!("@{}", a.to_lowercase()))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    // ── Loading ─────────────────────────────────────────────────────

    #[test]
    fn loads_required_and_defaults() {
        let cfg = RelayConfig::from_lookup(lookup_from(&[
            ("USERNAME", "alerts.bsky.social"),
            ("PASSWORD", "app-pass"),
            ("APPROVED_SENDERS", "alerts@transit.org, ops@transit.org"),
        ]))
        .unwrap();

        assert_eq!(cfg.username, "alerts.bsky.social");
        assert_eq!(cfg.password.expose_secret(), "app-pass");
        assert_eq!(
            cfg.approved_senders,
            vec!["alerts@transit.org", "ops@transit.org"]
        );
        assert_eq!(cfg.service, DEFAULT_SERVICE);
        assert_eq!(cfg.max_post_length, DEFAULT_MAX_POST_LENGTH);
    }

    #[test]
    fn reports_all_missing_names() {
        let err = RelayConfig::from_lookup(lookup_from(&[("PASSWORD", "x")])).unwrap_err();
        assert_eq!(err.missing(), ["USERNAME", "APPROVED_SENDERS"]);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = RelayConfig::from_lookup(lookup_from(&[
            ("USERNAME", "  "),
            ("PASSWORD", "x"),
            ("APPROVED_SENDERS", " , ,"),
        ]))
        .unwrap_err();
        assert_eq!(err.missing(), ["USERNAME", "APPROVED_SENDERS"]);
    }

    #[test]
    fn optional_overrides() {
        let cfg = RelayConfig::from_lookup(lookup_from(&[
            ("USERNAME", "u"),
            ("PASSWORD", "p"),
            ("APPROVED_SENDERS", "a@b.com"),
            ("BLUESKY_SERVICE", "https://pds.example.net/"),
            ("MAX_POST_LENGTH", "120"),
        ]))
        .unwrap();
        assert_eq!(cfg.service, "https://pds.example.net");
        assert_eq!(cfg.max_post_length, 120);
    }

    #[test]
    fn zero_max_length_is_invalid() {
        let err = RelayConfig::from_lookup(lookup_from(&[
            ("USERNAME", "u"),
            ("PASSWORD", "p"),
            ("APPROVED_SENDERS", "a@b.com"),
            ("MAX_POST_LENGTH", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MAX_POST_LENGTH"));
    }

    // ── Sender allowlist ────────────────────────────────────────────

    #[test]
    fn allowlist_empty_denies_all() {
        assert!(!is_sender_allowed(&[], "anyone@example.com"));
    }

    #[test]
    fn allowlist_exact_email_match() {
        let allowed = vec!["alerts@transit.org".to_string()];
        assert!(is_sender_allowed(&allowed, "alerts@transit.org"));
        assert!(is_sender_allowed(&allowed, "Alerts@Transit.org"));
        assert!(!is_sender_allowed(&allowed, "spoof@transit.org.evil.com"));
    }

    #[test]
    fn allowlist_domain_forms() {
        let allowed = vec!["@transit.org".to_string(), "agency.gov".to_string()];
        assert!(is_sender_allowed(&allowed, "alerts@transit.org"));
        assert!(is_sender_allowed(&allowed, "noreply@agency.gov"));
        assert!(!is_sender_allowed(&allowed, "someone@notagency.gov"));
    }

    #[test]
    fn broad_entries_are_flagged() {
        let allowed = vec![
            "alerts@transit.org".to_string(),
            "@transit.org".to_string(),
            "agency.gov".to_string(),
            "*".to_string(),
        ];
        assert_eq!(
            broad_sender_entries(&allowed),
            ["@transit.org", "agency.gov", "*"]
        );
    }

    #[test]
    fn exact_addresses_are_not_flagged() {
        let allowed = parse_sender_list("alerts@transit.org, ops@transit.org");
        assert!(broad_sender_entries(&allowed).is_empty());
    }

    #[test]
    fn allowlist_wildcard_allows_all() {
        let allowed = vec!["*".to_string()];
        assert!(is_sender_allowed(&allowed, "anyone@example.com"));
    }
}
