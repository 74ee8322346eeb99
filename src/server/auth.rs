//! Request authentication: bearer tokens and action nonces.
//!
//! A bearer token identifies the requester. Every state-changing or admin
//! request also carries a nonce in [`NONCE_HEADER`] that is bound to the
//! requester and the action name. Nonces are derived, not stored: a nonce is
//! a truncated SHA-256 over the current 12-hour tick, the action, the user
//! id and the server secret, and it verifies during its own tick and the
//! following one.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::types::{Requester, RequesterId};

/// Header carrying the action nonce.
pub const NONCE_HEADER: &str = "x-scrivener-nonce";

/// Length of one nonce tick in seconds.
pub const NONCE_TICK_SECS: i64 = 12 * 60 * 60;

/// Hex characters kept from the digest.
const NONCE_LEN: usize = 20;

/// Bearer token → requester table.
///
/// Lookups compare against every token in constant time per entry.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    entries: Vec<(String, Requester)>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, token: impl Into<String>, requester: Requester) -> Self {
        self.entries.push((token.into(), requester));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requester owning `token`, if any.
    pub fn lookup(&self, token: &str) -> Option<&Requester> {
        let mut found = None;
        for (candidate, requester) in &self.entries {
            if bool::from(candidate.as_bytes().ct_eq(token.as_bytes())) {
                found = Some(requester);
            }
        }
        found
    }
}

/// Issues and verifies action nonces.
#[derive(Clone)]
pub struct NonceSigner {
    secret: String,
}

impl NonceSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Nonce for `action` by `user`, valid now.
    pub fn create(&self, action: &str, user: RequesterId) -> String {
        self.create_at(action, user, Utc::now())
    }

    /// Whether `nonce` was issued for `action` and `user` in this tick or the previous one.
    pub fn verify(&self, nonce: &str, action: &str, user: RequesterId) -> bool {
        self.verify_at(nonce, action, user, Utc::now())
    }

    pub(crate) fn create_at(&self, action: &str, user: RequesterId, now: DateTime<Utc>) -> String {
        self.digest(tick(now), action, user)
    }

    pub(crate) fn verify_at(
        &self,
        nonce: &str,
        action: &str,
        user: RequesterId,
        now: DateTime<Utc>,
    ) -> bool {
        let current = tick(now);
        [current, current - 1].into_iter().any(|t| {
            let expected = self.digest(t, action, user);
            bool::from(expected.as_bytes().ct_eq(nonce.as_bytes()))
        })
    }

    fn digest(&self, tick: i64, action: &str, user: RequesterId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tick.to_be_bytes());
        hasher.update(b"|");
        hasher.update(action.as_bytes());
        hasher.update(b"|");
        hasher.update(user.to_be_bytes());
        hasher.update(b"|");
        hasher.update(self.secret.as_bytes());
        let hex: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        hex[..NONCE_LEN].to_string()
    }
}

impl std::fmt::Debug for NonceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceSigner").finish_non_exhaustive()
    }
}

fn tick(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(NONCE_TICK_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn nonce_is_bound_to_action_and_user() {
        let signer = NonceSigner::new("secret");
        let now = Utc::now();
        let nonce = signer.create_at("generate", 7, now);

        assert!(signer.verify_at(&nonce, "generate", 7, now));
        assert!(!signer.verify_at(&nonce, "chat", 7, now));
        assert!(!signer.verify_at(&nonce, "generate", 8, now));
        assert!(!NonceSigner::new("other").verify_at(&nonce, "generate", 7, now));
    }

    #[test]
    fn nonce_survives_one_tick() {
        let signer = NonceSigner::new("secret");
        let issued = Utc::now();
        let nonce = signer.create_at("chat", 1, issued);

        let next_tick = issued + Duration::seconds(NONCE_TICK_SECS);
        assert!(signer.verify_at(&nonce, "chat", 1, next_tick));

        let two_ticks = issued + Duration::seconds(2 * NONCE_TICK_SECS);
        assert!(!signer.verify_at(&nonce, "chat", 1, two_ticks));
    }

    #[test]
    fn garbage_nonce_fails() {
        let signer = NonceSigner::new("secret");
        assert!(!signer.verify("", "generate", 1));
        assert!(!signer.verify("not-a-nonce", "generate", 1));
    }

    #[test]
    fn token_lookup() {
        let tokens = TokenTable::new()
            .insert("tok-admin", Requester::new(1, ["administrator"]))
            .insert("tok-editor", Requester::new(2, ["editor"]));

        assert_eq!(tokens.lookup("tok-editor").map(|r| r.id), Some(2));
        assert!(tokens.lookup("tok-edito").is_none());
        assert!(tokens.lookup("").is_none());
        assert_eq!(tokens.len(), 2);
    }
}
