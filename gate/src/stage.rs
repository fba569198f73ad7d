use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

/// In-flight login state for one session key.
///
/// The anonymous state is the *absence* of an entry, and the transient
/// password/voice-verified states resolve inside the transition that
/// produces them, so the only representable stages are the ones a request
/// can actually arrive in. Reaching `FacePending` without an accepted
/// voice check is impossible by construction: only the voice-accept
/// transition builds that variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStage {
    /// Password accepted; awaiting voice verification.
    VoicePending { user_id: String, attempts: u8 },
    /// Voice accepted; awaiting face verification.
    FacePending { user_id: String, attempts: u8 },
    /// Fully authenticated; the outer layer mints the real session.
    Authenticated { user_id: String },
}

impl AuthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStage::VoicePending { .. } => "voice_pending",
            AuthStage::FacePending { .. } => "face_pending",
            AuthStage::Authenticated { .. } => "authenticated",
        }
    }

    /// The user this stage belongs to.
    pub fn user_id(&self) -> &str {
        match self {
            AuthStage::VoicePending { user_id, .. }
            | AuthStage::FacePending { user_id, .. }
            | AuthStage::Authenticated { user_id } => user_id,
        }
    }
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-key session map. Each entry is read-modified-written under one
/// lock acquisition; there is no cross-key coordination to serialize.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, AuthStage>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<AuthStage> {
        self.inner.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, stage: AuthStage) {
        self.inner.lock().insert(key.to_string(), stage);
    }

    /// Destroys the session, clearing every transient biometric key.
    pub fn remove(&self, key: &str) -> Option<AuthStage> {
        self.inner.lock().remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        let s = AuthStage::VoicePending {
            user_id: "u".into(),
            attempts: 0,
        };
        assert_eq!(s.to_string(), "voice_pending");
        assert_eq!(s.user_id(), "u");
    }

    #[test]
    fn store_set_get_remove() {
        let store = SessionStore::new();
        assert!(store.get("k").is_none());

        store.set(
            "k",
            AuthStage::Authenticated {
                user_id: "u".into(),
            },
        );
        assert_eq!(store.get("k").unwrap().as_str(), "authenticated");

        store.remove("k");
        assert!(store.get("k").is_none());
    }
}
