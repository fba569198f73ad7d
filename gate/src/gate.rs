use std::sync::Arc;

use examgate_verify::{Decision, Scorer, VerifyError};
use tracing::{info, warn};

use crate::{AuthStage, CredentialStore, GateError, SessionStore};

/// Attempt budget per biometric stage. Counters are independent: three
/// voice rejections and three face rejections are both available within
/// one login.
pub const MAX_ATTEMPTS: u8 = 3;

/// The scoring capability the gate sequences. Implemented by
/// [`examgate_verify::Scorer`]; test doubles implement it directly.
pub trait BiometricScorer: Send + Sync {
    fn verify_voice(&self, user_id: &str, wav_bytes: &[u8]) -> Result<Decision, VerifyError>;
    fn verify_face(&self, user_id: &str, image_bytes: &[u8]) -> Result<Decision, VerifyError>;
    fn has_voice_model(&self, user_id: &str) -> Result<bool, VerifyError>;
    fn has_face_model(&self, user_id: &str) -> Result<bool, VerifyError>;
}

impl BiometricScorer for Scorer {
    fn verify_voice(&self, user_id: &str, wav_bytes: &[u8]) -> Result<Decision, VerifyError> {
        Scorer::verify_voice(self, user_id, wav_bytes)
    }

    fn verify_face(&self, user_id: &str, image_bytes: &[u8]) -> Result<Decision, VerifyError> {
        Scorer::verify_face(self, user_id, image_bytes)
    }

    fn has_voice_model(&self, user_id: &str) -> Result<bool, VerifyError> {
        Scorer::has_voice_model(self, user_id)
    }

    fn has_face_model(&self, user_id: &str) -> Result<bool, VerifyError> {
        Scorer::has_face_model(self, user_id)
    }
}

/// Result of the password stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PasswordOutcome {
    /// Unknown user or wrong password. No session is created.
    Rejected,
    /// Password accepted; a voice check is now pending.
    VoiceRequired,
    /// Password accepted and no biometric gate applies: non-student role,
    /// or a student with no trained voice model.
    Authenticated { user_id: String },
}

/// Where an accepted biometric check leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// The face stage is next.
    Face,
    /// Fully authenticated.
    Done,
}

/// Result of one biometric submission.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Check passed (or the stage's model turned out untrained and the
    /// bypass rule applied, in which case there is no score).
    Accepted { next: NextStep, score: Option<f64> },
    /// Check failed or the media was unusable; the attempt counter moved.
    Retry {
        attempts_remaining: u8,
        score: Option<f64>,
        reason: String,
    },
    /// Attempt budget exhausted. The session is destroyed; the caller
    /// must restart from the password stage.
    Exhausted,
}

/// Sequences password -> voice -> face with bounded, independent retries.
///
/// The two modalities gate sequentially, each with its own attempt
/// budget; there is no merged score.
pub struct LoginGate {
    creds: Arc<dyn CredentialStore>,
    scorer: Arc<dyn BiometricScorer>,
    sessions: SessionStore,
}

impl LoginGate {
    pub fn new(creds: Arc<dyn CredentialStore>, scorer: Arc<dyn BiometricScorer>) -> Self {
        Self {
            creds,
            scorer,
            sessions: SessionStore::new(),
        }
    }

    /// Current stage for a session key, if a login is in flight.
    pub fn stage(&self, session_key: &str) -> Option<AuthStage> {
        self.sessions.get(session_key)
    }

    /// Destroys any in-flight or authenticated session for the key.
    pub fn logout(&self, session_key: &str) {
        if let Some(stage) = self.sessions.remove(session_key) {
            info!(session = %session_key, from = %stage, "logout");
        }
    }

    /// Password stage. Any previous in-flight login for this key is
    /// discarded first, so every login starts from a clean slate.
    pub fn submit_password(
        &self,
        session_key: &str,
        username: &str,
        secret: &str,
    ) -> Result<PasswordOutcome, GateError> {
        self.sessions.remove(session_key);

        let Some(user) = self.creds.find_user(username) else {
            return Ok(PasswordOutcome::Rejected);
        };
        if !self.creds.check_password(&user.id, secret) {
            info!(user = %user.id, "password rejected");
            return Ok(PasswordOutcome::Rejected);
        }

        // Non-biometric accounts and students with no enrolled voice model
        // skip the biometric stages entirely.
        let needs_voice = user.role.requires_biometrics()
            && self
                .scorer
                .has_voice_model(&user.id)
                .map_err(backend_fatal)?;

        if !needs_voice {
            self.sessions.set(
                session_key,
                AuthStage::Authenticated {
                    user_id: user.id.clone(),
                },
            );
            info!(user = %user.id, role = %user.role, "authenticated without biometric stages");
            return Ok(PasswordOutcome::Authenticated { user_id: user.id });
        }

        self.sessions.set(
            session_key,
            AuthStage::VoicePending {
                user_id: user.id.clone(),
                attempts: 0,
            },
        );
        info!(user = %user.id, to = "voice_pending", "password accepted");
        Ok(PasswordOutcome::VoiceRequired)
    }

    /// Voice stage. Rejections and unusable media both consume an
    /// attempt; the third failure destroys the session.
    pub fn submit_voice(
        &self,
        session_key: &str,
        wav_bytes: &[u8],
    ) -> Result<VerifyOutcome, GateError> {
        let stage = self.sessions.get(session_key).ok_or(GateError::NoActiveLogin)?;
        let (user_id, attempts) = match stage {
            AuthStage::VoicePending { user_id, attempts } => (user_id, attempts),
            _ => {
                return Err(GateError::WrongStage {
                    expected: "voice_pending",
                })
            }
        };

        match self.scorer.verify_voice(&user_id, wav_bytes) {
            Ok(Decision {
                accepted: true,
                score,
            }) => self.advance_past_voice(session_key, &user_id, Some(score)),
            Ok(Decision {
                accepted: false,
                score,
            }) => self.register_failure(
                session_key,
                &user_id,
                attempts,
                Some(score),
                "voice rejected".to_string(),
                Stage::Voice,
            ),
            // Untrained model: password-only fallback, never a hard fail.
            Err(VerifyError::ModelNotTrained { .. }) => {
                self.advance_past_voice(session_key, &user_id, None)
            }
            // Unusable media is an ordinary retry, not a fault.
            Err(e @ (VerifyError::Audio(_) | VerifyError::Face(_))) => self.register_failure(
                session_key,
                &user_id,
                attempts,
                None,
                e.to_string(),
                Stage::Voice,
            ),
            Err(e) => Err(backend_fatal(e)),
        }
    }

    /// Face stage. Mirrors the voice stage with its own attempt budget.
    pub fn submit_face(
        &self,
        session_key: &str,
        image_bytes: &[u8],
    ) -> Result<VerifyOutcome, GateError> {
        let stage = self.sessions.get(session_key).ok_or(GateError::NoActiveLogin)?;
        let (user_id, attempts) = match stage {
            AuthStage::FacePending { user_id, attempts } => (user_id, attempts),
            _ => {
                return Err(GateError::WrongStage {
                    expected: "face_pending",
                })
            }
        };

        match self.scorer.verify_face(&user_id, image_bytes) {
            Ok(Decision {
                accepted: true,
                score,
            }) => self.finish(session_key, &user_id, Some(score)),
            Ok(Decision {
                accepted: false,
                score,
            }) => self.register_failure(
                session_key,
                &user_id,
                attempts,
                Some(score),
                "face rejected".to_string(),
                Stage::Face,
            ),
            Err(VerifyError::ModelNotTrained { .. }) => self.finish(session_key, &user_id, None),
            Err(e @ (VerifyError::Audio(_) | VerifyError::Face(_))) => self.register_failure(
                session_key,
                &user_id,
                attempts,
                None,
                e.to_string(),
                Stage::Face,
            ),
            Err(e) => Err(backend_fatal(e)),
        }
    }

    /// Voice accepted (or bypassed): clear the voice counter and either
    /// enter the face stage or finish.
    fn advance_past_voice(
        &self,
        session_key: &str,
        user_id: &str,
        score: Option<f64>,
    ) -> Result<VerifyOutcome, GateError> {
        let needs_face = self.scorer.has_face_model(user_id).map_err(backend_fatal)?;
        if needs_face {
            self.sessions.set(
                session_key,
                AuthStage::FacePending {
                    user_id: user_id.to_string(),
                    attempts: 0,
                },
            );
            info!(user = %user_id, from = "voice_pending", to = "face_pending", "voice accepted");
            Ok(VerifyOutcome::Accepted {
                next: NextStep::Face,
                score,
            })
        } else {
            self.finish(session_key, user_id, score)
        }
    }

    /// Terminal accept: establish the authenticated session.
    fn finish(
        &self,
        session_key: &str,
        user_id: &str,
        score: Option<f64>,
    ) -> Result<VerifyOutcome, GateError> {
        self.sessions.set(
            session_key,
            AuthStage::Authenticated {
                user_id: user_id.to_string(),
            },
        );
        info!(user = %user_id, to = "authenticated", "login complete");
        Ok(VerifyOutcome::Accepted {
            next: NextStep::Done,
            score,
        })
    }

    /// Rejection or unusable media: bump the stage counter, destroying
    /// the session once the budget is spent.
    fn register_failure(
        &self,
        session_key: &str,
        user_id: &str,
        attempts: u8,
        score: Option<f64>,
        reason: String,
        stage: Stage,
    ) -> Result<VerifyOutcome, GateError> {
        let attempts = attempts + 1;
        if attempts >= MAX_ATTEMPTS {
            self.sessions.remove(session_key);
            warn!(user = %user_id, stage = stage.as_str(), "attempts exhausted, session destroyed");
            return Ok(VerifyOutcome::Exhausted);
        }

        let next_stage = match stage {
            Stage::Voice => AuthStage::VoicePending {
                user_id: user_id.to_string(),
                attempts,
            },
            Stage::Face => AuthStage::FacePending {
                user_id: user_id.to_string(),
                attempts,
            },
        };
        self.sessions.set(session_key, next_stage);
        info!(user = %user_id, stage = stage.as_str(), attempts, %reason, "attempt failed");
        Ok(VerifyOutcome::Retry {
            attempts_remaining: MAX_ATTEMPTS - attempts,
            score,
            reason,
        })
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Voice,
    Face,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Voice => "voice",
            Stage::Face => "face",
        }
    }
}

fn backend_fatal(e: VerifyError) -> GateError {
    GateError::Backend(e.to_string())
}
