//! Per-conversation session state machine.
//!
//! Gates the pipeline behind authentication and ordered input collection:
//! `Auth -> CollectStart -> CollectDest -> (pipeline) -> CollectStart`.
//! Transitions are pure: each input maps to a new state plus a
//! [`SessionAction`] the caller performs (reply, run the pipeline, or drop
//! the input). The machine never does I/O itself, which is what makes the
//! retry/lockout rules directly testable.
//!
//! Authentication, once granted, persists for the session's lifetime; a
//! completed or cancelled run resets only the collected locations.

use crate::models::LocationCode;

/// Session-wide knobs supplied by configuration.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Shared secret gating authentication.
    pub secret: String,
    /// Wrong-secret attempts before the session locks out.
    pub max_auth_tries: u32,
}

/// What the caller should do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this text and wait for the next input.
    Reply(String),
    /// Both locations collected and valid: run the full pipeline.
    RunPipeline {
        start: LocationCode,
        dest: LocationCode,
    },
    /// Locked-out session, drop the input.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Auth,
    CollectStart,
    CollectDest,
    Locked,
}

/// Mutable per-conversation state. Created on first contact, owned
/// exclusively by that conversation's handler.
#[derive(Debug)]
pub struct SessionState {
    stage: Stage,
    authenticated: bool,
    failed_auth_attempts: u32,
    /// Only the start code is held between inputs; the destination fires the
    /// pipeline on the same transition that validates it.
    start_location: Option<LocationCode>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Auth,
            authenticated: false,
            failed_auth_attempts: 0,
            start_location: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.stage == Stage::Locked
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// `/start`: begin (or restart) input collection. Does not reset a
    /// granted authentication.
    pub fn handle_start(&mut self) -> SessionAction {
        if self.stage == Stage::Locked {
            return SessionAction::Ignore;
        }
        self.start_location = None;
        if self.authenticated {
            self.stage = Stage::CollectStart;
            SessionAction::Reply("👋 Hi! Send me your start point Postal Code".to_string())
        } else {
            self.stage = Stage::Auth;
            SessionAction::Reply("🔐 Send the access code to continue".to_string())
        }
    }

    /// `/cancel`: abandon the in-progress request, keep authentication.
    pub fn handle_cancel(&mut self) -> SessionAction {
        if self.stage == Stage::Locked {
            return SessionAction::Ignore;
        }
        self.start_location = None;
        self.stage = if self.authenticated {
            Stage::CollectStart
        } else {
            Stage::Auth
        };
        SessionAction::Reply("🚫 Operation cancelled.".to_string())
    }

    /// Any non-command text input.
    pub fn handle_message(&mut self, text: &str, policy: &SessionPolicy) -> SessionAction {
        match self.stage {
            Stage::Locked => SessionAction::Ignore,
            Stage::Auth => self.handle_secret(text, policy),
            Stage::CollectStart => match LocationCode::parse(text) {
                Ok(code) => {
                    self.start_location = Some(code);
                    self.stage = Stage::CollectDest;
                    SessionAction::Reply(
                        "✅ Saved! Now send me your destination point Postal Code".to_string(),
                    )
                }
                Err(err) => SessionAction::Reply(format!("❗ {err}")),
            },
            Stage::CollectDest => match LocationCode::parse(text) {
                Ok(dest) => {
                    // start_location is always present in CollectDest; the
                    // only writer is the CollectStart transition above.
                    let Some(start) = self.start_location.take() else {
                        self.stage = Stage::CollectStart;
                        return SessionAction::Reply(
                            "👋 Hi! Send me your start point Postal Code".to_string(),
                        );
                    };
                    self.stage = Stage::CollectStart;
                    SessionAction::RunPipeline { start, dest }
                }
                Err(err) => SessionAction::Reply(format!("❗ {err}")),
            },
        }
    }

    fn handle_secret(&mut self, text: &str, policy: &SessionPolicy) -> SessionAction {
        if text.trim() == policy.secret {
            self.authenticated = true;
            self.failed_auth_attempts = 0;
            self.stage = Stage::CollectStart;
            return SessionAction::Reply(
                "✅ Access granted. Send me your start point Postal Code".to_string(),
            );
        }

        self.failed_auth_attempts += 1;
        if self.failed_auth_attempts >= policy.max_auth_tries {
            self.stage = Stage::Locked;
            return SessionAction::Reply(
                "🔒 Too many failed attempts. This session is locked.".to_string(),
            );
        }
        let remaining = policy.max_auth_tries - self.failed_auth_attempts;
        SessionAction::Reply(format!(
            "❌ Wrong access code. {remaining} attempt(s) remaining."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SessionPolicy {
        SessionPolicy {
            secret: "hunter2".to_string(),
            max_auth_tries: 5,
        }
    }

    fn authed_session() -> SessionState {
        let mut session = SessionState::new();
        session.handle_message("hunter2", &policy());
        session
    }

    #[test]
    fn correct_secret_advances_and_clears_counter() {
        let mut session = SessionState::new();
        session.handle_message("nope", &policy());
        session.handle_message("nope", &policy());

        let action = session.handle_message("hunter2", &policy());
        assert!(matches!(action, SessionAction::Reply(_)));
        assert!(session.is_authenticated());
        assert_eq!(session.failed_auth_attempts, 0);
    }

    #[test]
    fn lockout_after_max_tries_then_silence() {
        let mut session = SessionState::new();
        for i in 1..=5 {
            let action = session.handle_message("wrong", &policy());
            if i < 5 {
                let SessionAction::Reply(text) = action else {
                    panic!("expected reply")
                };
                assert!(text.contains(&format!("{} attempt", 5 - i)));
            } else {
                assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("locked")));
            }
        }
        assert!(session.is_locked());
        assert_eq!(session.handle_message("hunter2", &policy()), SessionAction::Ignore);
        assert_eq!(session.handle_start(), SessionAction::Ignore);
    }

    #[test]
    fn ordered_collection_runs_pipeline() {
        let mut session = authed_session();
        let action = session.handle_message("M6S5A2", &policy());
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("destination")));

        let action = session.handle_message("M4R1R3", &policy());
        let SessionAction::RunPipeline { start, dest } = action else {
            panic!("expected pipeline run, got {action:?}");
        };
        assert_eq!(start.as_str(), "M6S5A2");
        assert_eq!(dest.as_str(), "M4R1R3");

        // Back to collecting, inputs cleared, auth kept.
        assert!(session.is_authenticated());
        assert!(session.start_location.is_none());
    }

    #[test]
    fn invalid_code_reprompts_without_advancing() {
        let mut session = authed_session();
        let action = session.handle_message("ABC123", &policy());
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("invalid location")));

        // Still collecting the start code.
        let action = session.handle_message("M6S5A2", &policy());
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("destination")));
    }

    #[test]
    fn start_and_cancel_keep_authentication() {
        let mut session = authed_session();
        session.handle_message("M6S5A2", &policy());

        let action = session.handle_cancel();
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("cancelled")));
        assert!(session.is_authenticated());
        assert!(session.start_location.is_none());

        let action = session.handle_start();
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("start point")));
    }

    #[test]
    fn unauthenticated_session_asks_for_secret_on_start() {
        let mut session = SessionState::new();
        let action = session.handle_start();
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("access code")));
        // Location input before auth is treated as a secret attempt.
        let action = session.handle_message("M6S5A2", &policy());
        assert!(matches!(action, SessionAction::Reply(ref t) if t.contains("Wrong access code")));
    }
}
