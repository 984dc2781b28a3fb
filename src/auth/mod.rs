//! Session-scoped password gate in front of the dashboard.
//!
//! The comparison happens on the viewer's side of the boundary and is a
//! convenience only. Access control is the edge gate in `serve::edge`, which
//! checks a server-held secret on every request.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::DashboardConfig;

mod session;

pub use session::{FileSession, SessionStore};
#[cfg(test)]
pub use session::MemorySession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

/// The submitted credential did not open the gate. Carries no detail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthMismatch;

impl std::fmt::Display for AuthMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Incorrect password")
    }
}

impl std::error::Error for AuthMismatch {}

/// Lower-case hex SHA-256 of `password`.
pub fn digest_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct AuthGate<S: SessionStore> {
    expected: Option<String>,
    session: S,
    state: GateState,
}

impl<S: SessionStore> AuthGate<S> {
    /// Starts unlocked when the session already carries the marker.
    pub fn new(config: &DashboardConfig, session: S) -> Self {
        let state = if session.is_unlocked() { GateState::Unlocked } else { GateState::Locked };
        Self { expected: config.password_digest.clone(), session, state }
    }

    #[cfg(test)]
    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    /// Consumes the candidate so nothing of it outlives the attempt.
    pub fn submit(&mut self, candidate: String) -> Result<GateState, AuthMismatch> {
        if self.is_unlocked() {
            return Ok(self.state);
        }
        let digest = digest_hex(&candidate);
        drop(candidate);
        match self.expected.as_deref() {
            Some(expected) if expected == digest => {
                self.state = GateState::Unlocked;
                if let Err(e) = self.session.mark_unlocked() {
                    // still open for this run, the next one will prompt again
                    warn!(error = %e, "failed to persist session marker");
                }
                Ok(self.state)
            }
            _ => Err(AuthMismatch),
        }
    }

    /// Ends the session: drops the marker and locks again.
    pub fn lock(&mut self) -> std::io::Result<()> {
        self.state = GateState::Locked;
        self.session.clear()
    }

    pub fn into_session(self) -> S {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(password: &str) -> DashboardConfig {
        DashboardConfig { password_digest: Some(digest_hex(password)), ..DashboardConfig::default() }
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(digest_hex("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn correct_password_unlocks_and_survives_reload() {
        let cfg = config_for("hunter2");
        let mut gate = AuthGate::new(&cfg, MemorySession::default());
        assert_eq!(gate.state(), GateState::Locked);
        assert_eq!(gate.submit("hunter2".into()), Ok(GateState::Unlocked));

        let reloaded = AuthGate::new(&cfg, gate.into_session());
        assert_eq!(reloaded.state(), GateState::Unlocked);
    }

    #[test]
    fn wrong_password_stays_locked_without_marker() {
        let cfg = config_for("hunter2");
        let mut gate = AuthGate::new(&cfg, MemorySession::default());
        for attempt in ["hunter3", "", "HUNTER2", " hunter2"] {
            assert_eq!(gate.submit(attempt.into()), Err(AuthMismatch));
            assert_eq!(gate.state(), GateState::Locked);
        }
        let session = gate.into_session();
        assert!(!session.is_unlocked());
    }

    #[test]
    fn retry_after_mismatch_is_allowed() {
        let cfg = config_for("hunter2");
        let mut gate = AuthGate::new(&cfg, MemorySession::default());
        assert!(gate.submit("nope".into()).is_err());
        assert!(gate.submit("hunter2".into()).is_ok());
        assert!(gate.is_unlocked());
    }

    #[test]
    fn no_configured_digest_never_unlocks() {
        let cfg = DashboardConfig::default();
        let mut gate = AuthGate::new(&cfg, MemorySession::default());
        assert_eq!(gate.submit(String::new()), Err(AuthMismatch));
        assert_eq!(gate.submit("anything".into()), Err(AuthMismatch));
    }

    #[test]
    fn file_session_persists_across_gates_and_lock_clears_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        let cfg = config_for("pw");

        let mut gate = AuthGate::new(&cfg, FileSession::new(&path));
        gate.submit("pw".into()).unwrap();
        assert!(AuthGate::new(&cfg, FileSession::new(&path)).is_unlocked());

        let mut again = AuthGate::new(&cfg, FileSession::new(&path));
        again.lock().unwrap();
        assert!(!again.is_unlocked());
        assert!(!AuthGate::new(&cfg, FileSession::new(&path)).is_unlocked());
    }

    #[test]
    fn mismatch_message_is_generic() {
        assert_eq!(AuthMismatch.to_string(), "Incorrect password");
    }
}
