//! Link lifecycle state machine.
//!
//! Models the phases a serial session moves through, with validated
//! transitions that return `Result` instead of panicking.

use std::time::Instant;

use crate::error::LinkError;

// ── LinkPhase ────────────────────────────────────────────────────

/// The current phase of the serial link.
///
/// ```text
///  Disconnected ──► Opening ──► BootPurging ──► Connected
///       ▲              │             │              │
///       │              ▼             ▼              ▼
///       └───────── TearingDown ◄─────┴──────────────┘
/// ```
///
/// Exactly one transport handle is live in `Opening`, `BootPurging`
/// and `Connected`; none otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkPhase {
    /// No active session. Initial / terminal state.
    #[default]
    Disconnected,

    /// Acquiring the transport handle (device selection + open).
    Opening,

    /// Port is open; discarding device boot-time noise.
    BootPurging,

    /// Steady state: read pump and decode tick are running.
    Connected {
        /// When the link entered the `Connected` phase.
        since: Instant,
    },

    /// Best-effort resource release in progress.
    TearingDown,
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Opening => write!(f, "Opening"),
            Self::BootPurging => write!(f, "BootPurging"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::TearingDown => write!(f, "TearingDown"),
        }
    }
}

impl LinkPhase {
    /// Returns `true` when the link is live and pumping bytes.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` when no session exists.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the link has been in the `Connected` phase.
    ///
    /// Returns `None` for any other phase.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Opening`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_open(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Disconnected => {
                *self = Self::Opening;
                Ok(())
            }
            _ => Err(LinkError::State("cannot open: not in Disconnected phase")),
        }
    }

    /// Transition to `BootPurging`.
    ///
    /// Valid from: `Opening`, once the port reports itself readable.
    pub fn begin_purge(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Opening => {
                *self = Self::BootPurging;
                Ok(())
            }
            _ => Err(LinkError::State("cannot purge: not in Opening phase")),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `BootPurging`, once the purge window elapses.
    pub fn complete_purge(&mut self) -> Result<(), LinkError> {
        match self {
            Self::BootPurging => {
                *self = Self::Connected { since: Instant::now() };
                Ok(())
            }
            _ => Err(LinkError::State("cannot go live: not in BootPurging phase")),
        }
    }

    /// Transition to `TearingDown`.
    ///
    /// Valid from: `Opening`, `BootPurging`, `Connected`.
    pub fn begin_teardown(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Opening | Self::BootPurging | Self::Connected { .. } => {
                *self = Self::TearingDown;
                Ok(())
            }
            _ => Err(LinkError::State("cannot tear down: no active session")),
        }
    }

    /// Transition to `Disconnected`.
    ///
    /// Valid from: `TearingDown`.
    pub fn finish_teardown(&mut self) -> Result<(), LinkError> {
        match self {
            Self::TearingDown => {
                *self = Self::Disconnected;
                Ok(())
            }
            _ => Err(LinkError::State("cannot finish teardown: not tearing down")),
        }
    }

    /// Force-reset to `Disconnected` regardless of the current phase.
    ///
    /// Used after an open failure or an unrecoverable mid-session
    /// error, where the normal transition path no longer applies.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = LinkPhase::Disconnected;

        phase.begin_open().unwrap();
        assert_eq!(phase, LinkPhase::Opening);

        phase.begin_purge().unwrap();
        assert_eq!(phase, LinkPhase::BootPurging);

        phase.complete_purge().unwrap();
        assert!(phase.is_connected());
        assert!(phase.connected_duration().is_some());

        phase.begin_teardown().unwrap();
        assert_eq!(phase, LinkPhase::TearingDown);

        phase.finish_teardown().unwrap();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn cannot_open_while_connected() {
        let mut phase = LinkPhase::Connected { since: Instant::now() };
        assert!(phase.begin_open().is_err());
    }

    #[test]
    fn cannot_purge_from_disconnected() {
        let mut phase = LinkPhase::Disconnected;
        assert!(phase.begin_purge().is_err());
    }

    #[test]
    fn cannot_go_live_from_opening() {
        let mut phase = LinkPhase::Opening;
        assert!(phase.complete_purge().is_err());
    }

    #[test]
    fn teardown_from_purge_phase() {
        let mut phase = LinkPhase::BootPurging;
        phase.begin_teardown().unwrap();
        phase.finish_teardown().unwrap();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn teardown_from_opening_on_failure() {
        let mut phase = LinkPhase::Opening;
        phase.begin_teardown().unwrap();
        assert_eq!(phase, LinkPhase::TearingDown);
    }

    #[test]
    fn force_disconnect_from_any_phase() {
        let mut phase = LinkPhase::Connected { since: Instant::now() };
        phase.force_disconnect();
        assert!(phase.is_disconnected());

        let mut phase = LinkPhase::TearingDown;
        phase.force_disconnect();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn display_format() {
        assert_eq!(LinkPhase::Disconnected.to_string(), "Disconnected");
        assert_eq!(LinkPhase::Opening.to_string(), "Opening");
        assert_eq!(LinkPhase::BootPurging.to_string(), "BootPurging");
        assert_eq!(
            LinkPhase::Connected { since: Instant::now() }.to_string(),
            "Connected"
        );
        assert_eq!(LinkPhase::TearingDown.to_string(), "TearingDown");
    }

    #[test]
    fn default_phase_is_disconnected() {
        assert!(LinkPhase::default().is_disconnected());
    }
}
