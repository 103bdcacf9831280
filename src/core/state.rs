//! Session state machine for the transform pipeline.
//!
//! `Idle → Scanning → Resolving → Validating → Ready → Editing → Saving →
//! Idle | Error`. The scan/resolve/validate states are passed through
//! synchronously during `forward()`; validation itself keeps running in the
//! background after the machine has reached `Ready`.

use std::fmt;

/// Lifecycle state of one edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Resolving,
    Validating,
    Ready,
    Editing,
    Saving,
    Error,
}

impl SessionState {
    /// Check whether `next` is a legal successor of the current state.
    pub fn can_advance(self, next: Self) -> bool {
        use SessionState::*;
        match (self, next) {
            // forward() may restart the machine from any state
            (_, Scanning) => true,
            (Scanning, Resolving) => true,
            (Resolving, Validating) => true,
            (Validating, Ready) => true,
            (Ready, Editing) => true,
            (Editing, Saving) => true,
            // A failed save returns to Editing for retry
            (Saving, Editing) => true,
            (Saving, Idle) => true,
            // Closing a session from any settled state
            (Ready | Editing | Error, Idle) => true,
            (_, Error) => true,
            _ => false,
        }
    }

    /// States in which the session holds a usable preview.
    #[inline]
    pub fn has_preview(self) -> bool {
        matches!(self, Self::Ready | Self::Editing | Self::Saving)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Resolving => "resolving",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}
