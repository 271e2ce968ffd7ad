//! Offline demo substitute
//!
//! While demo mode is on, every operation except the network diagnostic
//! answers from fixed fixtures after a short simulated delay and never
//! touches the network. Turning it on always goes through an explicit
//! confirmation step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

pub mod fixtures;

/// Shared on/off switch for offline demo responses.
///
/// Clones share the same state, so a handle kept by the UI controls every
/// client built with it.
#[derive(Debug, Clone, Default)]
pub struct DemoMode {
    enabled: Arc<AtomicBool>,
}

impl DemoMode {
    /// A new switch, initially off
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Start turning demo mode on; nothing changes until the request is confirmed
    #[must_use = "demo mode stays off unless the request is confirmed"]
    pub fn request_activation(&self) -> ActivationRequest {
        ActivationRequest { mode: self.clone() }
    }

    pub fn deactivate(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            info!("Demo mode deactivated");
        }
    }
}

/// Pending demo activation awaiting the user's answer
#[derive(Debug)]
pub struct ActivationRequest {
    mode: DemoMode,
}

impl ActivationRequest {
    pub fn confirm(self) {
        if !self.mode.enabled.swap(true, Ordering::AcqRel) {
            info!("Demo mode activated, responses are offline fixtures");
        }
    }

    pub fn cancel(self) {}
}
