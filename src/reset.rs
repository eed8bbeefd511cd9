//! DTR reset gesture detector
//!
//! A host asks for a reset by raising DTR, then dropping it. The detector
//! follows DTR across `SET_CONTROL_LINE_STATE` requests and lands in
//! [`ResetState::NegEdge`] on that falling edge. Acting on the edge is up
//! to the application.

use core::sync::atomic::{AtomicU8, Ordering};

/// Where the detector is, relative to the last DTR transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum ResetState {
    /// No request seen yet
    Unset,
    /// DTR is asserted
    High,
    /// DTR just dropped, after being asserted
    NegEdge,
    /// DTR is deasserted
    Low,
}

impl ResetState {
    /// The next state, given the DTR bit from the latest request
    pub const fn next(self, dtr: bool) -> Self {
        match (self, dtr) {
            (_, true) => ResetState::High,
            (ResetState::High, false) => ResetState::NegEdge,
            (ResetState::Unset | ResetState::NegEdge | ResetState::Low, false) => ResetState::Low,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ResetState::High,
            2 => ResetState::NegEdge,
            3 => ResetState::Low,
            _ => ResetState::Unset,
        }
    }
}

/// The detector, shared with the application
///
/// Only the interrupt handler advances it.
pub struct ResetDetector(AtomicU8);

impl ResetDetector {
    pub const fn new() -> Self {
        ResetDetector(AtomicU8::new(ResetState::Unset as u8))
    }

    /// Feed the DTR bit from a `SET_CONTROL_LINE_STATE` request
    ///
    /// Returns the new state.
    pub fn advance(&self, dtr: bool) -> ResetState {
        let next = self.state().next(dtr);
        self.0.store(next as u8, Ordering::Relaxed);
        next
    }

    pub fn state(&self) -> ResetState {
        ResetState::from_u8(self.0.load(Ordering::Relaxed))
    }
}
