//! CDC class request decoding and dispatch
//!
//! Only class requests addressed to an interface are recognized. Everything
//! else is reported as [`SetupResult::Unsupported`], and the engine stalls
//! the transfer.

use usb_device::control::{Recipient, Request, RequestType};

use crate::{
    engine::SetupResult,
    line::{ControlLines, LineState},
    reset::ResetDetector,
};

/// The CDC ACM requests handled by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum ClassRequest {
    SetCommFeature = 0x02,
    SetLineCoding = 0x20,
    GetLineCoding = 0x21,
    SetControlLineState = 0x22,
}

impl ClassRequest {
    /// Decode a SETUP request
    ///
    /// Returns `None` if the request isn't a recognized class request
    /// for an interface.
    pub fn decode(request: &Request) -> Option<Self> {
        if (request.request_type, request.recipient) != (RequestType::Class, Recipient::Interface) {
            return None;
        }
        match request.request {
            0x02 => Some(ClassRequest::SetCommFeature),
            0x20 => Some(ClassRequest::SetLineCoding),
            0x21 => Some(ClassRequest::GetLineCoding),
            0x22 => Some(ClassRequest::SetControlLineState),
            _ => None,
        }
    }

    /// Indicates if the request moves the line coding in a data stage
    pub const fn has_data_stage(self) -> bool {
        matches!(self, ClassRequest::SetLineCoding | ClassRequest::GetLineCoding)
    }
}

/// Accept a request that carries a data stage
///
/// Returns the request that the following data stage serves.
pub fn data_setup(request: &Request) -> Option<ClassRequest> {
    ClassRequest::decode(request).filter(|req| req.has_data_stage())
}

/// Handle a request without a data stage
pub fn no_data_setup(request: &Request, lines: &LineState, reset: &ResetDetector) -> SetupResult {
    match ClassRequest::decode(request) {
        Some(ClassRequest::SetCommFeature) => SetupResult::Success,
        Some(ClassRequest::SetControlLineState) => {
            let new_lines = ControlLines::from_request_value(request.value);
            lines.store(new_lines);
            reset.advance(new_lines.contains(ControlLines::DTR));
            debug!("CONTROL LINES {:#04x} {:?}", new_lines.bits(), reset.state());
            SetupResult::Success
        }
        _ => SetupResult::Unsupported,
    }
}
