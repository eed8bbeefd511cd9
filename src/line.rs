//! CDC line coding and control line state

use core::sync::atomic::{AtomicU8, Ordering};

/// Size of the line coding record on the wire
pub const LINE_CODING_LEN: usize = 7;

/// The emulated serial link's format
///
/// The record is stored exactly as the host sent it. Nothing here
/// validates or normalizes the fields; the accessors only decode them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct LineCoding {
    raw: [u8; LINE_CODING_LEN],
}

impl LineCoding {
    /// 115200 baud, one stop bit, no parity, eight data bits
    pub const DEFAULT: Self = LineCoding::new(115_200, 0, 0, 8);

    pub const fn new(bitrate: u32, stop_bits: u8, parity: u8, data_bits: u8) -> Self {
        let rate = bitrate.to_le_bytes();
        LineCoding {
            raw: [
                rate[0], rate[1], rate[2], rate[3], stop_bits, parity, data_bits,
            ],
        }
    }

    /// Data terminal rate, in bits per second
    pub fn bitrate(&self) -> u32 {
        u32::from_le_bytes([self.raw[0], self.raw[1], self.raw[2], self.raw[3]])
    }

    /// Stop bits code: 0 is one, 1 is one and a half, 2 is two
    pub fn stop_bits(&self) -> u8 {
        self.raw[4]
    }

    /// Parity code: 0 none, 1 odd, 2 even, 3 mark, 4 space
    pub fn parity(&self) -> u8 {
        self.raw[5]
    }

    /// Number of data bits
    pub fn data_bits(&self) -> u8 {
        self.raw[6]
    }

    /// The record as it appears on the wire
    pub fn as_bytes(&self) -> &[u8; LINE_CODING_LEN] {
        &self.raw
    }

    /// The record as it appears on the wire, for the host to overwrite
    pub fn as_bytes_mut(&mut self) -> &mut [u8; LINE_CODING_LEN] {
        &mut self.raw
    }
}

impl Default for LineCoding {
    fn default() -> Self {
        Self::DEFAULT
    }
}

bitflags::bitflags! {
    /// Control signals from `SET_CONTROL_LINE_STATE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlLines : u8 {
        /// Data terminal ready
        const DTR = 1 << 0;
        /// Request to send
        const RTS = 1 << 1;
    }
}

impl ControlLines {
    /// Decode the `wValue` of a `SET_CONTROL_LINE_STATE` request
    pub fn from_request_value(value: u16) -> Self {
        ControlLines::from_bits_truncate(value as u8)
    }
}

/// The most recent control lines, shared with the application
pub struct LineState(AtomicU8);

impl LineState {
    pub const fn new() -> Self {
        LineState(AtomicU8::new(0))
    }

    pub fn store(&self, lines: ControlLines) {
        self.0.store(lines.bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> ControlLines {
        ControlLines::from_bits_truncate(self.0.load(Ordering::Relaxed))
    }
}
