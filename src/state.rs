//! State shared by the application and the USB interrupt
//!
//! Allocate a [`SerialState`] in a `static`, then
//! [`split`](SerialState::split) it into the two halves of the driver.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{
    class::Class,
    engine::SharedDeviceState,
    line::LineState,
    ral,
    reset::ResetDetector,
    rx::{RxBuffer, RxChannel},
    serial::Serial,
    tx::{TxChannel, TxPending},
    Peripherals,
};

pub(crate) const RX: RxChannel = RxChannel::new(
    crate::RX_ENDPOINT,
    crate::RX_ADDR,
    crate::RX_MAX_PACKET_SIZE,
);

pub(crate) const TX: TxChannel = TxChannel::new(crate::TX_ENDPOINT, crate::TX_ADDR, crate::TX_LIMIT);

/// Driver state that outlives both halves of the driver
///
/// Every field that's touched from both contexts is either atomic, or
/// guarded by the endpoint handshake.
///
/// ```
/// use usbfs_vcom::SerialState;
///
/// static STATE: SerialState = SerialState::new();
/// ```
pub struct SerialState {
    pub(crate) rx: RxBuffer,
    pub(crate) tx: TxPending,
    pub(crate) lines: LineState,
    pub(crate) reset: ResetDetector,
    pub(crate) device: SharedDeviceState,
    taken: AtomicBool,
}

impl SerialState {
    pub const fn new() -> Self {
        SerialState {
            rx: RxBuffer::new(),
            tx: TxPending::new(),
            lines: LineState::new(),
            reset: ResetDetector::new(),
            device: SharedDeviceState::new(),
            taken: AtomicBool::new(false),
        }
    }

    /// Create the application half and the interrupt half of the driver
    ///
    /// Returns `None` if the state was already split. The [`Serial`] half
    /// belongs to application code, and the [`Class`] half belongs to the
    /// USB interrupt handler.
    pub fn split<P: Peripherals>(&'static self, peripherals: P) -> Option<(Serial, Class)> {
        if self.taken.swap(true, Ordering::SeqCst) {
            return None;
        }
        let app = ral::instances(&peripherals);
        let isr = ral::instances(&peripherals);
        Some((
            Serial::new(app.usb, app.pma, self),
            Class::new(isr.usb, isr.pma, self),
        ))
    }
}

impl Default for SerialState {
    fn default() -> Self {
        Self::new()
    }
}
