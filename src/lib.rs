//! A USB CDC ACM virtual COM port for the STM32 USB full-speed device peripheral
//!
//! `usbfs-vcom` exposes a byte stream to application code, and plugs the
//! CDC ACM class behavior into a USB protocol engine. The engine runs
//! enumeration and the control transfer state machine; this crate supplies
//! the endpoint setup, class requests, descriptors, and data flow through
//! [`DeviceCallbacks`].
//!
//! To interface the library, you must define a safe implementation of
//! [`Peripherals`]. Then, [`split`](SerialState::split) a `static`
//! [`SerialState`] into
//!
//! - a [`Serial`], for the application, and
//! - a [`Class`], for the USB interrupt and the engine.
//!
//! ```no_run
//! use usbfs_vcom::{Peripherals, SerialState};
//!
//! struct Usb;
//!
//! unsafe impl Peripherals for Usb {
//!     fn usb(&self) -> *const () {
//!         usbfs_vcom::USB_REGISTERS as *const ()
//!     }
//!     fn pma(&self) -> *const () {
//!         usbfs_vcom::PACKET_MEMORY as *const ()
//!     }
//! }
//!
//! static STATE: SerialState = SerialState::new();
//!
//! let (mut serial, class) = STATE.split(Usb).unwrap();
//! // Move `class` into the USB interrupt handler...
//! # drop(class);
//! serial.enable();
//!
//! let mut buffer = [0; 64];
//! let received = serial.read(&mut buffer);
//! serial.write(&buffer[..received]);
//! ```
//!
//! # Data flow
//!
//! Each data endpoint has exactly one packet in flight. An OUT packet is
//! held in a receive buffer, and the host sees NAK until the application
//! reads every byte. A write stages one packet, and further writes return
//! 0 until the host acknowledges it.
//!
//! # Reset gesture
//!
//! The driver tracks DTR across `SET_CONTROL_LINE_STATE` requests. When
//! DTR falls after being asserted, [`Serial::reset_state`] reports
//! [`ResetState::NegEdge`]. The driver doesn't act on the gesture.

#![no_std]

#[cfg(feature = "defmt-03")]
extern crate defmt_03 as defmt;

#[macro_use]
mod log;

mod class;
mod control;
mod descriptors;
mod endpoint;
mod engine;
mod line;
mod pma;
mod ral;
mod reset;
mod rx;
mod serial;
mod state;
mod tx;
mod vcell;

#[cfg(test)]
mod fixture;

pub use class::Class;
pub use control::ClassRequest;
pub use descriptors::{PRODUCT_ID, VENDOR_ID};
pub use engine::{CopyData, DeviceCallbacks, DeviceState, SetupResult};
pub use line::{ControlLines, LineCoding};
pub use reset::ResetState;
pub use rx::RX_BUFFER_LEN;
pub use serial::Serial;
pub use state::SerialState;

/// Address of the USB registers
pub const USB_REGISTERS: usize = 0x4000_5C00;
/// Address of the packet memory, as seen by the CPU
pub const PACKET_MEMORY: usize = 0x4000_6000;

/// The default control endpoint
pub const CONTROL_ENDPOINT: usize = 0;
/// Bulk IN endpoint for data sent to the host
pub const TX_ENDPOINT: usize = 1;
/// Interrupt IN endpoint for CDC notifications
pub const NOTIFICATION_ENDPOINT: usize = 2;
/// Bulk OUT endpoint for data from the host
pub const RX_ENDPOINT: usize = 3;
/// Number of endpoints used by the device
pub const NUM_ENDPOINTS: usize = 4;

/// Max packet size for every endpoint
pub const MAX_PACKET_SIZE: u16 = 64;
pub const RX_MAX_PACKET_SIZE: u16 = MAX_PACKET_SIZE;
pub const TX_MAX_PACKET_SIZE: u16 = MAX_PACKET_SIZE;

/// Most bytes accepted by one [`Serial::write`]
///
/// This is half the IN endpoint's max packet size, so every IN packet
/// carries at most 32 bytes.
pub const TX_LIMIT: usize = TX_MAX_PACKET_SIZE as usize / 2;

// Packet memory layout. The buffer descriptor table is at the bottom.
const BTABLE_ADDRESS: u16 = 0x00;
const CONTROL_RX_ADDR: u16 = 0x40;
const CONTROL_TX_ADDR: u16 = 0x80;
const TX_ADDR: u16 = 0xC0;
const NOTIFICATION_ADDR: u16 = 0x100;
const RX_ADDR: u16 = 0x110;

const _: [(); 1] = [(); (RX_ADDR as usize + RX_MAX_PACKET_SIZE as usize <= pma::PMA_SIZE) as usize];
const _: [(); 1] = [(); (BTABLE_ADDRESS as usize + NUM_ENDPOINTS * 8 <= CONTROL_RX_ADDR as usize) as usize];

/// A type that owns the USB peripheral
///
/// An implementation of `Peripherals` is expected to own
///
/// - the USB registers
/// - the USB packet memory
///
/// # Safety
///
/// `Peripherals` should only be implemented on a type that
/// owns the register block and packet memory required for all USB
/// operation. The pointers returned by the methods are assumed to
/// be valid, and will be cast to a register definition.
///
/// # Example
///
/// A safe implementation of `Peripherals` that wraps a peripheral access
/// crate's USB instance. Assume that `pac` is your device's PAC.
///
/// ```
/// # mod pac { pub struct USB; impl USB { pub fn take() -> Option<USB> { Some(USB) } } }
/// use usbfs_vcom::Peripherals;
///
/// struct Usb {
///     _usb: pac::USB,
/// }
///
/// impl Usb {
///     /// Panics if the USB peripheral is already taken
///     pub fn new() -> Self {
///         Usb { _usb: pac::USB::take().unwrap() }
///     }
/// }
///
/// unsafe impl Peripherals for Usb {
///     fn usb(&self) -> *const () {
///         usbfs_vcom::USB_REGISTERS as *const ()
///     }
///     fn pma(&self) -> *const () {
///         usbfs_vcom::PACKET_MEMORY as *const ()
///     }
/// }
///
/// let usb = Usb::new();
/// assert_eq!(usb.usb(), 0x4000_5C00 as *const ());
/// ```
pub unsafe trait Peripherals {
    /// Returns the address of the USB registers
    fn usb(&self) -> *const ();
    /// Returns the address of the packet memory
    fn pma(&self) -> *const ();
}
