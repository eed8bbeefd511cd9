//! Descriptor tables for the virtual COM port

use crate::engine::CopyData;

const DEVICE_LEN: usize = 18;
const CONFIG_LEN: usize = 67;

pub const VENDOR_ID: u16 = 0x0483;
pub const PRODUCT_ID: u16 = 0xFEAD;

pub static DEVICE: [u8; DEVICE_LEN] = [
    DEVICE_LEN as u8,
    0x01, // DEVICE
    0x00,
    0x02, // USB 2.00
    0x02, // CDC
    0x00,
    0x00,
    crate::MAX_PACKET_SIZE as u8,
    VENDOR_ID as u8,
    (VENDOR_ID >> 8) as u8,
    PRODUCT_ID as u8,
    (PRODUCT_ID >> 8) as u8,
    0x00,
    0x02, // release 2.00
    1,    // manufacturer
    2,    // product
    0,    // no serial number
    1,    // one configuration
];

pub static CONFIG: [u8; CONFIG_LEN] = [
    // Configuration
    9,
    0x02,
    CONFIG_LEN as u8,
    0x00,
    2, // interfaces
    1, // configuration value
    0,
    0xC0, // self powered
    50,   // 100 mA
    // Communication class interface
    9,
    0x04,
    0, // interface number
    0,
    1, // endpoints
    0x02,
    0x02, // abstract control model
    0x01, // AT commands
    0,
    // Header functional descriptor
    5,
    0x24,
    0x00,
    0x01,
    0x10,
    // Call management functional descriptor
    5,
    0x24,
    0x01,
    0x03,
    1, // data interface
    // ACM functional descriptor
    4,
    0x24,
    0x02,
    0x06,
    // Union functional descriptor
    5,
    0x24,
    0x06,
    0, // controlling interface
    1, // subordinate interface
    // Notification endpoint
    7,
    0x05,
    0x80 | crate::NOTIFICATION_ENDPOINT as u8,
    0x03, // interrupt
    crate::MAX_PACKET_SIZE as u8,
    0x00,
    0xFF,
    // Data class interface
    9,
    0x04,
    1, // interface number
    0,
    2, // endpoints
    0x0A,
    0x00,
    0x00,
    0,
    // Data OUT endpoint
    7,
    0x05,
    crate::RX_ENDPOINT as u8,
    0x02, // bulk
    crate::RX_MAX_PACKET_SIZE as u8,
    0x00,
    0,
    // Data IN endpoint
    7,
    0x05,
    0x80 | crate::TX_ENDPOINT as u8,
    0x02, // bulk
    crate::TX_MAX_PACKET_SIZE as u8,
    0x00,
    0,
];

/// Encode an ASCII string as a USB string descriptor
const fn string<const N: usize>(ascii: &[u8]) -> [u8; N] {
    assert!(N == 2 + 2 * ascii.len());
    let mut descriptor = [0; N];
    descriptor[0] = N as u8;
    descriptor[1] = 0x03;
    let mut idx = 0;
    while idx < ascii.len() {
        descriptor[2 + idx * 2] = ascii[idx];
        idx += 1;
    }
    descriptor
}

static LANGID: [u8; 4] = [4, 0x03, 0x09, 0x04];
static MANUFACTURER: [u8; 18] = string(b"MultiWii");
static PRODUCT: [u8; 22] = string(b"USB Serial");

/// Returns the string descriptor at `index`
///
/// Index 0 is the language table.
pub fn string_descriptor(index: u8) -> Option<&'static [u8]> {
    match index {
        0 => Some(&LANGID),
        1 => Some(&MANUFACTURER),
        2 => Some(&PRODUCT),
        _ => None,
    }
}

/// Serve a descriptor table to the engine
pub fn descriptor_data(
    table: &'static [u8],
    offset: u16,
    length: u16,
) -> Option<CopyData<&'static [u8]>> {
    CopyData::of(table, offset, length)
}
