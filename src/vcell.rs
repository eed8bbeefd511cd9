//! Volatile cells that conform to the RAL's register API
//!
//! `VCell` backs memory-resident structures, like the buffer descriptor
//! table in packet memory. Under test, `EprCell` stands in for an
//! endpoint register and applies the peripheral's write semantics.

use core::cell::UnsafeCell;

#[repr(transparent)]
pub struct VCell<T>(UnsafeCell<T>);

#[cfg(test)]
impl<T> VCell<T> {
    pub const fn new(val: T) -> Self {
        VCell(UnsafeCell::new(val))
    }
}

impl<T: Copy> VCell<T> {
    pub fn read(&self) -> T {
        unsafe { self.0.get().read_volatile() }
    }
    pub fn write(&self, val: T) {
        unsafe { self.0.get().write_volatile(val) }
    }
}

/// Host model of a `USB_EPnR` register
///
/// A write does not store the value. Instead,
///
/// - `CTR_RX` and `CTR_TX` are cleared by writing 0, and unchanged by writing 1.
/// - `DTOG_*` and `STAT_*` bits toggle when written with 1.
/// - `SETUP` is read only.
/// - everything else is stored as written.
///
/// Use [`force`](EprCell::force) to act as the peripheral.
#[cfg(test)]
#[repr(transparent)]
pub struct EprCell(VCell<u32>);

#[cfg(test)]
impl EprCell {
    const CLEAR_ON_ZERO: u32 = (1 << 15) | (1 << 7);
    const TOGGLE: u32 = (1 << 14) | (0b11 << 12) | (1 << 6) | (0b11 << 4);
    const READ_ONLY: u32 = 1 << 11;

    pub fn read(&self) -> u32 {
        self.0.read()
    }

    pub fn write(&self, val: u32) {
        let old = self.0.read();
        let ctr = old & val & Self::CLEAR_ON_ZERO;
        let toggled = (old ^ val) & Self::TOGGLE;
        let kept = old & Self::READ_ONLY;
        let stored = val & !(Self::CLEAR_ON_ZERO | Self::TOGGLE | Self::READ_ONLY);
        self.0.write(ctr | toggled | kept | stored);
    }

    /// Set the register contents, bypassing the write semantics
    pub fn force(&self, val: u32) {
        self.0.write(val);
    }
}
