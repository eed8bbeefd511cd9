//! Packet memory area (PMA) and the buffer descriptor table
//!
//! The PMA is 512 bytes of SRAM shared between the USB peripheral and
//! the CPU. The peripheral sees it as 16-bit halfwords. The CPU sees each
//! halfword in its own 32-bit word, so a PMA offset `o` is found at CPU
//! address `base + 2 * o`.
//!
//! The buffer descriptor table lives in the PMA, too. It describes the
//! packet memory address and length for each endpoint direction. The
//! module implements a RAL-compatible interface for its entries.

#![allow(non_snake_case, non_upper_case_globals)]

use crate::{ral, vcell::VCell};

/// Size of the packet memory, in bytes, as seen by the peripheral
pub const PMA_SIZE: usize = 512;

/// An endpoint's entry in the buffer descriptor table
#[repr(C)]
pub struct BufferDescriptor {
    pub ADDR_TX: VCell<u32>,
    pub COUNT_TX: VCell<u32>,
    pub ADDR_RX: VCell<u32>,
    pub COUNT_RX: VCell<u32>,
}

const _: [(); 1] = [(); (core::mem::size_of::<BufferDescriptor>() == 16) as usize];

impl BufferDescriptor {
    /// Set the PMA offset of the transmit buffer
    pub fn set_tx_addr(&self, addr: u16) {
        ral::write_reg!(crate::pma, self, ADDR_TX, ADDR: u32::from(addr) >> 1);
    }

    /// Set the PMA offset of the receive buffer
    pub fn set_rx_addr(&self, addr: u16) {
        ral::write_reg!(crate::pma, self, ADDR_RX, ADDR: u32::from(addr) >> 1);
    }

    /// Set the number of bytes to send in the next IN transaction
    pub fn set_tx_count(&self, count: u16) {
        ral::write_reg!(crate::pma, self, COUNT_TX, COUNT: u32::from(count));
    }

    /// Returns the number of bytes received in the last OUT transaction
    pub fn rx_count(&self) -> u16 {
        ral::read_reg!(crate::pma, self, COUNT_RX, COUNT) as u16
    }

    /// Set the receive buffer size
    ///
    /// Sizes above 62 bytes are expressed in 32 byte blocks, rounding up.
    /// Smaller sizes use 2 byte blocks. Writing the size also clears the
    /// received byte count.
    pub fn set_rx_capacity(&self, capacity: u16) {
        let capacity = u32::from(capacity);
        if capacity > 62 {
            let mut blocks = capacity >> 5;
            if capacity & 0x1F == 0 {
                blocks -= 1;
            }
            ral::write_reg!(crate::pma, self, COUNT_RX, BL_SIZE: 1, NUM_BLOCK: blocks);
        } else {
            let mut blocks = capacity >> 1;
            if capacity & 0x1 != 0 {
                blocks += 1;
            }
            ral::write_reg!(crate::pma, self, COUNT_RX, BL_SIZE: 0, NUM_BLOCK: blocks);
        }
    }
}

// Readbacks, for host tests
#[cfg(test)]
impl BufferDescriptor {
    /// Returns the PMA offset of the transmit buffer
    pub fn tx_addr(&self) -> u16 {
        (ral::read_reg!(crate::pma, self, ADDR_TX, ADDR) << 1) as u16
    }

    /// Returns the PMA offset of the receive buffer
    pub fn rx_addr(&self) -> u16 {
        (ral::read_reg!(crate::pma, self, ADDR_RX, ADDR) << 1) as u16
    }

    /// Returns the number of bytes staged for the next IN transaction
    pub fn tx_count(&self) -> u16 {
        ral::read_reg!(crate::pma, self, COUNT_TX, COUNT) as u16
    }

    /// Returns the receive buffer size, in bytes
    pub fn rx_capacity(&self) -> u16 {
        let (bl_size, num_block) = ral::read_reg!(crate::pma, self, COUNT_RX, BL_SIZE, NUM_BLOCK);
        if bl_size == 1 {
            ((num_block + 1) * 32) as u16
        } else {
            (num_block * 2) as u16
        }
    }
}

pub mod ADDR_TX {
    pub mod ADDR {
        pub const offset: u32 = 1;
        pub const mask: u32 = 0x7FFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod ADDR_RX {
    pub use super::ADDR_TX::ADDR;
}

pub mod COUNT_TX {
    pub mod COUNT {
        pub const offset: u32 = 0;
        pub const mask: u32 = 0x3FF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod COUNT_RX {
    pub use super::COUNT_TX::COUNT;
    pub mod NUM_BLOCK {
        pub const offset: u32 = 10;
        pub const mask: u32 = 0x1F << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    pub mod BL_SIZE {
        pub const offset: u32 = 15;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

/// CPU view of the packet memory
pub struct PacketMemory {
    base: *const VCell<u32>,
}

// Safety: every access is a volatile load or store of a single word.
unsafe impl Send for PacketMemory {}

impl PacketMemory {
    /// # Safety
    ///
    /// `base` must point to the packet memory, or to `2 * PMA_SIZE` bytes
    /// of word-aligned memory that stands in for it, for as long as the
    /// `PacketMemory` exists.
    pub(crate) unsafe fn new(base: *const ()) -> Self {
        PacketMemory { base: base.cast() }
    }

    /// Returns the CPU word holding the halfword at PMA `offset`
    fn word(&self, offset: usize) -> &VCell<u32> {
        assert!(offset < PMA_SIZE, "PMA offset {} out of range", offset);
        // Safety: in bounds of the packet memory, per the check above.
        unsafe { &*self.base.add(offset / 2) }
    }

    /// Returns the buffer descriptor for `endpoint`, in a table at PMA offset `btable`
    pub fn descriptor(&self, btable: u16, endpoint: usize) -> &BufferDescriptor {
        let offset = usize::from(btable) + endpoint * 8;
        let word: *const VCell<u32> = self.word(offset);
        // Safety: a descriptor spans four consecutive words, starting at
        // an 8 byte aligned PMA offset.
        unsafe { &*word.cast() }
    }

    /// Copy `src` into packet memory, starting at PMA `offset`
    ///
    /// Returns the number of bytes copied.
    pub fn write(&self, offset: u16, src: &[u8]) -> usize {
        let offset = usize::from(offset);
        let mut chunks = src.chunks_exact(2);
        for (idx, pair) in chunks.by_ref().enumerate() {
            let halfword = u16::from_le_bytes([pair[0], pair[1]]);
            self.word(offset + idx * 2).write(u32::from(halfword));
        }
        if let [last] = chunks.remainder() {
            self.word(offset + src.len() - 1).write(u32::from(*last));
        }
        src.len()
    }

    /// Copy from packet memory, starting at PMA `offset`, into `dst`
    ///
    /// Returns the number of bytes copied.
    pub fn read(&self, offset: u16, dst: &mut [u8]) -> usize {
        let offset = usize::from(offset);
        let len = dst.len();
        let mut chunks = dst.chunks_exact_mut(2);
        for (idx, pair) in chunks.by_ref().enumerate() {
            let halfword = self.word(offset + idx * 2).read() as u16;
            pair.copy_from_slice(&halfword.to_le_bytes());
        }
        if let [last] = chunks.into_remainder() {
            *last = self.word(offset + len - 1).read() as u8;
        }
        len
    }
}
