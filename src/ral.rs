//! Register access for the USB full-speed device peripheral
//!
//! The register blocks are described here, in the same shape as
//! a RAL peripheral module, so that the `ral-registers` macros work
//! with them. This module also adds some enhancements for endpoint
//! register access.

pub use ral_registers::{read_reg, write_reg, RORegister, RWRegister};
#[cfg(test)]
pub use ral_registers::modify_reg;

/// Number of endpoint registers implemented by the peripheral
pub const ENDPOINT_REGISTERS: usize = 8;

#[allow(non_snake_case, non_upper_case_globals)]
pub mod usb {
    use super::{RORegister, RWRegister};
    use core::ops::Deref;

    /// The type behind each `USB_EPnR` register
    #[cfg(not(test))]
    pub type EndpointRegister = RWRegister<u32>;
    #[cfg(test)]
    pub type EndpointRegister = crate::vcell::EprCell;

    #[repr(C)]
    pub struct RegisterBlock {
        pub EPR: [EndpointRegister; super::ENDPOINT_REGISTERS],
        _reserved: [u32; 8],
        pub CNTR: RWRegister<u32>,
        pub ISTR: RWRegister<u32>,
        pub FNR: RORegister<u32>,
        pub DADDR: RWRegister<u32>,
        pub BTABLE: RWRegister<u32>,
    }

    const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 0x54) as usize];

    /// A USB register block instance
    pub struct Instance {
        block: *const RegisterBlock,
    }

    impl Instance {
        /// # Safety
        ///
        /// `block` must point to the USB registers, or to memory
        /// that's laid out like the USB registers, for as long as the
        /// instance exists.
        pub(crate) unsafe fn new(block: *const ()) -> Self {
            Instance {
                block: block.cast(),
            }
        }
    }

    impl Deref for Instance {
        type Target = RegisterBlock;
        fn deref(&self) -> &RegisterBlock {
            // Safety: validity established when the instance was created.
            unsafe { &*self.block }
        }
    }

    // Safety: the instance only hands out shared references to
    // registers; each register access is a single volatile load or store.
    unsafe impl Send for Instance {}

    pub mod EPR {
        pub mod CTR_RX {
            pub const offset: u32 = 15;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod DTOG_RX {
            pub const offset: u32 = 14;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod STAT_RX {
            pub const offset: u32 = 12;
            pub const mask: u32 = 0b11 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod SETUP {
            pub const offset: u32 = 11;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod EP_TYPE {
            pub const offset: u32 = 9;
            pub const mask: u32 = 0b11 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod EP_KIND {
            pub const offset: u32 = 8;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod CTR_TX {
            pub const offset: u32 = 7;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod DTOG_TX {
            pub const offset: u32 = 6;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod STAT_TX {
            pub const offset: u32 = 4;
            pub const mask: u32 = 0b11 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod EA {
            pub const offset: u32 = 0;
            pub const mask: u32 = 0xF << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }

    pub mod CNTR {
        pub mod CTRM {
            pub const offset: u32 = 15;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod ERRM {
            pub const offset: u32 = 13;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod WKUPM {
            pub const offset: u32 = 12;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod SUSPM {
            pub const offset: u32 = 11;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod RESETM {
            pub const offset: u32 = 10;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod SOFM {
            pub const offset: u32 = 9;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod ESOFM {
            pub const offset: u32 = 8;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod PDWN {
            pub const offset: u32 = 1;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod FRES {
            pub const offset: u32 = 0;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }

    pub mod DADDR {
        pub mod EF {
            pub const offset: u32 = 7;
            pub const mask: u32 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod ADD {
            pub const offset: u32 = 0;
            pub const mask: u32 = 0x7F << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }

    pub mod BTABLE {
        pub mod BTABLE {
            pub const offset: u32 = 3;
            pub const mask: u32 = 0x1FFF << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }
}

/// The RAL API requires us to treat all endpoint registers as unique.
/// We can make it a little easier with this function, the `EpR` type,
/// and the helper module.
pub mod endpoint_register {
    use crate::ral;

    #[allow(non_snake_case)]
    pub struct EpR<'a> {
        pub EPR: &'a ral::usb::EndpointRegister,
    }

    pub use super::usb::EPR;

    pub fn register(usb: &ral::usb::Instance, endpoint: usize) -> EpR<'_> {
        match usb.EPR.get(endpoint) {
            Some(epr) => EpR { EPR: epr },
            None => unreachable!("USB_EP{}R register doesn't exist", endpoint),
        }
    }
}

/// Returns the PMA offset of the buffer descriptor table
pub fn btable(usb: &usb::Instance) -> u16 {
    (read_reg!(self::usb, usb, BTABLE, BTABLE) << 3) as u16
}

/// The register blocks taken from a [`Peripherals`](crate::Peripherals) implementation
pub struct Instances {
    pub usb: usb::Instance,
    pub pma: crate::pma::PacketMemory,
}

/// Produce instances for a set of peripherals
///
/// Call this once for each context that needs register access.
pub fn instances<P: crate::Peripherals>(peripherals: &P) -> Instances {
    // Safety: the Peripherals implementation guarantees the addresses.
    unsafe {
        Instances {
            usb: usb::Instance::new(peripherals.usb()),
            pma: crate::pma::PacketMemory::new(peripherals.pma()),
        }
    }
}
