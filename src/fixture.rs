//! A board for host tests
//!
//! The USB registers and packet memory live in leaked heap memory. The
//! helpers that start with `host_` play the host and the peripheral,
//! completing transactions the way the hardware would.

extern crate std;

use std::{boxed::Box, vec::Vec};

use crate::{
    class::Class,
    endpoint::{Endpoint, Status},
    pma::{PacketMemory, PMA_SIZE},
    ral::{self, btable, endpoint_register::EPR, usb::RegisterBlock},
    serial::Serial,
    state::SerialState,
    vcell::VCell,
    Peripherals,
};

/// Leak `value`, producing a `'static` reference
pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

#[derive(Clone, Copy)]
pub struct Board {
    usb: &'static RegisterBlock,
    pma: &'static [VCell<u32>; PMA_SIZE / 2],
}

unsafe impl Peripherals for Board {
    fn usb(&self) -> *const () {
        (self.usb as *const RegisterBlock).cast()
    }
    fn pma(&self) -> *const () {
        self.pma.as_ptr().cast()
    }
}

impl Board {
    pub fn new() -> Self {
        // Safety: every register is an integer cell. All zeros is the reset value.
        let usb: RegisterBlock = unsafe { core::mem::zeroed() };
        Board {
            usb: leak(usb),
            pma: leak(core::array::from_fn(|_| VCell::new(0))),
        }
    }

    pub fn usb(&self) -> ral::usb::Instance {
        ral::instances(self).usb
    }

    pub fn pma(&self) -> PacketMemory {
        ral::instances(self).pma
    }

    /// Returns the raw value of `USB_EPnR`
    pub fn epr(&self, ep: usize) -> u32 {
        self.usb.EPR[ep].read()
    }

    /// Set `USB_EPnR`, as the peripheral would
    pub fn force_epr(&self, ep: usize, value: u32) {
        self.usb.EPR[ep].force(value);
    }

    /// The host sends `data` to OUT endpoint `ep`
    pub fn host_out(&self, ep: usize, data: &[u8]) {
        let usb = self.usb();
        assert_eq!(
            Endpoint::new(ep).rx_status(&usb),
            Status::Valid,
            "EP{} would NAK the host",
            ep
        );

        let pma = self.pma();
        let descriptor = pma.descriptor(btable(&usb), ep);
        assert!(data.len() <= usize::from(descriptor.rx_capacity()));
        pma.write(descriptor.rx_addr(), data);
        ral::modify_reg!(crate::pma, descriptor, COUNT_RX, COUNT: data.len() as u32);

        // The peripheral NAKs after a successful OUT, and flags the transfer.
        let epr = self.epr(ep) & !EPR::STAT_RX::mask;
        self.force_epr(
            ep,
            epr | EPR::CTR_RX::mask | ((Status::Nak as u32) << EPR::STAT_RX::offset),
        );
    }

    /// Returns the bytes staged for the next IN transaction on `ep`
    pub fn host_in(&self, ep: usize) -> Vec<u8> {
        staged(&self.usb(), &self.pma(), ep)
    }

    /// The host acknowledges the IN transaction on `ep`
    pub fn host_in_ack(&self, ep: usize) {
        let epr = self.epr(ep) & !EPR::STAT_TX::mask;
        self.force_epr(
            ep,
            epr | EPR::CTR_TX::mask | ((Status::Nak as u32) << EPR::STAT_TX::offset),
        );
    }
}

/// Returns the bytes staged for the next IN transaction on `ep`
///
/// Unlike [`Board::host_in`], this can run on another thread.
pub fn staged(usb: &ral::usb::Instance, pma: &PacketMemory, ep: usize) -> Vec<u8> {
    let descriptor = pma.descriptor(btable(usb), ep);
    let mut data = std::vec![0; usize::from(descriptor.tx_count())];
    pma.read(descriptor.tx_addr(), &mut data);
    data
}

/// Split a fresh driver state, backed by `board`
pub fn split(board: Board) -> (Serial, Class) {
    leak(SerialState::new()).split(board).unwrap()
}
