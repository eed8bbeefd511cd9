//! Endpoint flow control
//!
//! `USB_EPnR` registers mix three kinds of bits:
//!
//! - `CTR_RX` and `CTR_TX` are cleared by writing 0. Writing 1 is a no-op.
//! - `DTOG_*` and `STAT_*` toggle when written with 1. Writing 0 is a no-op.
//! - `SETUP` is read only, and the rest are plain read / write.
//!
//! Every update here is a read-modify-write that writes 1 to both `CTR`
//! flags, writes 0 to every toggle bit that isn't the target, and XORs
//! the target's current value with the requested value.

use crate::ral::{self, endpoint_register, endpoint_register::EPR};

/// Bits that must be written back as they're read
const NON_TOGGLE: u32 = EPR::CTR_RX::mask
    | EPR::SETUP::mask
    | EPR::EP_TYPE::mask
    | EPR::EP_KIND::mask
    | EPR::CTR_TX::mask
    | EPR::EA::mask;

/// Writing these does nothing
const CTR_NOP: u32 = EPR::CTR_RX::mask | EPR::CTR_TX::mask;

/// Endpoint handshake status, per direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u32)]
pub enum Status {
    /// The endpoint ignores all transactions.
    Disabled = 0b00,
    /// Respond with STALL.
    Stall = 0b01,
    /// Respond with NAK. The host tries again later.
    Nak = 0b10,
    /// Ready for a transaction.
    Valid = 0b11,
}

#[cfg(test)]
impl Status {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Status::Disabled,
            0b01 => Status::Stall,
            0b10 => Status::Nak,
            _ => Status::Valid,
        }
    }
}

/// Endpoint transfer type, as encoded in `EP_TYPE`
///
/// The device has no isochronous endpoints, so that encoding is left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u32)]
pub enum Kind {
    Bulk = 0b00,
    Control = 0b01,
    Interrupt = 0b11,
}

/// The value to write to change the RX status to `status`
fn rx_status_write(epr: u32, status: Status) -> u32 {
    let epr = epr & !(EPR::STAT_TX::mask | EPR::DTOG_RX::mask | EPR::DTOG_TX::mask);
    (epr | CTR_NOP) ^ ((status as u32) << EPR::STAT_RX::offset)
}

/// The value to write to change the TX status to `status`
fn tx_status_write(epr: u32, status: Status) -> u32 {
    let epr = epr & !(EPR::STAT_RX::mask | EPR::DTOG_RX::mask | EPR::DTOG_TX::mask);
    (epr | CTR_NOP) ^ ((status as u32) << EPR::STAT_TX::offset)
}

/// The value to write to replace the plain field under `mask` with `value`
fn field_write(epr: u32, mask: u32, value: u32) -> u32 {
    (epr & NON_TOGGLE & !mask) | CTR_NOP | (value & mask)
}

/// The value to write to acknowledge the `CTR` flag under `mask`
fn ctr_clear_write(epr: u32, mask: u32) -> u32 {
    ((epr & NON_TOGGLE) | CTR_NOP) & !mask
}

/// A USB endpoint register, identified by number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    index: usize,
}

impl Endpoint {
    pub const fn new(index: usize) -> Self {
        Endpoint { index }
    }

    /// Returns the endpoint number
    pub const fn index(&self) -> usize {
        self.index
    }

    fn update(&self, usb: &ral::usb::Instance, f: impl FnOnce(u32) -> u32) {
        let epr = endpoint_register::register(usb, self.index);
        let value = f(epr.EPR.read());
        epr.EPR.write(value);
    }

    /// Set the receive (OUT) status, leaving the transmit status alone
    pub fn set_rx_status(&self, usb: &ral::usb::Instance, status: Status) {
        self.update(usb, |epr| rx_status_write(epr, status));
    }

    /// Set the transmit (IN) status, leaving the receive status alone
    pub fn set_tx_status(&self, usb: &ral::usb::Instance, status: Status) {
        self.update(usb, |epr| tx_status_write(epr, status));
    }

    /// Set the endpoint transfer type
    pub fn set_kind(&self, usb: &ral::usb::Instance, kind: Kind) {
        self.update(usb, |epr| {
            field_write(epr, EPR::EP_TYPE::mask, (kind as u32) << EPR::EP_TYPE::offset)
        });
    }

    /// Clear `EP_KIND`, so a control endpoint accepts any status OUT length
    pub fn clear_status_out(&self, usb: &ral::usb::Instance) {
        self.update(usb, |epr| field_write(epr, EPR::EP_KIND::mask, 0));
    }

    /// Program the endpoint address field with this endpoint's number
    pub fn set_address(&self, usb: &ral::usb::Instance) {
        self.update(usb, |epr| field_write(epr, EPR::EA::mask, self.index as u32));
    }

    /// Acknowledge a completed OUT transaction
    pub fn clear_ctr_rx(&self, usb: &ral::usb::Instance) {
        self.update(usb, |epr| ctr_clear_write(epr, EPR::CTR_RX::mask));
    }

    /// Acknowledge a completed IN transaction
    pub fn clear_ctr_tx(&self, usb: &ral::usb::Instance) {
        self.update(usb, |epr| ctr_clear_write(epr, EPR::CTR_TX::mask));
    }

    /// Indicates if an OUT transaction completed, and isn't yet acknowledged
    pub fn is_rx_complete(&self, usb: &ral::usb::Instance) -> bool {
        let epr = endpoint_register::register(usb, self.index);
        ral::read_reg!(endpoint_register, &epr, EPR, CTR_RX == 1)
    }

    /// Indicates if an IN transaction completed, and isn't yet acknowledged
    pub fn is_tx_complete(&self, usb: &ral::usb::Instance) -> bool {
        let epr = endpoint_register::register(usb, self.index);
        ral::read_reg!(endpoint_register, &epr, EPR, CTR_TX == 1)
    }
}

#[cfg(test)]
impl Endpoint {
    /// Returns the receive status
    pub fn rx_status(&self, usb: &ral::usb::Instance) -> Status {
        let epr = endpoint_register::register(usb, self.index);
        Status::from_bits(ral::read_reg!(endpoint_register, &epr, EPR, STAT_RX))
    }

    /// Returns the transmit status
    pub fn tx_status(&self, usb: &ral::usb::Instance) -> Status {
        let epr = endpoint_register::register(usb, self.index);
        Status::from_bits(ral::read_reg!(endpoint_register, &epr, EPR, STAT_TX))
    }

    /// Returns the endpoint transfer type
    pub fn kind(&self, usb: &ral::usb::Instance) -> Kind {
        let epr = endpoint_register::register(usb, self.index);
        match ral::read_reg!(endpoint_register, &epr, EPR, EP_TYPE) {
            0b00 => Kind::Bulk,
            0b01 => Kind::Control,
            0b11 => Kind::Interrupt,
            other => panic!("EP{} has isochronous type {:#b}", self.index, other),
        }
    }
}
