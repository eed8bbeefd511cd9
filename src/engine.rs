//! The interface between the device and a USB protocol engine
//!
//! The engine runs enumeration and the control transfer state machine. It
//! calls into a [`DeviceCallbacks`] implementation for everything that's
//! specific to this device: bus reset, class requests, descriptors, and
//! endpoint completions.

use core::sync::atomic::{AtomicU8, Ordering};

use usb_device::control::Request;

/// Outcome of a SETUP request handled by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SetupResult {
    Success,
    /// The engine should STALL the transfer.
    Unsupported,
}

/// One step of a data stage
///
/// The engine first probes with a zero length to learn how many bytes
/// remain. Then, it asks for a buffer to copy from or into.
#[derive(Debug, PartialEq, Eq)]
pub enum CopyData<B> {
    /// Bytes remaining from the requested offset
    Length(u16),
    /// Bytes starting at the requested offset
    Buffer(B),
}

impl<'a> CopyData<&'a [u8]> {
    /// Serve `data` from `offset`
    ///
    /// Returns `None` if `offset` is past the end of `data`.
    pub fn of(data: &'a [u8], offset: u16, length: u16) -> Option<Self> {
        let data = data.get(usize::from(offset)..)?;
        if length == 0 {
            Some(CopyData::Length(data.len() as u16))
        } else {
            Some(CopyData::Buffer(&data[..data.len().min(usize::from(length))]))
        }
    }
}

impl<'a> CopyData<&'a mut [u8]> {
    /// Let the engine fill `data` from `offset`
    ///
    /// Returns `None` if `offset` is past the end of `data`.
    pub fn of_mut(data: &'a mut [u8], offset: u16, length: u16) -> Option<Self> {
        let data = data.get_mut(usize::from(offset)..)?;
        if length == 0 {
            Some(CopyData::Length(data.len() as u16))
        } else {
            let len = data.len().min(usize::from(length));
            Some(CopyData::Buffer(&mut data[..len]))
        }
    }
}

/// The device's position in the USB device state diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceState {
    Unconnected,
    Attached,
    Addressed,
    Configured,
}

/// A [`DeviceState`] shared between contexts
pub struct SharedDeviceState(AtomicU8);

impl SharedDeviceState {
    pub const fn new() -> Self {
        SharedDeviceState(AtomicU8::new(DeviceState::Unconnected as u8))
    }

    pub fn set(&self, state: DeviceState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn get(&self) -> DeviceState {
        match self.0.load(Ordering::Acquire) {
            1 => DeviceState::Attached,
            2 => DeviceState::Addressed,
            3 => DeviceState::Configured,
            _ => DeviceState::Unconnected,
        }
    }
}

/// Device-specific behavior, called by the USB engine
///
/// Every method runs in the USB interrupt context.
pub trait DeviceCallbacks {
    /// Handle a USB bus reset
    ///
    /// Set up every endpoint, and return to the default address.
    fn reset(&mut self);

    /// Accept or reject a class request that has a data stage
    fn data_setup(&mut self, request: &Request) -> SetupResult;

    /// Supply data for a device-to-host data stage
    ///
    /// Only valid after a successful [`data_setup`](DeviceCallbacks::data_setup).
    fn copy_in(&mut self, offset: u16, length: u16) -> Option<CopyData<&[u8]>>;

    /// Supply a buffer for a host-to-device data stage
    ///
    /// Only valid after a successful [`data_setup`](DeviceCallbacks::data_setup).
    fn copy_out(&mut self, offset: u16, length: u16) -> Option<CopyData<&mut [u8]>>;

    /// Accept or reject a class request that has no data stage
    fn no_data_setup(&mut self, request: &Request) -> SetupResult;

    /// Check an interface and alternate setting requested by the host
    fn interface_setting(&mut self, interface: u8, alternate: u8) -> SetupResult;

    fn device_descriptor(&self, offset: u16, length: u16) -> Option<CopyData<&'static [u8]>>;

    fn config_descriptor(&self, offset: u16, length: u16) -> Option<CopyData<&'static [u8]>>;

    /// Returns `None` for an unknown string index
    fn string_descriptor(
        &self,
        index: u8,
        offset: u16,
        length: u16,
    ) -> Option<CopyData<&'static [u8]>>;

    /// The host selected `configuration`
    fn set_configuration(&mut self, configuration: u8);

    /// The host assigned the device an address
    fn set_device_address(&mut self);

    /// An IN transaction completed on endpoint `ep`
    fn endpoint_in(&mut self, ep: usize);

    /// An OUT transaction completed on endpoint `ep`
    fn endpoint_out(&mut self, ep: usize);
}
