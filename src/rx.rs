//! Receive path for the bulk OUT data endpoint
//!
//! Receive is stop-and-wait. When a packet lands, the endpoint is set to
//! NAK and the packet is copied into the [`RxBuffer`]. The host can't send
//! another packet until the application drains every byte, at which point
//! the endpoint is re-armed for one full packet.

use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    endpoint::{Endpoint, Status},
    pma::PacketMemory,
    ral::{self, btable},
};

/// Receive buffer capacity, in bytes
pub const RX_BUFFER_LEN: usize = crate::RX_MAX_PACKET_SIZE as usize * 3;

/// Bytes received from the host, waiting for the application
///
/// The interrupt handler is the only producer. It writes the buffer and
/// publishes `unread` while the endpoint NAKs. The application is the only
/// consumer, and the endpoint stays NAK until it's consumed everything.
pub struct RxBuffer {
    bytes: UnsafeCell<[u8; RX_BUFFER_LEN]>,
    unread: AtomicUsize,
    offset: AtomicUsize,
}

// Safety: producer and consumer never touch `bytes` at the same time.
// See the type-level documentation.
unsafe impl Sync for RxBuffer {}

impl RxBuffer {
    pub const fn new() -> Self {
        RxBuffer {
            bytes: UnsafeCell::new([0; RX_BUFFER_LEN]),
            unread: AtomicUsize::new(0),
            offset: AtomicUsize::new(0),
        }
    }

    /// Returns the number of bytes that haven't been drained
    pub fn unread(&self) -> usize {
        self.unread.load(Ordering::Acquire)
    }

    /// Returns the drain position
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Relaxed)
    }

    /// Forget everything in the buffer
    pub fn clear(&self) {
        self.offset.store(0, Ordering::Relaxed);
        self.unread.store(0, Ordering::Release);
    }
}

/// The receive half of the data interface
pub struct RxChannel {
    endpoint: Endpoint,
    addr: u16,
    max_packet_size: u16,
}

impl RxChannel {
    pub const fn new(endpoint: usize, addr: u16, max_packet_size: u16) -> Self {
        assert!(max_packet_size as usize <= RX_BUFFER_LEN);
        RxChannel {
            endpoint: Endpoint::new(endpoint),
            addr,
            max_packet_size,
        }
    }

    /// Returns the endpoint register backing this channel
    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Point the endpoint at its packet memory, and accept one packet
    pub fn initialize(&self, usb: &ral::usb::Instance, pma: &PacketMemory) {
        let descriptor = pma.descriptor(btable(usb), self.endpoint.index());
        descriptor.set_rx_addr(self.addr);
        self.arm(usb, pma);
    }

    /// Accept one more packet from the host
    pub fn arm(&self, usb: &ral::usb::Instance, pma: &PacketMemory) {
        pma.descriptor(btable(usb), self.endpoint.index())
            .set_rx_capacity(self.max_packet_size);
        self.endpoint.set_rx_status(usb, Status::Valid);
    }

    /// Handle a completed OUT transaction
    ///
    /// Call from the endpoint's receive-complete callback.
    pub fn on_receive_complete(
        &self,
        usb: &ral::usb::Instance,
        pma: &PacketMemory,
        buffer: &RxBuffer,
    ) {
        let descriptor = pma.descriptor(btable(usb), self.endpoint.index());
        let reported = usize::from(descriptor.rx_count());
        let count = reported.min(usize::from(self.max_packet_size));
        self.endpoint.set_rx_status(usb, Status::Nak);
        if reported != count {
            warn!("EP{} OUT {} exceeds the packet size", self.endpoint.index(), reported);
        }
        trace!("EP{} OUT {}", self.endpoint.index(), count);

        if count == 0 {
            self.arm(usb, pma);
            return;
        }

        // Safety: the endpoint was VALID, so the application drained
        // everything and won't look at the buffer until `unread` is published.
        let bytes = unsafe { &mut *buffer.bytes.get() };
        pma.read(self.addr, &mut bytes[..count]);
        buffer.offset.store(0, Ordering::Relaxed);
        buffer.unread.store(count, Ordering::Release);
    }

    /// Returns the number of received bytes waiting to be drained
    pub fn available(&self, buffer: &RxBuffer) -> usize {
        buffer.unread()
    }

    /// Copy up to `dst.len()` received bytes into `dst`
    ///
    /// Returns the number of bytes copied. Draining the last byte re-arms
    /// the endpoint.
    pub fn drain(
        &self,
        usb: &ral::usb::Instance,
        pma: &PacketMemory,
        buffer: &RxBuffer,
        dst: &mut [u8],
    ) -> usize {
        let unread = buffer.unread();
        let len = dst.len().min(unread);
        if len == 0 {
            return 0;
        }

        let offset = buffer.offset();
        // Safety: `unread` is non-zero, so the endpoint NAKs, and the
        // interrupt handler won't write the buffer.
        let bytes = unsafe { &*buffer.bytes.get() };
        dst[..len].copy_from_slice(&bytes[offset..offset + len]);

        if unread == len {
            buffer.clear();
            self.arm(usb, pma);
        } else {
            buffer.offset.store(offset + len, Ordering::Relaxed);
            buffer.unread.store(unread - len, Ordering::Release);
        }
        len
    }
}
