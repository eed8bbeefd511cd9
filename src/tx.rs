//! Transmit path for the bulk IN data endpoint
//!
//! At most one packet is in flight. A submission stages bytes in packet
//! memory and marks the endpoint VALID. The transmit-complete callback
//! clears the pending count, and only then is the next submission accepted.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    endpoint::{Endpoint, Status},
    pma::PacketMemory,
    ral::{self, btable},
};

/// Bytes submitted to the host, but not yet acknowledged
pub struct TxPending(AtomicUsize);

impl TxPending {
    pub const fn new() -> Self {
        TxPending(AtomicUsize::new(0))
    }

    /// Returns the number of outstanding bytes
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, count: usize) {
        self.0.store(count, Ordering::Release);
    }

    /// Forget the outstanding packet
    pub fn clear(&self) {
        self.set(0);
    }
}

/// The transmit half of the data interface
pub struct TxChannel {
    endpoint: Endpoint,
    addr: u16,
    limit: usize,
}

impl TxChannel {
    /// `limit` is the most bytes accepted by one [`submit`](TxChannel::submit).
    pub const fn new(endpoint: usize, addr: u16, limit: usize) -> Self {
        TxChannel {
            endpoint: Endpoint::new(endpoint),
            addr,
            limit,
        }
    }

    /// Returns the endpoint register backing this channel
    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Point the endpoint at its packet memory, and NAK until there's data
    pub fn initialize(&self, usb: &ral::usb::Instance, pma: &PacketMemory) {
        pma.descriptor(btable(usb), self.endpoint.index())
            .set_tx_addr(self.addr);
        self.endpoint.set_tx_status(usb, Status::Nak);
        self.endpoint.set_rx_status(usb, Status::Disabled);
    }

    /// Stage up to `limit` bytes of `buf` for the host
    ///
    /// Returns the number of bytes accepted. Returns 0, and does nothing,
    /// while the previous packet is still in flight.
    pub fn submit(
        &self,
        usb: &ral::usb::Instance,
        pma: &PacketMemory,
        pending: &TxPending,
        buf: &[u8],
    ) -> usize {
        if pending.get() != 0 {
            return 0;
        }
        let len = buf.len().min(self.limit);
        if len != 0 {
            pma.write(self.addr, &buf[..len]);
            pma.descriptor(btable(usb), self.endpoint.index())
                .set_tx_count(len as u16);
            // Pending before VALID, so the completion can't race ahead.
            pending.set(len);
            self.endpoint.set_tx_status(usb, Status::Valid);
        }
        len
    }

    /// Handle a completed IN transaction
    ///
    /// Call from the endpoint's transmit-complete callback.
    pub fn on_transmit_complete(&self, pending: &TxPending) {
        trace!("EP{} IN {}", self.endpoint.index(), pending.get());
        pending.clear();
    }
}
