//! The application's view of the virtual COM port
//!
//! None of these calls block, except the `*_blocking` writes and the
//! [`core::fmt::Write`] implementation. Those spin until the USB interrupt
//! reports the previous packet as sent, without a timeout.

use crate::{
    engine::DeviceState,
    line::ControlLines,
    pma::PacketMemory,
    ral,
    reset::ResetState,
    state::{SerialState, RX, TX},
};

/// The application half of the driver
///
/// Produced by [`SerialState::split`].
pub struct Serial {
    usb: ral::usb::Instance,
    pma: PacketMemory,
    state: &'static SerialState,
}

impl Serial {
    pub(crate) fn new(
        usb: ral::usb::Instance,
        pma: PacketMemory,
        state: &'static SerialState,
    ) -> Self {
        Serial { usb, pma, state }
    }

    /// Initialize the USB peripheral, and enable its interrupts
    ///
    /// The device remains unconnected until the host resets the bus.
    pub fn enable(&mut self) {
        ral::write_reg!(ral::usb, &self.usb, CNTR, FRES: 1);
        ral::write_reg!(ral::usb, &self.usb, CNTR, 0);
        ral::write_reg!(ral::usb, &self.usb, ISTR, 0);
        ral::write_reg!(ral::usb, &self.usb, CNTR, RESETM: 1, SUSPM: 1, WKUPM: 1);
        ral::write_reg!(ral::usb, &self.usb, ISTR, 0);
        ral::write_reg!(
            ral::usb,
            &self.usb,
            CNTR,
            CTRM: 1,
            WKUPM: 1,
            SUSPM: 1,
            ERRM: 1,
            SOFM: 1,
            ESOFM: 1,
            RESETM: 1
        );
        self.state.device.set(DeviceState::Unconnected);
        debug!("ENABLED");
    }

    /// Mask all USB interrupts, and hold the peripheral in reset and power down
    pub fn disable(&mut self) {
        ral::write_reg!(ral::usb, &self.usb, CNTR, FRES: 1, PDWN: 1);
        ral::write_reg!(ral::usb, &self.usb, ISTR, 0);
        self.state.device.set(DeviceState::Unconnected);
        debug!("DISABLED");
    }

    /// Send up to one packet from `buf`
    ///
    /// Returns the number of bytes accepted. Returns 0 while the previous
    /// packet hasn't been sent; try again later.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        TX.submit(&self.usb, &self.pma, &self.state.tx, buf)
    }

    /// Send all of `buf`, spinning until each packet is accepted
    pub fn write_all_blocking(&mut self, mut buf: &[u8]) {
        while !buf.is_empty() {
            let written = self.write(buf);
            if written == 0 {
                core::hint::spin_loop();
            }
            buf = &buf[written..];
        }
    }

    /// Send one byte, spinning until it's accepted
    pub fn write_byte_blocking(&mut self, byte: u8) {
        self.write_all_blocking(&[byte]);
    }

    /// Copy received bytes into `buf`
    ///
    /// Returns the number of bytes copied, which is 0 when nothing is
    /// available.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        RX.drain(&self.usb, &self.pma, &self.state.rx, buf)
    }

    /// Returns the number of bytes that [`read`](Serial::read) can return
    pub fn available(&self) -> usize {
        RX.available(&self.state.rx)
    }

    /// Returns the number of bytes sent, but not yet acknowledged by the host
    pub fn pending_write(&self) -> usize {
        self.state.tx.get()
    }

    /// Returns the control lines from the host's last `SET_CONTROL_LINE_STATE`
    pub fn control_lines(&self) -> ControlLines {
        self.state.lines.load()
    }

    /// Indicates if the host asserted DTR
    pub fn dtr(&self) -> bool {
        self.control_lines().contains(ControlLines::DTR)
    }

    /// Indicates if the host asserted RTS
    pub fn rts(&self) -> bool {
        self.control_lines().contains(ControlLines::RTS)
    }

    /// Returns the DTR reset detector state
    pub fn reset_state(&self) -> ResetState {
        self.state.reset.state()
    }

    pub fn device_state(&self) -> DeviceState {
        self.state.device.get()
    }
}

impl core::fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_all_blocking(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{engine::DeviceState, fixture, ral};

    #[test]
    fn enable_unmasks_interrupts() {
        let board = fixture::Board::new();
        let (mut serial, _) = fixture::split(board);
        serial.enable();

        let usb = board.usb();
        let cntr = ral::read_reg!(ral::usb, &usb, CNTR);
        assert_eq!(cntr, 0xBF00);
        assert_eq!(ral::read_reg!(ral::usb, &usb, ISTR), 0);
        assert_eq!(serial.device_state(), DeviceState::Unconnected);
    }

    #[test]
    fn disable_masks_interrupts() {
        let board = fixture::Board::new();
        let (mut serial, _) = fixture::split(board);
        serial.enable();
        serial.disable();

        let usb = board.usb();
        let (fres, pdwn, ctrm) = ral::read_reg!(ral::usb, &usb, CNTR, FRES, PDWN, CTRM);
        assert_eq!((fres, pdwn, ctrm), (1, 1, 0));
        assert_eq!(serial.device_state(), DeviceState::Unconnected);
    }

    #[test]
    fn formatted_output() {
        use core::fmt::Write;

        let board = fixture::Board::new();
        let (mut serial, mut class) = fixture::split(board);
        crate::DeviceCallbacks::reset(&mut class);

        write!(serial, "hello").unwrap();
        assert_eq!(serial.pending_write(), 5);
        assert_eq!(board.host_in(1), b"hello");
    }

    #[test]
    fn blocking_byte_write() {
        let board = fixture::Board::new();
        let (mut serial, mut class) = fixture::split(board);
        crate::DeviceCallbacks::reset(&mut class);

        serial.write_byte_blocking(b'x');
        assert_eq!(serial.pending_write(), 1);
        assert_eq!(board.host_in(crate::TX_ENDPOINT), b"x");
    }

    #[test]
    fn blocking_write_spans_packets() {
        extern crate std;
        use crate::{state::SerialState, DeviceCallbacks};
        use std::vec::Vec;

        let board = fixture::Board::new();
        let state = fixture::leak(SerialState::new());
        let (mut serial, mut class) = state.split(board).unwrap();
        class.reset();
        let (usb, pma) = (board.usb(), board.pma());

        // Take each packet as it's staged, then complete the transfer.
        let host = std::thread::spawn(move || {
            let mut packets: Vec<Vec<u8>> = Vec::new();
            while packets.iter().map(Vec::len).sum::<usize>() < 40 {
                if state.tx.get() == 0 {
                    std::thread::yield_now();
                    continue;
                }
                packets.push(fixture::staged(&usb, &pma, crate::TX_ENDPOINT));
                class.endpoint_in(crate::TX_ENDPOINT);
            }
            packets
        });

        let data: [u8; 40] = core::array::from_fn(|idx| idx as u8);
        serial.write_all_blocking(&data);
        let packets = host.join().unwrap();

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0], &data[..crate::TX_LIMIT]);
        assert_eq!(packets[1], &data[crate::TX_LIMIT..]);
    }

    #[test]
    fn nothing_to_read() {
        let board = fixture::Board::new();
        let (mut serial, mut class) = fixture::split(board);
        crate::DeviceCallbacks::reset(&mut class);

        let mut buf = [0u8; 8];
        assert_eq!(serial.available(), 0);
        assert_eq!(serial.read(&mut buf), 0);
        assert!(!serial.dtr());
        assert!(!serial.rts());
    }
}
