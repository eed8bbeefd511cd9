//! The interrupt half of the driver
//!
//! [`Class`] implements the device callbacks for the USB engine. It
//! configures the endpoints on bus reset, answers the CDC ACM class
//! requests, serves the descriptors, and routes endpoint completions to the
//! data channels.

use usb_device::control::Request;

use crate::{
    control::{self, ClassRequest},
    descriptors,
    endpoint::{Endpoint, Kind, Status},
    engine::{CopyData, DeviceCallbacks, DeviceState, SetupResult},
    line::LineCoding,
    pma::PacketMemory,
    ral::{self, btable},
    state::{SerialState, RX, TX},
};

/// The interrupt half of the driver
///
/// Produced by [`SerialState::split`]. Call the [`DeviceCallbacks`] from
/// your USB engine, in the USB interrupt.
pub struct Class {
    usb: ral::usb::Instance,
    pma: PacketMemory,
    state: &'static SerialState,
    line_coding: LineCoding,
    data_stage: Option<ClassRequest>,
}

impl Class {
    pub(crate) fn new(
        usb: ral::usb::Instance,
        pma: PacketMemory,
        state: &'static SerialState,
    ) -> Self {
        Class {
            usb,
            pma,
            state,
            line_coding: LineCoding::DEFAULT,
            data_stage: None,
        }
    }

    /// Returns the line coding most recently set by the host
    pub fn line_coding(&self) -> LineCoding {
        self.line_coding
    }

    /// Handle a correct transfer interrupt on data endpoint `ep`
    ///
    /// Acknowledges each completed direction, then dispatches its callback.
    pub fn service_endpoint(&mut self, ep: usize) {
        let endpoint = Endpoint::new(ep);
        if endpoint.is_rx_complete(&self.usb) {
            endpoint.clear_ctr_rx(&self.usb);
            self.endpoint_out(ep);
        }
        if endpoint.is_tx_complete(&self.usb) {
            endpoint.clear_ctr_tx(&self.usb);
            self.endpoint_in(ep);
        }
    }

    fn initialize_control(&self) {
        let ep0 = Endpoint::new(crate::CONTROL_ENDPOINT);
        let descriptor = self.pma.descriptor(btable(&self.usb), ep0.index());

        ep0.set_kind(&self.usb, Kind::Control);
        ep0.set_tx_status(&self.usb, Status::Stall);
        descriptor.set_rx_addr(crate::CONTROL_RX_ADDR);
        descriptor.set_tx_addr(crate::CONTROL_TX_ADDR);
        ep0.clear_status_out(&self.usb);
        descriptor.set_rx_capacity(crate::MAX_PACKET_SIZE);
        ep0.set_rx_status(&self.usb, Status::Valid);
    }

    fn initialize_notification(&self) {
        let ep = Endpoint::new(crate::NOTIFICATION_ENDPOINT);
        ep.set_kind(&self.usb, Kind::Interrupt);
        self.pma
            .descriptor(btable(&self.usb), ep.index())
            .set_tx_addr(crate::NOTIFICATION_ADDR);
        ep.set_tx_status(&self.usb, Status::Nak);
        ep.set_rx_status(&self.usb, Status::Disabled);
    }

    /// Respond to the default address, with every endpoint numbered by its register
    fn set_default_address(&self) {
        for ep in 0..crate::NUM_ENDPOINTS {
            Endpoint::new(ep).set_address(&self.usb);
        }
        ral::write_reg!(ral::usb, &self.usb, DADDR, EF: 1, ADD: 0);
    }
}

impl DeviceCallbacks for Class {
    fn reset(&mut self) {
        ral::write_reg!(ral::usb, &self.usb, BTABLE, BTABLE: u32::from(crate::BTABLE_ADDRESS) >> 3);

        self.initialize_control();
        self.initialize_notification();

        RX.endpoint().set_kind(&self.usb, Kind::Bulk);
        RX.initialize(&self.usb, &self.pma);

        TX.endpoint().set_kind(&self.usb, Kind::Bulk);
        TX.initialize(&self.usb, &self.pma);

        self.state.device.set(DeviceState::Attached);
        self.set_default_address();

        self.state.rx.clear();
        self.state.tx.clear();
        self.data_stage = None;
        debug!("RESET");
    }

    fn data_setup(&mut self, request: &Request) -> SetupResult {
        self.data_stage = control::data_setup(request);
        if self.data_stage.is_some() {
            debug!("CLASS {:?}", self.data_stage);
            SetupResult::Success
        } else {
            SetupResult::Unsupported
        }
    }

    fn copy_in(&mut self, offset: u16, length: u16) -> Option<CopyData<&[u8]>> {
        match self.data_stage {
            Some(ClassRequest::GetLineCoding) => {
                CopyData::of(self.line_coding.as_bytes(), offset, length)
            }
            _ => None,
        }
    }

    fn copy_out(&mut self, offset: u16, length: u16) -> Option<CopyData<&mut [u8]>> {
        match self.data_stage {
            Some(ClassRequest::SetLineCoding) => {
                CopyData::of_mut(self.line_coding.as_bytes_mut(), offset, length)
            }
            _ => None,
        }
    }

    fn no_data_setup(&mut self, request: &Request) -> SetupResult {
        control::no_data_setup(request, &self.state.lines, &self.state.reset)
    }

    fn interface_setting(&mut self, interface: u8, alternate: u8) -> SetupResult {
        if alternate > 0 || interface > 1 {
            SetupResult::Unsupported
        } else {
            SetupResult::Success
        }
    }

    fn device_descriptor(&self, offset: u16, length: u16) -> Option<CopyData<&'static [u8]>> {
        descriptors::descriptor_data(&descriptors::DEVICE, offset, length)
    }

    fn config_descriptor(&self, offset: u16, length: u16) -> Option<CopyData<&'static [u8]>> {
        descriptors::descriptor_data(&descriptors::CONFIG, offset, length)
    }

    fn string_descriptor(
        &self,
        index: u8,
        offset: u16,
        length: u16,
    ) -> Option<CopyData<&'static [u8]>> {
        descriptors::string_descriptor(index)
            .and_then(|table| descriptors::descriptor_data(table, offset, length))
    }

    fn set_configuration(&mut self, configuration: u8) {
        if configuration != 0 {
            self.state.device.set(DeviceState::Configured);
            debug!("CONFIGURED {}", configuration);
        }
    }

    fn set_device_address(&mut self) {
        self.state.device.set(DeviceState::Addressed);
    }

    fn endpoint_in(&mut self, ep: usize) {
        if ep == TX.endpoint().index() {
            TX.on_transmit_complete(&self.state.tx);
        }
    }

    fn endpoint_out(&mut self, ep: usize) {
        if ep == RX.endpoint().index() {
            RX.on_receive_complete(&self.usb, &self.pma, &self.state.rx);
        }
    }
}

#[cfg(test)]
mod test {
    use super::Class;
    use crate::{
        control::test::class_request,
        endpoint::{Endpoint, Kind, Status},
        engine::{CopyData, DeviceCallbacks, DeviceState, SetupResult},
        fixture,
        line::LineCoding,
        ral,
        reset::ResetState,
        serial::Serial,
    };
    use usb_device::UsbDirection;

    fn setup() -> (fixture::Board, Serial, Class) {
        let board = fixture::Board::new();
        let (serial, mut class) = fixture::split(board);
        class.reset();
        (board, serial, class)
    }

    fn set_control_lines(class: &mut Class, value: u16) -> SetupResult {
        class.no_data_setup(&class_request(UsbDirection::Out, 0x22, value, 0))
    }

    #[test]
    fn reset_configures_endpoints() {
        let (board, serial, _) = setup();
        let usb = board.usb();
        let pma = board.pma();

        let ep0 = Endpoint::new(0);
        assert_eq!(ep0.kind(&usb), Kind::Control);
        assert_eq!(ep0.tx_status(&usb), Status::Stall);
        assert_eq!(ep0.rx_status(&usb), Status::Valid);
        assert_eq!(pma.descriptor(0, 0).rx_addr(), 0x40);
        assert_eq!(pma.descriptor(0, 0).tx_addr(), 0x80);
        assert_eq!(pma.descriptor(0, 0).rx_capacity(), 64);

        let ep1 = Endpoint::new(1);
        assert_eq!(ep1.kind(&usb), Kind::Bulk);
        assert_eq!(ep1.tx_status(&usb), Status::Nak);
        assert_eq!(ep1.rx_status(&usb), Status::Disabled);
        assert_eq!(pma.descriptor(0, 1).tx_addr(), 0xC0);

        let ep2 = Endpoint::new(2);
        assert_eq!(ep2.kind(&usb), Kind::Interrupt);
        assert_eq!(ep2.tx_status(&usb), Status::Nak);
        assert_eq!(ep2.rx_status(&usb), Status::Disabled);
        assert_eq!(pma.descriptor(0, 2).tx_addr(), 0x100);

        let ep3 = Endpoint::new(3);
        assert_eq!(ep3.kind(&usb), Kind::Bulk);
        assert_eq!(ep3.rx_status(&usb), Status::Valid);
        assert_eq!(pma.descriptor(0, 3).rx_addr(), 0x110);
        assert_eq!(pma.descriptor(0, 3).rx_capacity(), 64);

        for ep in 0..4 {
            assert_eq!(board.epr(ep) & 0xF, ep as u32);
        }
        assert_eq!(ral::read_reg!(ral::usb, &usb, DADDR), 0x80);
        assert_eq!(serial.device_state(), DeviceState::Attached);
    }

    #[test]
    fn reset_forgets_data_in_flight() {
        let (board, mut serial, mut class) = setup();

        board.host_out(3, b"abc");
        class.service_endpoint(3);
        assert_eq!(serial.write(b"xyz"), 3);

        class.reset();
        assert_eq!(serial.available(), 0);
        assert_eq!(serial.pending_write(), 0);
        assert_eq!(Endpoint::new(3).rx_status(&board.usb()), Status::Valid);
    }

    #[test]
    fn control_line_scenario() {
        let (_, serial, mut class) = setup();

        assert_eq!(set_control_lines(&mut class, 0x0001), SetupResult::Success);
        assert_eq!(serial.reset_state(), ResetState::High);
        assert!(serial.dtr());
        assert!(!serial.rts());

        assert_eq!(set_control_lines(&mut class, 0x0000), SetupResult::Success);
        assert_eq!(serial.reset_state(), ResetState::NegEdge);
        assert!(!serial.dtr());
    }

    #[test]
    fn transmit_scenario() {
        let (board, mut serial, mut class) = setup();

        assert_eq!(serial.write(b"AB"), 2);
        assert_eq!(serial.pending_write(), 2);
        assert_eq!(serial.write(b"C"), 0);
        assert_eq!(serial.pending_write(), 2);
        assert_eq!(board.host_in(1), b"AB");

        board.host_in_ack(1);
        class.service_endpoint(1);
        assert_eq!(serial.pending_write(), 0);
        assert!(!Endpoint::new(1).is_tx_complete(&board.usb()));

        assert_eq!(serial.write(b"C"), 1);
        assert_eq!(board.host_in(1), b"C");
    }

    #[test]
    fn receive_scenario() {
        let (board, mut serial, mut class) = setup();

        board.host_out(3, b"0123456789");
        class.service_endpoint(3);
        assert!(!Endpoint::new(3).is_rx_complete(&board.usb()));
        assert_eq!(serial.available(), 10);

        let mut dst = [0u8; 4];
        assert_eq!(serial.read(&mut dst), 4);
        assert_eq!(&dst, b"0123");
        assert_eq!(serial.available(), 6);
        assert_eq!(Endpoint::new(3).rx_status(&board.usb()), Status::Nak);

        let mut dst2 = [0u8; 6];
        assert_eq!(serial.read(&mut dst2), 6);
        assert_eq!(&dst2, b"456789");
        assert_eq!(serial.available(), 0);
        assert_eq!(Endpoint::new(3).rx_status(&board.usb()), Status::Valid);
        assert_eq!(board.pma().descriptor(0, 3).rx_capacity(), 64);
    }

    #[test]
    fn line_coding_scenario() {
        let (_, _, mut class) = setup();
        let coding = LineCoding::new(9600, 0, 0, 8);

        let set = class_request(UsbDirection::Out, 0x20, 0, 7);
        assert_eq!(class.data_setup(&set), SetupResult::Success);
        assert_eq!(class.copy_out(0, 0), Some(CopyData::Length(7)));
        match class.copy_out(0, 7) {
            Some(CopyData::Buffer(dst)) => dst.copy_from_slice(coding.as_bytes()),
            other => panic!("{:?}", other),
        }
        assert_eq!(class.line_coding(), coding);

        let get = class_request(UsbDirection::In, 0x21, 0, 7);
        assert_eq!(class.data_setup(&get), SetupResult::Success);
        assert_eq!(class.copy_in(0, 0), Some(CopyData::Length(7)));
        assert_eq!(
            class.copy_in(0, 7),
            Some(CopyData::Buffer(&[0x80, 0x25, 0x00, 0x00, 0, 0, 8][..]))
        );
    }

    #[test]
    fn line_coding_is_not_validated() {
        let (_, _, mut class) = setup();
        let garbage = [0xFF, 0x00, 0xFF, 0x00, 7, 9, 0];

        class.data_setup(&class_request(UsbDirection::Out, 0x20, 0, 7));
        if let Some(CopyData::Buffer(dst)) = class.copy_out(0, 7) {
            dst.copy_from_slice(&garbage);
        }
        class.data_setup(&class_request(UsbDirection::In, 0x21, 0, 7));
        assert_eq!(class.copy_in(0, 7), Some(CopyData::Buffer(&garbage[..])));
    }

    #[test]
    fn default_line_coding() {
        let (_, _, mut class) = setup();
        class.data_setup(&class_request(UsbDirection::In, 0x21, 0, 7));
        assert_eq!(
            class.copy_in(0, 7),
            Some(CopyData::Buffer(&[0x00, 0xC2, 0x01, 0x00, 0, 0, 8][..]))
        );
    }

    #[test]
    fn unsupported_request_scenario() {
        let (_, _, mut class) = setup();
        let req = class_request(UsbDirection::Out, 0x99, 0, 0);
        assert_eq!(class.no_data_setup(&req), SetupResult::Unsupported);
        assert_eq!(class.data_setup(&req), SetupResult::Unsupported);
        assert_eq!(class.copy_in(0, 7), None);
        assert_eq!(class.copy_out(0, 7), None);
    }

    #[test]
    fn data_stage_direction_must_match() {
        let (_, _, mut class) = setup();
        class.data_setup(&class_request(UsbDirection::In, 0x21, 0, 7));
        assert_eq!(class.copy_out(0, 7), None);
        class.data_setup(&class_request(UsbDirection::Out, 0x20, 0, 7));
        assert_eq!(class.copy_in(0, 7), None);
    }

    #[test]
    fn interface_settings() {
        let (_, _, mut class) = setup();
        assert_eq!(class.interface_setting(0, 0), SetupResult::Success);
        assert_eq!(class.interface_setting(1, 0), SetupResult::Success);
        assert_eq!(class.interface_setting(2, 0), SetupResult::Unsupported);
        assert_eq!(class.interface_setting(0, 1), SetupResult::Unsupported);
    }

    #[test]
    fn descriptors() {
        let (_, _, class) = setup();
        assert_eq!(class.device_descriptor(0, 0), Some(CopyData::Length(18)));
        assert_eq!(class.config_descriptor(0, 0), Some(CopyData::Length(67)));
        assert_eq!(class.string_descriptor(1, 0, 0), Some(CopyData::Length(18)));
        assert_eq!(class.string_descriptor(2, 0, 0), Some(CopyData::Length(22)));
        assert_eq!(class.string_descriptor(3, 0, 0), None);
        match class.config_descriptor(0, 9) {
            Some(CopyData::Buffer(header)) => assert_eq!(header[2], 0x43),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn device_state_transitions() {
        let (_, serial, mut class) = setup();
        class.set_device_address();
        assert_eq!(serial.device_state(), DeviceState::Addressed);
        class.set_configuration(0);
        assert_eq!(serial.device_state(), DeviceState::Addressed);
        class.set_configuration(1);
        assert_eq!(serial.device_state(), DeviceState::Configured);
    }

    #[test]
    fn other_endpoints_are_ignored() {
        let (board, mut serial, mut class) = setup();
        assert_eq!(serial.write(b"A"), 1);

        // Completions on the notification endpoint don't touch the data channels
        board.host_in_ack(2);
        class.service_endpoint(2);
        class.endpoint_out(1);
        assert_eq!(serial.pending_write(), 1);
        assert_eq!(serial.available(), 0);
    }
}
