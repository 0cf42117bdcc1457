//! CM6206 register map and the activation command table.
//!
//! The chip exposes its configuration registers through a 4-byte control
//! write on the default pipe: `[0x20, DATAL, DATAH, register]`.

/// First payload byte of every register write.
pub const WRITE_MARKER: u8 = 0x20;
/// Length of the register write payload.
pub const PAYLOAD_LEN: usize = 4;

const DIR_OUT: u8 = 0x00;
const TYPE_VENDOR: u8 = 0x40;
const RECIPIENT_INTERFACE: u8 = 0x01;

/// Setup packet fields of a control transfer (`wLength` is the payload length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    /// `bmRequestType`
    pub request_type: u8,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
}

/// Setup used for every register write: host-to-device, vendor, interface
/// recipient, request `0x09`, `wValue` `0x0200`, `wIndex` 3.
pub const REGISTER_WRITE: ControlSetup = ControlSetup {
    request_type: DIR_OUT | TYPE_VENDOR | RECIPIENT_INTERFACE,
    request: 0x09,
    value: 0x0200,
    index: 0x03,
};

/// One register write of the activation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterCommand {
    /// Register index
    pub register: u8,
    /// 16-bit register value
    pub value: u16,
    /// Human-readable description used in diagnostics
    pub label: &'static str,
}

impl RegisterCommand {
    /// Payload for this command.
    #[must_use]
    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        encode_payload(self.register, self.value)
    }
}

/// Commands that enable the outputs, in the order they must be sent.
///
/// * REG0 `0xa004`: S/PDIF out is clock master, 48 kHz, copyright not asserted.
/// * REG1 `0x2000`: PLL binary search enable (`PLLBINen`), needed for clock lock.
/// * REG2 `0x8004`: line-out driver on (`DRIVERON`), BTL / stereo mic (`EN_BTL`).
pub const ACTIVATION_SEQUENCE: [RegisterCommand; 3] = [
    RegisterCommand {
        register: 0x00,
        value: 0xa004,
        label: "REG0 configuration (S/PDIF, sampling rate)",
    },
    RegisterCommand { register: 0x01, value: 0x2000, label: "REG1 configuration (PLL binary search)" },
    RegisterCommand {
        register: 0x02,
        value: 0x8004,
        label: "REG2 configuration (analog output, stereo mic)",
    },
];

/// Encode a register write as `[0x20, value_low, value_high, register]`.
#[must_use]
pub fn encode_payload(register: u8, value: u16) -> [u8; PAYLOAD_LEN] {
    let [low, high] = value.to_le_bytes();
    [WRITE_MARKER, low, high, register]
}
