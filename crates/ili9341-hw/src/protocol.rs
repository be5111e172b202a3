//! ILI9341 command set and the command/data framing over SPI.
//!
//! Framing:
//! - Opcode byte clocked with the D/C line low ("command")
//! - Parameter bytes clocked with the D/C line high ("data")
//! - Multi-byte parameters are big-endian
//!
//! The D/C line is always driven before the transfer it qualifies; the
//! controller latches D/C per byte, so a late switch corrupts decoding.

use crate::bus::Bus;
use crate::lines::{LineBank, LineRole, OutputLine};
use crate::Result;
use tracing::trace;

/// Controller opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Nop = 0x00,
    ReadDisplayId = 0x04,
    SleepIn = 0x10,
    SleepOut = 0x11,
    InversionOff = 0x20,
    InversionOn = 0x21,
    GammaSet = 0x26,
    DisplayOff = 0x28,
    DisplayOn = 0x29,
    ColumnAddressSet = 0x2A,
    PageAddressSet = 0x2B,
    MemoryWrite = 0x2C,
    MemoryAccessControl = 0x36,
    PixelFormatSet = 0x3A,
    FrameRateControl = 0xB1,
    DisplayFunctionControl = 0xB6,
    PowerControl1 = 0xC0,
    PowerControl2 = 0xC1,
    VcomControl1 = 0xC5,
    VcomControl2 = 0xC7,
    PowerControlA = 0xCB,
    PowerControlB = 0xCF,
    PositiveGamma = 0xE0,
    NegativeGamma = 0xE1,
    DriverTimingControlA = 0xE8,
    DriverTimingControlB = 0xEA,
    PowerOnSequenceControl = 0xED,
    Enable3Gamma = 0xF2,
    PumpRatioControl = 0xF7,
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        command as u8
    }
}

/// Level of the data/command line for a raw write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bytes are opcodes.
    Command,
    /// Bytes are parameters or pixel data.
    Data,
}

impl Mode {
    fn dc_level(self) -> bool {
        matches!(self, Mode::Data)
    }
}

/// Bus plus control lines: everything needed to talk to one controller.
pub struct Interface<B, L> {
    bus: B,
    lines: LineBank<L>,
}

impl<B: Bus, L: OutputLine> Interface<B, L> {
    /// Creates an interface from an open bus and acquired lines.
    pub fn new(bus: B, lines: LineBank<L>) -> Self {
        Self { bus, lines }
    }

    /// Sends a bare opcode.
    pub fn write_command(&mut self, opcode: u8) -> Result<()> {
        trace!("CMD {:02X}", opcode);
        self.write_array(Mode::Command, &[opcode])
    }

    /// Sends an opcode followed by its parameter bytes.
    pub fn write_command_with_data(&mut self, opcode: u8, payload: &[u8]) -> Result<()> {
        self.write_command(opcode)?;
        if payload.is_empty() {
            return Ok(());
        }
        trace!("DATA {} byte(s)", payload.len());
        self.write_array(Mode::Data, payload)
    }

    /// Sends an opcode and reads `len` response bytes in one transaction.
    pub fn read_register(&mut self, opcode: u8, len: usize) -> Result<Vec<u8>> {
        let mut rx = vec![0u8; len];
        self.set_mode(Mode::Command)?;
        self.bus.write_read(&[opcode], &mut rx)?;
        trace!("READ {:02X} -> {:02X?}", opcode, rx);
        Ok(rx)
    }

    /// Writes a single byte in the given mode.
    pub fn write(&mut self, mode: Mode, byte: u8) -> Result<()> {
        self.write_array(mode, &[byte])
    }

    /// Writes `bytes` in the given mode as one bus transfer.
    pub fn write_array(&mut self, mode: Mode, bytes: &[u8]) -> Result<()> {
        self.set_mode(mode)?;
        self.bus.write(bytes)
    }

    /// Drives one of the control lines.
    pub fn set_line(&mut self, role: LineRole, active: bool) -> Result<()> {
        self.lines.set(role, active)
    }

    /// Returns the control lines.
    pub fn lines(&self) -> &LineBank<L> {
        &self.lines
    }

    /// Splits the interface back into its bus and lines.
    pub fn into_parts(self) -> (B, LineBank<L>) {
        (self.bus, self.lines)
    }

    fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.lines.set(LineRole::DataCommand, mode.dc_level())
    }
}
