//! ILI9341 panel driver.

use crate::bus::{Bus, SpidevBus};
use crate::config::PanelConfig;
use crate::init::{self, InitState};
use crate::lines::{CdevLine, LineBank, LineRole, OutputLine};
use crate::orientation::{ColorOrder, Orientation, Rotation};
use crate::protocol::{Command, Interface, Mode};
use crate::{Error, Result, BYTES_PER_PIXEL};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Inclusive rectangle in panel coordinates, as handed over by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl Area {
    /// Creates an area from two opposite corners (both included).
    pub fn new(x1: u16, y1: u16, x2: u16, y2: u16) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates an area from its top-left corner and size.
    ///
    /// Returns `None` for an empty size or when the far corner does not fit
    /// in panel coordinates.
    pub fn from_origin(x: u16, y: u16, width: u16, height: u16) -> Option<Self> {
        let x2 = x.checked_add(width.checked_sub(1)?)?;
        let y2 = y.checked_add(height.checked_sub(1)?)?;
        Some(Self::new(x, y, x2, y2))
    }

    /// Number of columns; zero for an inverted area.
    pub fn width(&self) -> u32 {
        (u32::from(self.x2) + 1).saturating_sub(u32::from(self.x1))
    }

    /// Number of rows; zero for an inverted area.
    pub fn height(&self) -> u32 {
        (u32::from(self.y2) + 1).saturating_sub(u32::from(self.y1))
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Payload size in bytes for this area.
    pub fn payload_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    fn fits(&self, width: u16, height: u16) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2 && self.x2 < width && self.y2 < height
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})-({}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Big-endian start/end pair for the column and page address registers.
fn address_range(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// ILI9341 panel controller.
///
/// Owns the bus and control lines of one panel. All calls block until the
/// hardware transfer completes; callers must not interleave calls from
/// several threads.
pub struct Ili9341<B, L> {
    iface: Interface<B, L>,
    orientation: Orientation,
    state: InitState,
    delay: fn(Duration),
}

impl Ili9341<SpidevBus, CdevLine> {
    /// Opens the SPI device and acquires the control lines.
    pub fn open(config: &PanelConfig) -> Result<Self> {
        let bus = SpidevBus::open(&config.bus_path, config.bus)?;
        let lines = LineBank::acquire(
            &config.dc,
            config.reset.as_ref(),
            config.backlight.as_ref(),
        )?;
        Ok(Self::new(bus, lines))
    }
}

impl<B: Bus, L: OutputLine> Ili9341<B, L> {
    /// Creates a driver over an open bus and acquired lines.
    pub fn new(bus: B, lines: LineBank<L>) -> Self {
        Self {
            iface: Interface::new(bus, lines),
            orientation: Orientation::default(),
            state: InitState::default(),
            delay: std::thread::sleep,
        }
    }

    /// Replaces the function used for the reset and sleep timing waits.
    pub fn with_delay(mut self, delay: fn(Duration)) -> Self {
        self.delay = delay;
        self
    }

    /// Resets the controller and programs the bring-up sequence.
    ///
    /// Leaves the panel at rotation 0, BGR. On error the panel is in an
    /// unknown configuration and `init` must be run again.
    pub fn init(&mut self) -> Result<()> {
        let result = init::run(&mut self.iface, self.delay, &mut self.state);
        if result.is_ok() {
            self.orientation = Orientation::default();
        }
        result
    }

    /// Returns how far bring-up got.
    pub fn init_state(&self) -> InitState {
        self.state
    }

    /// Pulses the reset line only. The controller loses all register state
    /// and comes back in portrait, so the orientation returns to rotation 0,
    /// BGR. Without a reset line this does nothing.
    pub fn hardware_reset(&mut self) -> Result<()> {
        init::reset_pulse(&mut self.iface, self.delay, &mut self.state)?;
        if self.iface.lines().has(LineRole::Reset) {
            self.orientation = Orientation::default();
        }
        Ok(())
    }

    /// Rotates the display. Only 0, 90, 180 and 270 are accepted.
    pub fn rotate(&mut self, degrees: u16, color_order: ColorOrder) -> Result<()> {
        let rotation = Rotation::try_from(degrees)?;
        self.set_orientation(Orientation::new(rotation, color_order))
    }

    /// Programs the Memory Access Control register.
    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<()> {
        let madctl = orientation.madctl();
        self.iface
            .write_command_with_data(Command::MemoryAccessControl.into(), &[madctl])?;
        self.orientation = orientation;
        info!("Orientation set to {} (MADCTL 0x{:02X})", orientation, madctl);
        Ok(())
    }

    /// Returns the last orientation programmed.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Returns the logical resolution for the current orientation.
    pub fn dimensions(&self) -> (u16, u16) {
        self.orientation.dimensions()
    }

    /// Writes a rectangle of RGB565 big-endian pixels.
    ///
    /// The address window is reprogrammed on every call, then the whole
    /// buffer goes out as one memory-write transfer. If this fails the
    /// controller's write pointer is unknown; resend the whole rectangle.
    pub fn flush(&mut self, area: Area, pixels: &[u8]) -> Result<()> {
        let (width, height) = self.dimensions();
        if !area.fits(width, height) {
            return Err(Error::InvalidWindow {
                x1: area.x1,
                y1: area.y1,
                x2: area.x2,
                y2: area.y2,
                width,
                height,
            });
        }
        let expected = area.payload_len();
        if pixels.len() != expected {
            return Err(Error::PixelBufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        self.set_window(area)?;
        self.iface
            .write_command_with_data(Command::MemoryWrite.into(), pixels)?;
        trace!("Flushed {} ({} bytes)", area, pixels.len());
        Ok(())
    }

    fn set_window(&mut self, area: Area) -> Result<()> {
        self.iface.write_command_with_data(
            Command::ColumnAddressSet.into(),
            &address_range(area.x1, area.x2),
        )?;
        self.iface.write_command_with_data(
            Command::PageAddressSet.into(),
            &address_range(area.y1, area.y2),
        )
    }

    /// Raw single-byte write in the given mode.
    pub fn write(&mut self, mode: Mode, byte: u8) -> Result<()> {
        self.iface.write(mode, byte)
    }

    /// Raw multi-byte write in the given mode.
    pub fn write_array(&mut self, mode: Mode, bytes: &[u8]) -> Result<()> {
        self.iface.write_array(mode, bytes)
    }

    /// Reads `len` bytes back from register `opcode`.
    pub fn read_register(&mut self, opcode: u8, len: usize) -> Result<Vec<u8>> {
        self.iface.read_register(opcode, len)
    }

    /// Reads the display identification (RDDID): a dummy byte followed by
    /// manufacturer, version and module ID.
    pub fn read_display_id(&mut self) -> Result<[u8; 3]> {
        let bytes = self.read_register(Command::ReadDisplayId.into(), 4)?;
        Ok([bytes[1], bytes[2], bytes[3]])
    }

    /// Switches the backlight. A no-op without a backlight line.
    pub fn set_backlight(&mut self, on: bool) -> Result<()> {
        self.iface.set_line(LineRole::Backlight, on)?;
        if self.iface.lines().has(LineRole::Backlight) {
            debug!("Backlight {}", if on { "on" } else { "off" });
        }
        Ok(())
    }

    /// Enters or leaves sleep mode.
    pub fn set_sleep(&mut self, sleep: bool) -> Result<()> {
        if sleep {
            self.iface.write_command(Command::SleepIn.into())?;
            (self.delay)(Duration::from_millis(5));
            self.state = self.state.min(InitState::PoweredConfigured);
        } else {
            self.iface.write_command(Command::SleepOut.into())?;
            (self.delay)(Duration::from_millis(120));
            self.state = self.state.max(InitState::SleepOut);
        }
        debug!("Sleep {}", if sleep { "in" } else { "out" });
        Ok(())
    }

    /// Turns the panel output on or off without touching frame memory.
    pub fn set_display_on(&mut self, on: bool) -> Result<()> {
        let command = if on {
            Command::DisplayOn
        } else {
            Command::DisplayOff
        };
        self.iface.write_command(command.into())
    }

    /// Enables or disables colour inversion.
    pub fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        let command = if inverted {
            Command::InversionOn
        } else {
            Command::InversionOff
        };
        self.iface.write_command(command.into())
    }

    /// Releases the control lines and closes the bus.
    pub fn release(self) {
        let (bus, lines) = self.iface.into_parts();
        lines.release();
        drop(bus);
        info!("Panel released");
    }
}
