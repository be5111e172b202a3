//! ILI9341 Hardware Library
//!
//! Drives an ILI9341 TFT controller from a Linux host: a spidev character
//! device carries the command/data bitstream and GPIO character-device lines
//! select data/command mode, reset the controller and switch the backlight.

pub mod bus;
pub mod config;
pub mod error;
pub mod framebuffer;
pub mod init;
pub mod lines;
pub mod orientation;
pub mod panel;
pub mod protocol;

#[cfg(test)]
pub(crate) mod mock;

pub use bus::{Bus, BusConfig, Segment, SpidevBus};
pub use config::PanelConfig;
pub use error::{Error, ErrorKind, Result};
pub use framebuffer::Framebuffer;
pub use init::InitState;
pub use lines::{CdevLine, LineBank, LineRole, LineSpec, OutputLine};
pub use orientation::{ColorOrder, Orientation, Rotation};
pub use panel::{Area, Ili9341};
pub use protocol::{Command, Interface, Mode};

/// Native panel dimensions (portrait, rotation 0).
pub const PANEL_WIDTH: u16 = 240;
pub const PANEL_HEIGHT: u16 = 320;

/// RGB565 pixels, as selected by the init sequence's pixel format.
pub const BYTES_PER_PIXEL: usize = 2;
