//! Display orientation support.
//!
//! Rotation is done by the controller through the Memory Access Control
//! (MADCTL, 0x36) register: row/column address order, row/column exchange and
//! the RGB/BGR byte order are packed into a single byte.

use crate::{Error, Result, PANEL_HEIGHT, PANEL_WIDTH};
use std::str::FromStr;

/// Row address order (mirror Y).
pub const MADCTL_MY: u8 = 0x80;
/// Column address order (mirror X).
pub const MADCTL_MX: u8 = 0x40;
/// Row/column exchange.
pub const MADCTL_MV: u8 = 0x20;
/// BGR colour filter panel order.
pub const MADCTL_BGR: u8 = 0x08;

/// Panel rotation in 90° steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Portrait (240x320), native.
    #[default]
    Deg0,
    /// Landscape (320x240).
    Deg90,
    /// Portrait upside-down (240x320).
    Deg180,
    /// Landscape upside-down (320x240).
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Returns the angle in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Returns the MADCTL address-order bits for this rotation.
    pub fn address_bits(&self) -> u8 {
        match self {
            Rotation::Deg0 => MADCTL_MX,
            Rotation::Deg90 => MADCTL_MX | MADCTL_MY | MADCTL_MV,
            Rotation::Deg180 => MADCTL_MY,
            Rotation::Deg270 => MADCTL_MV,
        }
    }

    /// Returns true if rows and columns are exchanged.
    pub fn is_landscape(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Returns the logical display dimensions (width, height).
    pub fn dimensions(&self) -> (u16, u16) {
        if self.is_landscape() {
            (PANEL_HEIGHT, PANEL_WIDTH)
        } else {
            (PANEL_WIDTH, PANEL_HEIGHT)
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = Error;

    /// Angles other than 0, 90, 180 and 270 are rejected, never rounded.
    fn try_from(degrees: u16) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(Error::InvalidRotation(other)),
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Subpixel byte order of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    Rgb,
    #[default]
    Bgr,
}

impl ColorOrder {
    /// Returns the MADCTL byte-order bit.
    pub fn bit(&self) -> u8 {
        match self {
            ColorOrder::Rgb => 0,
            ColorOrder::Bgr => MADCTL_BGR,
        }
    }
}

impl FromStr for ColorOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rgb" => Ok(ColorOrder::Rgb),
            "bgr" => Ok(ColorOrder::Bgr),
            _ => Err(Error::Configuration(format!("invalid color order: {}", s))),
        }
    }
}

impl std::fmt::Display for ColorOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorOrder::Rgb => write!(f, "rgb"),
            ColorOrder::Bgr => write!(f, "bgr"),
        }
    }
}

/// Last orientation programmed into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub rotation: Rotation,
    pub color_order: ColorOrder,
}

impl Orientation {
    pub fn new(rotation: Rotation, color_order: ColorOrder) -> Self {
        Self {
            rotation,
            color_order,
        }
    }

    /// Returns the Memory Access Control byte.
    pub fn madctl(&self) -> u8 {
        self.rotation.address_bits() | self.color_order.bit()
    }

    /// Returns the logical display dimensions (width, height).
    pub fn dimensions(&self) -> (u16, u16) {
        self.rotation.dimensions()
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.rotation, self.color_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_madctl() {
        assert_eq!(Orientation::new(Rotation::Deg0, ColorOrder::Bgr).madctl(), 0x48);
        assert_eq!(Orientation::new(Rotation::Deg90, ColorOrder::Bgr).madctl(), 0xE8);
        assert_eq!(Orientation::new(Rotation::Deg180, ColorOrder::Rgb).madctl(), 0x80);
        assert_eq!(Orientation::new(Rotation::Deg270, ColorOrder::Rgb).madctl(), 0x20);
    }

    #[test]
    fn test_madctl_is_injective() {
        let mut seen = HashSet::new();
        for rotation in Rotation::ALL {
            for order in [ColorOrder::Rgb, ColorOrder::Bgr] {
                assert!(seen.insert(Orientation::new(rotation, order).madctl()));
            }
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_try_from_degrees() {
        assert_eq!(Rotation::try_from(90u16).unwrap(), Rotation::Deg90);
        assert_eq!(Rotation::try_from(270u16).unwrap(), Rotation::Deg270);
        for bad in [1u16, 45, 89, 360] {
            assert!(matches!(
                Rotation::try_from(bad),
                Err(Error::InvalidRotation(d)) if d == bad
            ));
        }
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(Rotation::Deg0.dimensions(), (240, 320));
        assert_eq!(Rotation::Deg90.dimensions(), (320, 240));
        assert_eq!(Rotation::Deg180.dimensions(), (240, 320));
        assert_eq!(Rotation::Deg270.dimensions(), (320, 240));
    }

    #[test]
    fn test_color_order_from_str() {
        assert_eq!("BGR".parse::<ColorOrder>().unwrap(), ColorOrder::Bgr);
        assert_eq!("rgb".parse::<ColorOrder>().unwrap(), ColorOrder::Rgb);
        assert!("grb".parse::<ColorOrder>().is_err());
    }
}
