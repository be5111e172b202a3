//! Configuration file handling.

use anyhow::{Context, Result};
use ili9341_hw::BusConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// SPI bus settings
    #[serde(default)]
    pub spi: SpiConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// SPI bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiConfig {
    /// Clock speed in Hz
    #[serde(default = "default_speed_hz")]
    pub speed_hz: u32,

    /// Bits per word
    #[serde(default = "default_bits_per_word")]
    pub bits_per_word: u8,

    /// Delay between transfers in microseconds
    #[serde(default)]
    pub delay_us: u16,

    /// Largest single flush in bytes; 0 sends the whole frame in one flush.
    /// Must not exceed the spidev `bufsiz` module parameter.
    #[serde(default = "default_max_transfer")]
    pub max_transfer: usize,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            speed_hz: default_speed_hz(),
            bits_per_word: default_bits_per_word(),
            delay_us: 0,
            max_transfer: default_max_transfer(),
        }
    }
}

impl SpiConfig {
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            delay_us: self.delay_us,
        }
    }
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rotation in degrees (0, 90, 180, 270)
    #[serde(default = "default_rotation")]
    pub rotation: u16,

    /// Panel subpixel order ("rgb" or "bgr")
    #[serde(default = "default_color_order")]
    pub color_order: String,

    /// Switch the backlight on after drawing
    #[serde(default = "default_backlight")]
    pub backlight: bool,

    /// Fill color in hex
    #[serde(default = "default_fill")]
    pub fill: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rotation: default_rotation(),
            color_order: default_color_order(),
            backlight: default_backlight(),
            fill: default_fill(),
        }
    }
}

// Default value functions
fn default_speed_hz() -> u32 {
    ili9341_hw::bus::DEFAULT_SPEED_HZ
}

fn default_bits_per_word() -> u8 {
    ili9341_hw::bus::DEFAULT_BITS_PER_WORD
}

/// spidev's stock `bufsiz`.
fn default_max_transfer() -> usize {
    4096
}

fn default_rotation() -> u16 {
    90
}

fn default_color_order() -> String {
    "bgr".to_string()
}

fn default_backlight() -> bool {
    true
}

fn default_fill() -> String {
    "#000000".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }
}
