//! Startup configuration from command-line style tokens.
//!
//! Accepted tokens, in any order:
//! - a bus device path, e.g. `/dev/spidev0.0` (mandatory)
//! - `dc:<chip>,<offset>` (mandatory)
//! - `reset:<chip>,<offset>` (optional)
//! - `led:<chip>,<offset>` (optional)
//!
//! Everything is validated here, before any device is opened.

use crate::bus::BusConfig;
use crate::lines::{LineRole, LineSpec};
use crate::{Error, Result};
use std::path::PathBuf;

/// Usage string for the token form.
pub const USAGE: &str = "/dev/spidevX.Y dc:chip,offset [reset:chip,offset] [led:chip,offset]";

/// Where the panel is wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    /// spidev device path.
    pub bus_path: PathBuf,
    /// Bus parameters.
    pub bus: BusConfig,
    /// Data/command select line.
    pub dc: LineSpec,
    /// Reset line, if wired.
    pub reset: Option<LineSpec>,
    /// Backlight line, if wired.
    pub backlight: Option<LineSpec>,
}

fn is_line_token(token: &str) -> bool {
    !token.starts_with('/') && token.contains(':')
}

impl PanelConfig {
    /// Parses the bus path and line tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bus_path = None;
        let mut dc = None;
        let mut reset = None;
        let mut backlight = None;

        for token in tokens {
            let token = token.as_ref();
            if !is_line_token(token) {
                if bus_path.is_some() {
                    return Err(Error::Configuration(format!(
                        "unexpected argument: {} (usage: {})",
                        token, USAGE
                    )));
                }
                bus_path = Some(PathBuf::from(token));
                continue;
            }

            let spec: LineSpec = token.parse()?;
            let slot = match spec.role {
                LineRole::DataCommand => &mut dc,
                LineRole::Reset => &mut reset,
                LineRole::Backlight => &mut backlight,
            };
            if slot.is_some() {
                return Err(Error::Configuration(format!(
                    "{} line given more than once",
                    spec.role
                )));
            }
            *slot = Some(spec);
        }

        let bus_path = bus_path.ok_or_else(|| {
            Error::Configuration(format!("missing SPI device path (usage: {})", USAGE))
        })?;
        let dc = dc.ok_or_else(|| {
            Error::Configuration(format!("missing data/command line (usage: {})", USAGE))
        })?;

        Ok(Self {
            bus_path,
            bus: BusConfig::default(),
            dc,
            reset,
            backlight,
        })
    }

    /// Replaces the bus parameters.
    pub fn with_bus_config(mut self, bus: BusConfig) -> Self {
        self.bus = bus;
        self
    }
}
