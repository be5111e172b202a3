//! Control lines driven through the GPIO character device.
//!
//! The data/command line is mandatory. Reset and backlight are optional and
//! setting an absent one is a successful no-op, so the sequencer can pulse
//! reset unconditionally whatever the wiring provides.

use crate::{Error, Result};
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// What a control line does for the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineRole {
    /// Data/command select. Inactive (low) means command.
    DataCommand,
    /// Controller reset. Active-low on the wire.
    Reset,
    /// Backlight power.
    Backlight,
}

impl LineRole {
    /// Token prefix used in startup configuration.
    pub fn token(&self) -> &'static str {
        match self {
            LineRole::DataCommand => "dc",
            LineRole::Reset => "reset",
            LineRole::Backlight => "led",
        }
    }

    /// Consumer label reported to the kernel.
    pub fn consumer(&self) -> &'static str {
        match self {
            LineRole::DataCommand => "ili9341:dc",
            LineRole::Reset => "ili9341:reset",
            LineRole::Backlight => "ili9341:led",
        }
    }

    /// Logical level requested at startup. Reset starts asserted so the
    /// panel stays held until the sequencer releases it.
    pub fn initial_active(&self) -> bool {
        matches!(self, LineRole::Reset)
    }

    fn request_flags(&self) -> LineRequestFlags {
        match self {
            LineRole::Reset => LineRequestFlags::OUTPUT | LineRequestFlags::ACTIVE_LOW,
            LineRole::DataCommand | LineRole::Backlight => LineRequestFlags::OUTPUT,
        }
    }
}

impl std::fmt::Display for LineRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// A line binding parsed from a `role:chip,offset` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    pub role: LineRole,
    pub chip: PathBuf,
    pub offset: u32,
}

/// Resolves a chip token to a gpiochip device path.
fn chip_path(chip: &str) -> Option<PathBuf> {
    if chip.starts_with('/') {
        return Some(PathBuf::from(chip));
    }
    let number = chip.strip_prefix("gpiochip").unwrap_or(chip);
    number
        .parse::<u32>()
        .ok()
        .map(|n| PathBuf::from(format!("/dev/gpiochip{}", n)))
}

impl FromStr for LineSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Configuration(format!("{}: {}", reason, s));

        let (prefix, binding) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <role>:<chip>,<offset>"))?;
        let role = match prefix {
            "dc" => LineRole::DataCommand,
            "reset" => LineRole::Reset,
            "led" => LineRole::Backlight,
            _ => return Err(invalid("unknown line role")),
        };
        let (chip, offset) = binding
            .split_once(',')
            .ok_or_else(|| invalid("expected <chip>,<offset>"))?;
        let chip = chip_path(chip.trim()).ok_or_else(|| invalid("invalid gpio chip"))?;
        let offset = offset
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid("invalid line offset"))?;

        Ok(LineSpec { role, chip, offset })
    }
}

impl std::fmt::Display for LineSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{},{}", self.role, self.chip.display(), self.offset)
    }
}

/// A single-bit output line.
pub trait OutputLine {
    /// Drives the line to its logical active (`true`) or inactive state.
    fn set(&mut self, active: bool) -> Result<()>;
}

/// Output line requested from a gpiochip.
pub struct CdevLine {
    role: LineRole,
    handle: LineHandle,
}

impl CdevLine {
    /// Requests `offset` on `chip` as an output at its role's initial level.
    pub fn acquire(role: LineRole, chip: &Path, offset: u32) -> Result<Self> {
        let unavailable = |e: gpio_cdev::Error| Error::LineUnavailable {
            role,
            chip: chip.to_path_buf(),
            offset,
            source: std::io::Error::other(e),
        };

        let mut gpiochip = Chip::new(chip).map_err(unavailable)?;
        let line = gpiochip.get_line(offset).map_err(unavailable)?;
        let handle = line
            .request(
                role.request_flags(),
                role.initial_active() as u8,
                role.consumer(),
            )
            .map_err(unavailable)?;

        debug!("Acquired {} line {} offset {}", role, chip.display(), offset);
        Ok(Self { role, handle })
    }

    /// Requests the line described by `spec`.
    pub fn from_spec(spec: &LineSpec) -> Result<Self> {
        Self::acquire(spec.role, &spec.chip, spec.offset)
    }
}

impl OutputLine for CdevLine {
    fn set(&mut self, active: bool) -> Result<()> {
        self.handle
            .set_value(active as u8)
            .map_err(|e| Error::LineSet {
                role: self.role,
                source: std::io::Error::other(e),
            })
    }
}

/// The three control lines of one panel.
pub struct LineBank<L> {
    dc: L,
    reset: Option<L>,
    backlight: Option<L>,
}

impl<L: OutputLine> LineBank<L> {
    /// Creates a bank from already-acquired lines.
    pub fn new(dc: L, reset: Option<L>, backlight: Option<L>) -> Self {
        Self {
            dc,
            reset,
            backlight,
        }
    }

    /// Drives the line for `role`. Absent optional lines succeed silently.
    pub fn set(&mut self, role: LineRole, active: bool) -> Result<()> {
        let line = match role {
            LineRole::DataCommand => Some(&mut self.dc),
            LineRole::Reset => self.reset.as_mut(),
            LineRole::Backlight => self.backlight.as_mut(),
        };
        match line {
            Some(line) => line.set(active),
            None => Ok(()),
        }
    }

    /// Returns true if a line is bound for `role`.
    pub fn has(&self, role: LineRole) -> bool {
        match role {
            LineRole::DataCommand => true,
            LineRole::Reset => self.reset.is_some(),
            LineRole::Backlight => self.backlight.is_some(),
        }
    }

    /// Releases every line. Dropping the handles returns them to the kernel.
    pub fn release(self) {
        let optional = self.reset.is_some() as usize + self.backlight.is_some() as usize;
        drop(self);
        debug!("Released {} control line(s)", 1 + optional);
    }
}

impl LineBank<CdevLine> {
    /// Acquires the mandatory data/command line and any optional lines.
    pub fn acquire(
        dc: &LineSpec,
        reset: Option<&LineSpec>,
        backlight: Option<&LineSpec>,
    ) -> Result<Self> {
        let dc = CdevLine::from_spec(dc)?;
        let reset = reset.map(CdevLine::from_spec).transpose()?;
        let backlight = backlight.map(CdevLine::from_spec).transpose()?;

        info!(
            "Control lines acquired (reset: {}, backlight: {})",
            if reset.is_some() { "yes" } else { "no" },
            if backlight.is_some() { "yes" } else { "no" }
        );

        Ok(Self::new(dc, reset, backlight))
    }
}
