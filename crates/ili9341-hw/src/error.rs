//! Error types for the ILI9341 hardware library.

use std::path::PathBuf;
use thiserror::Error;

use crate::lines::LineRole;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, used by callers to pick a recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing startup configuration; raised before any hardware I/O.
    Configuration,
    /// The bus or a control line could not be opened.
    DeviceUnavailable,
    /// A transfer or line update failed after a successful open.
    IoFailure,
    /// The caller passed a request the panel cannot honour.
    InvalidRequest,
}

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// Startup configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested rotation is not one of 0, 90, 180, 270.
    #[error("Invalid rotation: {0} degrees (expected 0, 90, 180 or 270)")]
    InvalidRotation(u16),

    /// SPI bus device could not be opened or configured.
    #[error("SPI device {} unavailable: {source}", path.display())]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// GPIO line could not be requested.
    #[error("{role} line unavailable ({}, offset {offset}): {source}", chip.display())]
    LineUnavailable {
        role: LineRole,
        chip: PathBuf,
        offset: u32,
        #[source]
        source: std::io::Error,
    },

    /// SPI transfer failed.
    #[error("SPI transfer failed: {0}")]
    Transfer(#[source] std::io::Error),

    /// Setting a GPIO line failed.
    #[error("Setting {role} line failed: {source}")]
    LineSet {
        role: LineRole,
        #[source]
        source: std::io::Error,
    },

    /// Pixel payload size does not match the target rectangle.
    #[error("Pixel buffer size mismatch: expected {expected}, got {actual}")]
    PixelBufferSize { expected: usize, actual: usize },

    /// Target rectangle is inverted or falls outside the panel.
    #[error("Invalid window ({x1},{y1})-({x2},{y2}) for {width}x{height} panel")]
    InvalidWindow {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        width: u16,
        height: u16,
    },

    /// Framebuffer size mismatch.
    #[error("Framebuffer size mismatch: expected {expected}, got {actual}")]
    FramebufferSize { expected: usize, actual: usize },
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::InvalidRotation(_) => ErrorKind::Configuration,
            Error::DeviceUnavailable { .. } | Error::LineUnavailable { .. } => {
                ErrorKind::DeviceUnavailable
            }
            Error::Transfer(_) | Error::LineSet { .. } => ErrorKind::IoFailure,
            Error::PixelBufferSize { .. }
            | Error::InvalidWindow { .. }
            | Error::FramebufferSize { .. } => ErrorKind::InvalidRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(Error::InvalidRotation(45).kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::Transfer(std::io::Error::other("boom")).kind(),
            ErrorKind::IoFailure
        );
        assert_eq!(
            Error::LineUnavailable {
                role: LineRole::Reset,
                chip: PathBuf::from("/dev/gpiochip0"),
                offset: 4,
                source: std::io::Error::other("busy"),
            }
            .kind(),
            ErrorKind::DeviceUnavailable
        );
        assert_eq!(
            Error::PixelBufferSize {
                expected: 4,
                actual: 2
            }
            .kind(),
            ErrorKind::InvalidRequest
        );
    }
}
