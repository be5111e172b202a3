//! RGB565 framebuffer for producers of flush requests.

use crate::panel::Area;
use crate::{Error, Result, BYTES_PER_PIXEL};

/// RGB565 framebuffer sized to the panel's logical resolution.
#[derive(Clone)]
pub struct Framebuffer {
    /// Pixel data in RGB565 format, row-major.
    data: Vec<u16>,
    width: u16,
    height: u16,
}

impl Framebuffer {
    /// Creates a framebuffer initialized to black.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns the area covering the whole buffer, or `None` when the
    /// buffer is empty.
    pub fn area(&self) -> Option<Area> {
        Area::from_origin(0, 0, self.width, self.height)
    }

    /// Clears the framebuffer to a solid color.
    pub fn clear(&mut self, color: u16) {
        self.data.fill(color);
    }

    /// Copies pixel data from an RGB8 slice, converting to RGB565.
    pub fn copy_from_rgb8(&mut self, data: &[u8]) -> Result<()> {
        let expected_len = self.data.len() * 3;
        if data.len() != expected_len {
            return Err(Error::FramebufferSize {
                expected: expected_len,
                actual: data.len(),
            });
        }

        for (i, chunk) in data.chunks_exact(3).enumerate() {
            self.data[i] = rgb888_to_rgb565(chunk[0], chunk[1], chunk[2]);
        }
        Ok(())
    }

    /// Serializes `area` as the big-endian byte stream the controller
    /// expects after a memory write. The area must lie inside the buffer.
    pub fn region_bytes(&self, area: Area) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(area.pixel_count() * BYTES_PER_PIXEL);
        for y in area.y1..=area.y2 {
            let row = y as usize * self.width as usize;
            let start = row + area.x1 as usize;
            let end = row + area.x2 as usize;
            for &pixel in &self.data[start..=end] {
                bytes.extend_from_slice(&pixel.to_be_bytes());
            }
        }
        bytes
    }

    /// Splits the buffer into full-width bands of at most `max_bytes`
    /// payload each (at least one row per band). An empty buffer has no
    /// bands.
    pub fn bands(&self, max_bytes: usize) -> Vec<Area> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let rows = (max_bytes / row_bytes.max(1)).clamp(1, self.height.max(1) as usize) as u16;

        let mut bands = Vec::new();
        let mut y = 0;
        while y < self.height {
            let height = rows.min(self.height - y);
            match Area::from_origin(0, y, self.width, height) {
                Some(area) => bands.push(area),
                None => break,
            }
            y += height;
        }
        bands
    }
}

/// Converts RGB888 to RGB565.
#[inline]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Parses a hex color string to RGB565.
pub fn parse_hex_color(hex: &str) -> Option<u16> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(rgb888_to_rgb565(r, g, b))
}
