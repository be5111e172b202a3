//! ILI9341 Panel Control Tool
//!
//! Brings up an ILI9341 panel wired to a spidev bus and GPIO lines, rotates
//! it and draws a solid colour or an image.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ili9341_hw::framebuffer::parse_hex_color;
use ili9341_hw::{
    Bus, ColorOrder, ErrorKind, Framebuffer, Ili9341, Orientation, OutputLine, PanelConfig,
    Rotation,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;

/// Attempts per flush before giving up. Each retry resends the whole
/// rectangle, window included.
const FLUSH_ATTEMPTS: u32 = 2;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliColorOrder {
    Rgb,
    Bgr,
}

impl From<CliColorOrder> for ColorOrder {
    fn from(order: CliColorOrder) -> Self {
        match order {
            CliColorOrder::Rgb => ColorOrder::Rgb,
            CliColorOrder::Bgr => ColorOrder::Bgr,
        }
    }
}

#[derive(Parser)]
#[command(name = "ili9341ctl")]
#[command(about = "Initialize and draw on an ILI9341 panel over spidev")]
#[command(version)]
struct Cli {
    /// SPI device and control lines:
    /// /dev/spidevX.Y dc:chip,offset [reset:chip,offset] [led:chip,offset]
    #[arg(required = true, num_args = 2..)]
    wiring: Vec<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// SPI clock speed in Hz
    #[arg(long)]
    speed: Option<u32>,

    /// Rotation in degrees: 0, 90, 180, 270
    #[arg(long)]
    rotation: Option<u16>,

    /// Panel subpixel order
    #[arg(long, value_enum)]
    color_order: Option<CliColorOrder>,

    /// Fill color in hex format (e.g., #FF0000 for red)
    #[arg(long)]
    fill: Option<String>,

    /// Image file to show, scaled to the panel
    #[arg(long, conflicts_with = "fill")]
    image: Option<PathBuf>,

    /// Skip reset and the init sequence
    #[arg(long)]
    skip_init: bool,

    /// Read and print the display ID
    #[arg(long)]
    read_id: bool,

    /// Leave the backlight off
    #[arg(long)]
    no_backlight: bool,

    /// Keep the lines held after drawing until killed
    #[arg(long)]
    hold: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path).context("Failed to load configuration")?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => Config::default(),
    };

    // Everything is validated before the hardware is touched.
    let mut bus = config.spi.bus_config();
    if let Some(speed) = cli.speed {
        bus.speed_hz = speed;
    }
    let panel_config = PanelConfig::from_tokens(&cli.wiring)
        .context("Invalid wiring")?
        .with_bus_config(bus);

    let rotation = Rotation::try_from(cli.rotation.unwrap_or(config.display.rotation))?;
    let color_order = match cli.color_order {
        Some(order) => order.into(),
        None => config
            .display
            .color_order
            .parse::<ColorOrder>()
            .context("Invalid color order in configuration")?,
    };
    let orientation = Orientation::new(rotation, color_order);

    let fill = cli.fill.as_deref().unwrap_or(&config.display.fill);
    let fill = parse_hex_color(fill).with_context(|| format!("Invalid fill color: {}", fill))?;

    let mut panel = Ili9341::open(&panel_config).context("Failed to open panel")?;

    if !cli.skip_init {
        panel.init().context("Panel initialization failed")?;
    }
    panel
        .set_orientation(orientation)
        .context("Failed to set orientation")?;

    if cli.read_id {
        let [manufacturer, version, module] =
            panel.read_display_id().context("Failed to read display ID")?;
        println!(
            "Display ID: manufacturer {:02X}, version {:02X}, module {:02X}",
            manufacturer, version, module
        );
    }

    let (width, height) = panel.dimensions();
    let mut fb = Framebuffer::new(width, height);
    match &cli.image {
        Some(path) => load_image(&mut fb, path)?,
        None => fb.clear(fill),
    }
    draw(&mut panel, &fb, config.spi.max_transfer)?;

    if config.display.backlight && !cli.no_backlight {
        panel.set_backlight(true).context("Failed to switch backlight")?;
    }

    if cli.hold {
        info!("Holding panel lines, interrupt to exit");
        loop {
            std::thread::park();
        }
    }

    panel.release();
    Ok(())
}

/// Loads an image scaled to the framebuffer.
fn load_image(fb: &mut Framebuffer, path: &Path) -> Result<()> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .resize_exact(
            fb.width() as u32,
            fb.height() as u32,
            image::imageops::FilterType::Triangle,
        )
        .to_rgb8();
    fb.copy_from_rgb8(image.as_raw())?;
    info!("Loaded image {}", path.display());
    Ok(())
}

/// Flushes the framebuffer, one band per flush when `max_transfer` is set.
fn draw<B: Bus, L: OutputLine>(
    panel: &mut Ili9341<B, L>,
    fb: &Framebuffer,
    max_transfer: usize,
) -> Result<()> {
    let bands = if max_transfer == 0 {
        fb.area().into_iter().collect()
    } else {
        fb.bands(max_transfer)
    };

    for area in &bands {
        let pixels = fb.region_bytes(*area);
        let mut attempt = 1;
        loop {
            match panel.flush(*area, &pixels) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::IoFailure && attempt < FLUSH_ATTEMPTS => {
                    warn!("Flush of {} failed (attempt {}): {}", area, attempt, e);
                    attempt += 1;
                }
                Err(e) => bail!("Flush of {} failed: {}", area, e),
            }
        }
    }

    info!("Drew {}x{} in {} flush(es)", fb.width(), fb.height(), bands.len());
    Ok(())
}
