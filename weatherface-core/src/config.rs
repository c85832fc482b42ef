//! Watch face configuration
//!
//! Compile-time defaults for timing, layout and colours. Nothing here is
//! persisted; the firmware builds a `Config` on boot and hands it to the
//! engine and tasks.

use embedded_graphics::pixelcolor::Rgb565;

/// Path of the change record carrying weather data
pub const CONFIG_PATH: &str = "/CONFIG";

/// Physical shape of the panel, selects layout offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Shape {
    Rectangular,
    Round,
}

/// Colours used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Background after an even number of taps
    pub background: Rgb565,
    /// Background after an odd number of taps
    pub background_alt: Rgb565,
    /// Time digits
    pub digital_text: Rgb565,
    /// Date, battery and temperatures
    pub secondary_text: Rgb565,
    /// Ambient text on low-bit panels
    pub ambient_text: Rgb565,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            // Sunshine blue and its darker tap variant
            background: Rgb565::new(0x05, 0x2a, 0x1b),
            background_alt: Rgb565::new(0x02, 0x14, 0x0e),
            digital_text: Rgb565::new(0x1f, 0x3f, 0x1f),
            secondary_text: Rgb565::new(0x16, 0x31, 0x1c),
            ambient_text: Rgb565::new(0x1f, 0x3f, 0x1f),
        }
    }
}

/// Watch face configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Redraw period while visible and interactive
    pub interactive_update_ms: u64,
    /// Redraw period while ambient (minute tick)
    pub ambient_update_ms: u64,
    /// Upper bound on waiting for a BLE link before requesting an asset
    pub asset_connect_timeout_ms: u64,
    /// Upper bound on receiving all chunks of a requested asset
    pub asset_transfer_timeout_ms: u64,
    /// Idle time after which the face drops to ambient mode
    pub ambient_after_secs: u64,
    /// Battery polling period
    pub battery_poll_secs: u64,
    /// Backlight level while interactive (0-7)
    pub brightness_interactive: u8,
    /// Backlight level while ambient (0-7)
    pub brightness_ambient: u8,
    /// Whether the panel has reduced colour depth in ambient mode
    pub low_bit_ambient: bool,
    pub shape: Shape,
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interactive_update_ms: 1_000,
            ambient_update_ms: 60_000,
            asset_connect_timeout_ms: 100,
            asset_transfer_timeout_ms: 2_000,
            ambient_after_secs: 10,
            battery_poll_secs: 60,
            brightness_interactive: 3,
            brightness_ambient: 1,
            low_bit_ambient: true,
            shape: Shape::Rectangular,
            palette: Palette::default(),
        }
    }
}
