//! Display state
//!
//! The one struct the renderer reads. It is owned by the `WatchFace`
//! engine and holds only the most recently observed value of each field.

use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use embedded_graphics::pixelcolor::Rgb565;
use heapless::String;

use crate::asset::Icon;
use crate::clock;
use crate::config::Config;

/// Capacity of a temperature display string ("-2147483648")
pub const TEMPERATURE_LEN: usize = 11;
/// Capacity of the broadcast message line
pub const MESSAGE_LEN: usize = 32;

/// Shown until the first weather record arrives
pub const NO_TEMPERATURE: &str = "--";

/// State for the watch face
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    /// Current time, UTC
    pub time: NaiveDateTime,
    /// Offset applied to `time` for display
    pub time_zone: FixedOffset,
    /// High temperature as an integer string
    pub high: String<TEMPERATURE_LEN>,
    /// Low temperature as an integer string
    pub low: String<TEMPERATURE_LEN>,
    /// Battery charge in percent (0-100)
    pub battery_percent: u8,
    pub charging: bool,
    pub ambient: bool,
    /// Panel drops colour depth in ambient mode
    pub low_bit_ambient: bool,
    pub weather_icon: Option<Icon>,
    /// Current background, toggled by taps
    pub background: Rgb565,
    /// Free text from the message characteristic
    pub message: Option<String<MESSAGE_LEN>>,
}

impl DisplayState {
    /// Fully initialised defaults
    pub fn new(config: &Config) -> Self {
        Self {
            time: NaiveDateTime::UNIX_EPOCH,
            time_zone: Utc.fix(),
            high: placeholder(),
            low: placeholder(),
            battery_percent: 0,
            charging: false,
            ambient: false,
            low_bit_ambient: config.low_bit_ambient,
            weather_icon: None,
            background: config.palette.background,
            message: None,
        }
    }

    /// Wall-clock time in the configured time zone
    pub fn local_time(&self) -> NaiveDateTime {
        clock::local_time(self.time, self.time_zone)
    }
}

fn placeholder() -> String<TEMPERATURE_LEN> {
    let mut s = String::new();
    // Always fits
    let _ = s.push_str(NO_TEMPERATURE);
    s
}
