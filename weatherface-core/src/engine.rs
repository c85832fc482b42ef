//! Watch face engine
//!
//! `WatchFace` owns the `DisplayState` and reacts to every event source
//! through a set of small capability traits, one per source. The firmware
//! forwards hardware and BLE events into these traits and renders whenever
//! `take_redraw` says so.

use core::fmt::Write;

use chrono::{FixedOffset, NaiveDateTime};
use embedded_graphics::{draw_target::DrawTarget, pixelcolor::Rgb565};
use heapless::String;

use crate::asset::{AssetError, Icon};
use crate::config::{Config, CONFIG_PATH};
use crate::power::{PowerState, TimerMode};
use crate::record::{AssetRef, ChangeRecord};
use crate::render::{self, Layout};
use crate::state::{DisplayState, TEMPERATURE_LEN};

/// Field holding the high temperature
pub const HIGH_KEY: &str = "high";
/// Field holding the low temperature
pub const LOW_KEY: &str = "low";
/// Field holding the weather icon asset
pub const ICON_KEY: &str = "weatherImage";

/// Kinds of tap reported by the touch controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapType {
    /// Finger went down
    Touch,
    /// Gesture turned into something other than a tap
    TouchCancel,
    /// Completed tap
    Tap,
}

/// Receiver of asset resolution requests
///
/// Implemented by whatever runs asset transfers off the render path.
pub trait AssetSink {
    fn request(&mut self, asset: AssetRef);
}

/// Single-slot sink: a newer request replaces one not yet taken
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LatestAsset(Option<AssetRef>);

impl LatestAsset {
    pub const fn new() -> Self {
        Self(None)
    }

    /// Request still waiting to be handed to the resolver
    pub fn pending(&self) -> Option<AssetRef> {
        self.0
    }

    pub fn take(&mut self) -> Option<AssetRef> {
        self.0.take()
    }
}

impl AssetSink for LatestAsset {
    fn request(&mut self, asset: AssetRef) {
        self.0 = Some(asset);
    }
}

/// Events from the companion sync channel
pub trait SyncEvents {
    /// Apply a batch of change records, returning how many were applied
    fn on_data_changed(&mut self, records: &[ChangeRecord], assets: &mut dyn AssetSink) -> usize;

    /// Result of a background asset resolution; returns whether the icon changed
    fn on_icon_resolved(&mut self, result: Result<Icon, AssetError>) -> bool;
}

/// Screen visibility and power events
pub trait VisibilityEvents {
    /// Screen turned on or off; returns the timer that should now run
    fn on_visibility_changed(&mut self, visible: bool) -> TimerMode;

    /// Entered or left ambient mode; returns the timer that should now run
    fn on_ambient_mode_changed(&mut self, ambient: bool) -> TimerMode;

    /// Panel capabilities changed
    fn on_properties_changed(&mut self, low_bit_ambient: bool);
}

/// Touch input
pub trait TapEvents {
    fn on_tap(&mut self, tap: TapType);
}

/// Time, time zone and battery updates
pub trait ClockEvents {
    /// Periodic timer fired
    fn on_time_tick(&mut self, now: NaiveDateTime);

    fn on_time_zone_changed(&mut self, zone: FixedOffset);

    fn on_battery_changed(&mut self, percent: u8, charging: bool);
}

/// The watch face engine
pub struct WatchFace {
    config: Config,
    layout: Layout,
    state: DisplayState,
    visible: bool,
    ambient: bool,
    tap_count: u32,
    redraw: bool,
}

impl WatchFace {
    /// Create a hidden, interactive face with default state
    pub fn new(config: Config) -> Self {
        Self {
            layout: Layout::for_shape(config.shape),
            state: DisplayState::new(&config),
            config,
            visible: false,
            ambient: false,
            tap_count: 0,
            redraw: false,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn power(&self) -> PowerState {
        PowerState::from_flags(self.visible, self.ambient)
    }

    /// Timer that should currently be running
    pub fn timer(&self) -> TimerMode {
        self.power().timer()
    }

    /// Redraw period for the current timer, `None` when stopped
    pub fn timer_period_ms(&self) -> Option<u64> {
        match self.timer() {
            TimerMode::Stopped => None,
            TimerMode::Interactive => Some(self.config.interactive_update_ms),
            TimerMode::MinuteTick => Some(self.config.ambient_update_ms),
        }
    }

    pub fn tap_count(&self) -> u32 {
        self.tap_count
    }

    /// Update the clock without requesting a redraw
    pub fn set_time(&mut self, now: NaiveDateTime) {
        self.state.time = now;
    }

    /// Show a free-text message on its own line; empty text clears it
    pub fn set_message(&mut self, text: &str) {
        self.state.message = if text.is_empty() {
            None
        } else {
            let mut line = String::new();
            // Keep whatever fits, cut on a char boundary
            for c in text.chars() {
                if line.push(c).is_err() {
                    break;
                }
            }
            Some(line)
        };
        self.redraw = true;
    }

    /// Consume a pending redraw request
    ///
    /// Requests made while hidden stay pending until the face is visible.
    pub fn take_redraw(&mut self) -> bool {
        if !self.visible || !self.redraw {
            return false;
        }
        self.redraw = false;
        true
    }

    /// Request a redraw on the next `take_redraw`
    pub fn invalidate(&mut self) {
        self.redraw = true;
    }

    /// Draw the current state
    pub fn render<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        render::draw(&self.state, &self.layout, &self.config.palette, target)
    }

    /// Apply one change record, returning whether it was applied
    fn apply_record(&mut self, record: &ChangeRecord, assets: &mut dyn AssetSink) -> bool {
        if record.path() != CONFIG_PATH {
            return false;
        }

        // High and low are replaced together or not at all
        let (Some(high), Some(low)) = (temperature(record, HIGH_KEY), temperature(record, LOW_KEY))
        else {
            return false;
        };
        self.state.high = high;
        self.state.low = low;

        // A missing or null asset keeps the current icon
        if let Some(asset) = record.get_asset(ICON_KEY) {
            assets.request(asset);
        }

        self.redraw = true;
        true
    }
}

/// Read a numeric field and render its truncated integer value
fn temperature(record: &ChangeRecord, key: &str) -> Option<String<TEMPERATURE_LEN>> {
    let value = record.get_number(key)?;
    if !value.is_finite() || value <= i32::MIN as f64 - 1.0 || value >= i32::MAX as f64 + 1.0 {
        return None;
    }

    let mut out = String::new();
    // `as` truncates toward zero
    write!(out, "{}", value as i32).ok()?;
    Some(out)
}

impl SyncEvents for WatchFace {
    fn on_data_changed(&mut self, records: &[ChangeRecord], assets: &mut dyn AssetSink) -> usize {
        let mut applied = 0;
        for record in records {
            if self.apply_record(record, assets) {
                applied += 1;
            }
        }
        applied
    }

    fn on_icon_resolved(&mut self, result: Result<Icon, AssetError>) -> bool {
        match result {
            Ok(icon) => {
                self.state.weather_icon = Some(icon);
                self.redraw = true;
                true
            }
            Err(_) => false,
        }
    }
}

impl VisibilityEvents for WatchFace {
    fn on_visibility_changed(&mut self, visible: bool) -> TimerMode {
        if self.visible != visible {
            self.visible = visible;
            if visible {
                // Time zone or data may have changed while hidden
                self.redraw = true;
            }
        }
        self.timer()
    }

    fn on_ambient_mode_changed(&mut self, ambient: bool) -> TimerMode {
        if self.ambient != ambient {
            self.ambient = ambient;
            self.state.ambient = ambient;
            self.redraw = true;
        }
        self.timer()
    }

    fn on_properties_changed(&mut self, low_bit_ambient: bool) {
        self.state.low_bit_ambient = low_bit_ambient;
    }
}

impl TapEvents for WatchFace {
    fn on_tap(&mut self, tap: TapType) {
        if tap == TapType::Tap {
            self.tap_count = self.tap_count.wrapping_add(1);
            self.state.background = if self.tap_count % 2 == 0 {
                self.config.palette.background
            } else {
                self.config.palette.background_alt
            };
        }
        self.redraw = true;
    }
}

impl ClockEvents for WatchFace {
    fn on_time_tick(&mut self, now: NaiveDateTime) {
        self.state.time = now;
        self.redraw = true;
    }

    fn on_time_zone_changed(&mut self, zone: FixedOffset) {
        if self.state.time_zone != zone {
            self.state.time_zone = zone;
            self.redraw = true;
        }
    }

    fn on_battery_changed(&mut self, percent: u8, charging: bool) {
        self.state.battery_percent = percent.min(100);
        self.state.charging = charging;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    #[derive(Default)]
    struct Requests(std::vec::Vec<AssetRef>);

    impl AssetSink for Requests {
        fn request(&mut self, asset: AssetRef) {
            self.0.push(asset);
        }
    }

    fn weather(path: &str, high: f64, low: f64) -> ChangeRecord {
        ChangeRecord::new(path)
            .unwrap()
            .with(HIGH_KEY, FieldValue::Double(high))
            .unwrap()
            .with(LOW_KEY, FieldValue::Double(low))
            .unwrap()
    }

    fn visible_face() -> WatchFace {
        let mut face = WatchFace::new(Config::default());
        face.on_visibility_changed(true);
        face.take_redraw();
        face
    }

    fn icon() -> Icon {
        Icon::decode(&[1, 0, 1, 0, 0xf8, 0x00]).unwrap()
    }

    #[test]
    fn test_config_record_updates_temperatures() {
        let mut face = visible_face();
        let mut assets = Requests::default();

        let applied = face.on_data_changed(&[weather("/CONFIG", 25.0, 12.0)], &mut assets);
        assert_eq!(applied, 1);
        assert_eq!(face.state().high, "25");
        assert_eq!(face.state().low, "12");
        assert!(face.take_redraw());
        assert!(assets.0.is_empty());
    }

    #[test]
    fn test_values_are_truncated() {
        let mut face = visible_face();
        face.on_data_changed(&[weather("/CONFIG", 25.9, -3.7)], &mut Requests::default());
        assert_eq!(face.state().high, "25");
        assert_eq!(face.state().low, "-3");

        face.on_data_changed(&[weather("/CONFIG", -0.4, 0.99)], &mut Requests::default());
        assert_eq!(face.state().high, "0");
        assert_eq!(face.state().low, "0");
    }

    #[test]
    fn test_long_values_accepted() {
        let mut face = visible_face();
        let record = ChangeRecord::new("/CONFIG")
            .unwrap()
            .with(HIGH_KEY, FieldValue::Long(31))
            .unwrap()
            .with(LOW_KEY, FieldValue::Long(-2))
            .unwrap();
        face.on_data_changed(&[record], &mut Requests::default());
        assert_eq!(face.state().high, "31");
        assert_eq!(face.state().low, "-2");
    }

    #[test]
    fn test_other_path_ignored() {
        let mut face = visible_face();
        let before = face.state().clone();
        let record = ChangeRecord::new("/OTHER")
            .unwrap()
            .with(HIGH_KEY, FieldValue::Double(25.0))
            .unwrap();

        assert_eq!(face.on_data_changed(&[record], &mut Requests::default()), 0);
        assert_eq!(face.state(), &before);
        assert!(!face.take_redraw());
    }

    #[test]
    fn test_partial_record_skipped() {
        let mut face = visible_face();
        let before = face.state().clone();
        let mut assets = Requests::default();

        let only_high = ChangeRecord::new("/CONFIG")
            .unwrap()
            .with(HIGH_KEY, FieldValue::Double(25.0))
            .unwrap()
            .with(ICON_KEY, FieldValue::Asset(AssetRef(4)))
            .unwrap();
        let bad_low = weather("/CONFIG", 20.0, f64::NAN);
        let huge = weather("/CONFIG", 1e12, 1.0);

        assert_eq!(face.on_data_changed(&[only_high, bad_low, huge], &mut assets), 0);
        assert_eq!(face.state(), &before);
        assert!(assets.0.is_empty());
    }

    #[test]
    fn test_asset_requested() {
        let mut face = visible_face();
        let mut assets = Requests::default();
        let record = weather("/CONFIG", 1.0, 0.0)
            .with(ICON_KEY, FieldValue::Asset(AssetRef(42)))
            .unwrap();
        face.on_data_changed(&[record], &mut assets);
        assert_eq!(assets.0, [AssetRef(42)]);
    }

    #[test]
    fn test_latest_asset_replaces_pending() {
        let mut face = visible_face();
        let mut pending = LatestAsset::new();
        for id in 1..=6u32 {
            let record = weather("/CONFIG", id as f64, 0.0)
                .with(ICON_KEY, FieldValue::Asset(AssetRef(id)))
                .unwrap();
            face.on_data_changed(&[record], &mut pending);
        }

        assert_eq!(face.state().high, "6");
        assert_eq!(pending.take(), Some(AssetRef(6)));
        assert_eq!(pending.take(), None);
    }

    #[test]
    fn test_null_asset_keeps_icon() {
        let mut face = visible_face();
        face.on_icon_resolved(Ok(icon()));
        let mut assets = Requests::default();
        let record = weather("/CONFIG", 1.0, 0.0)
            .with(ICON_KEY, FieldValue::Null)
            .unwrap();
        face.on_data_changed(&[record], &mut assets);
        assert!(assets.0.is_empty());
        assert_eq!(face.state().weather_icon, Some(icon()));
    }

    #[test]
    fn test_idempotent() {
        let record = weather("/CONFIG", 18.5, 7.2);
        let mut once = visible_face();
        once.on_data_changed(&[record.clone()], &mut Requests::default());
        let mut twice = visible_face();
        twice.on_data_changed(&[record.clone(), record], &mut Requests::default());
        assert_eq!(once.state(), twice.state());
    }

    #[test]
    fn test_last_record_wins() {
        let mut face = visible_face();
        face.on_data_changed(
            &[weather("/CONFIG", 10.0, 1.0), weather("/CONFIG", 20.0, 2.0)],
            &mut Requests::default(),
        );
        assert_eq!(face.state().high, "20");
        assert_eq!(face.state().low, "2");
    }

    #[test]
    fn test_failed_icon_retains_previous() {
        let mut face = visible_face();
        assert!(face.on_icon_resolved(Ok(icon())));
        face.take_redraw();

        for error in [
            AssetError::Timeout,
            AssetError::ConnectionFailed,
            AssetError::UnknownAsset,
            AssetError::EmptyStream,
        ] {
            assert!(!face.on_icon_resolved(Err(error)));
            assert_eq!(face.state().weather_icon, Some(icon()));
        }
        assert!(!face.take_redraw());
    }

    #[test]
    fn test_ambient_toggle_switches_timer() {
        let mut face = WatchFace::new(Config::default());
        assert_eq!(face.timer(), TimerMode::Stopped);

        assert_eq!(face.on_visibility_changed(true), TimerMode::Interactive);
        assert_eq!(face.power(), PowerState::VisibleInteractive);
        assert_eq!(face.timer_period_ms(), Some(1_000));

        assert_eq!(face.on_ambient_mode_changed(true), TimerMode::MinuteTick);
        assert_eq!(face.power(), PowerState::VisibleAmbient);
        assert!(face.state().ambient);

        assert_eq!(face.on_ambient_mode_changed(false), TimerMode::Interactive);
        assert_eq!(face.on_visibility_changed(false), TimerMode::Stopped);
        assert_eq!(face.timer_period_ms(), None);

        // Ambient while hidden still runs nothing
        assert_eq!(face.on_ambient_mode_changed(true), TimerMode::Stopped);
        assert_eq!(face.on_visibility_changed(true), TimerMode::MinuteTick);
    }

    #[test]
    fn test_redraw_deferred_while_hidden() {
        let mut face = WatchFace::new(Config::default());
        face.on_time_tick(NaiveDateTime::UNIX_EPOCH);
        assert!(!face.take_redraw());
        face.on_visibility_changed(true);
        assert!(face.take_redraw());
        assert!(!face.take_redraw());
    }

    #[test]
    fn test_tap_alternates_background() {
        let mut face = visible_face();
        let palette = face.config().palette;
        assert_eq!(face.state().background, palette.background);

        face.on_tap(TapType::Tap);
        assert_eq!(face.tap_count(), 1);
        assert_eq!(face.state().background, palette.background_alt);

        face.on_tap(TapType::Tap);
        assert_eq!(face.tap_count(), 2);
        assert_eq!(face.state().background, palette.background);
    }

    #[test]
    fn test_touch_and_cancel_do_not_count() {
        let mut face = visible_face();
        face.on_tap(TapType::Touch);
        face.on_tap(TapType::TouchCancel);
        assert_eq!(face.tap_count(), 0);
        assert_eq!(face.state().background, face.config().palette.background);
        assert!(face.take_redraw());
    }

    #[test]
    fn test_time_zone_change_redraws_once() {
        let mut face = visible_face();
        let zone = FixedOffset::east_opt(3600).unwrap();
        face.on_time_zone_changed(zone);
        assert!(face.take_redraw());
        face.on_time_zone_changed(zone);
        assert!(!face.take_redraw());
    }

    #[test]
    fn test_battery_clamped() {
        let mut face = visible_face();
        face.on_battery_changed(140, true);
        assert_eq!(face.state().battery_percent, 100);
        assert!(face.state().charging);
    }

    #[test]
    fn test_message_is_separate_from_temperatures() {
        let mut face = visible_face();
        face.on_data_changed(&[weather("/CONFIG", 21.0, 9.0)], &mut Requests::default());
        face.set_message("Hello from the phone, this text is too long");
        assert_eq!(face.state().high, "21");
        let message = face.state().message.as_ref().unwrap();
        assert_eq!(message.len(), 32);
        assert!(message.starts_with("Hello from the phone"));

        face.set_message("");
        assert!(face.state().message.is_none());
    }
}
