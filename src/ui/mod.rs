//! Watch face controller
//!
//! Sits between the firmware tasks and the `WatchFace` engine: turns
//! hardware and BLE events into engine calls, keeps the wall clock, and
//! decides when the face goes to ambient mode or off.

use chrono::{FixedOffset, NaiveDateTime};
use embassy_time::{Duration, Instant};
use heapless::String;
use weatherface_core::{
    power::next_tick_delay_ms, state::MESSAGE_LEN, AssetError, ChangeRecord, ClockEvents, Config,
    Icon, LatestAsset, PowerState, SyncEvents, TapEvents, TapType, VisibilityEvents,
    WatchFace,
};

use crate::channels::ASSET_REQUESTS;
use crate::peripherals::battery::BatteryInfo;
use crate::system::time::{TimeManager, TimeReference};

/// Everything the watch face task reacts to, apart from timers
pub enum UiEvent {
    /// Change record from the companion
    Sync(ChangeRecord),
    Tap(TapType),
    /// Side button pressed
    Button,
    Battery(BatteryInfo),
    /// Current Time Service write, UTC
    Time(NaiveDateTime),
    TimeZone(FixedOffset),
    Message(String<MESSAGE_LEN>),
}

pub struct Controller {
    face: WatchFace,
    clock: TimeManager,
    /// Last tap or button press, for the ambient timeout
    last_input: Instant,
}

impl Controller {
    /// Start visible and interactive
    pub fn new(config: Config, epoch: i64) -> Self {
        let clock = TimeManager::init(epoch);
        let mut face = WatchFace::new(config);
        face.on_time_tick(clock.get_time());
        face.on_visibility_changed(true);
        Self {
            face,
            clock,
            last_input: Instant::now(),
        }
    }

    pub fn face(&self) -> &WatchFace {
        &self.face
    }

    /// Time until the running timer fires, aligned to the wall clock
    pub fn next_tick(&self) -> Option<Duration> {
        let period = self.face.timer_period_ms()?;
        Some(Duration::from_millis(next_tick_delay_ms(
            self.clock.now_millis(),
            period,
        )))
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Sync(record) => {
                let mut pending = LatestAsset::new();
                let applied = self
                    .face
                    .on_data_changed(core::slice::from_ref(&record), &mut pending);
                if applied == 0 {
                    defmt::debug!("Ignoring record for {}", record.path());
                }
                if let Some(asset) = pending.take() {
                    ASSET_REQUESTS.signal(asset);
                }
            }
            UiEvent::Tap(tap) => self.on_tap(tap),
            UiEvent::Button => self.on_button(),
            UiEvent::Battery(info) => self.face.on_battery_changed(info.percent, info.charging),
            UiEvent::Time(time) => {
                defmt::info!("Clock set to {}", defmt::Display2Format(&time));
                self.clock.set_time(TimeReference::from_datetime(time));
                self.face.on_time_tick(time);
            }
            UiEvent::TimeZone(zone) => self.face.on_time_zone_changed(zone),
            UiEvent::Message(text) => self.face.set_message(&text),
        }
    }

    pub fn on_icon(&mut self, result: Result<Icon, AssetError>) {
        if self.face.on_icon_resolved(result) {
            defmt::debug!("Weather icon updated");
        }
    }

    /// Periodic timer fired
    pub fn on_tick(&mut self) {
        self.face.on_time_tick(self.clock.get_time());

        let idle = Duration::from_secs(self.face.config().ambient_after_secs);
        if self.face.power() == PowerState::VisibleInteractive && self.last_input.elapsed() >= idle
        {
            defmt::info!("Idle, entering ambient mode");
            self.face.on_ambient_mode_changed(true);
        }
    }

    /// Consume a pending redraw, bringing the clock up to date first
    pub fn take_redraw(&mut self) -> bool {
        if !self.face.take_redraw() {
            return false;
        }
        self.face.set_time(self.clock.get_time());
        true
    }

    fn on_tap(&mut self, tap: TapType) {
        match self.face.power() {
            PowerState::Hidden => {}
            // The first tap only wakes the face
            PowerState::VisibleAmbient => {
                if tap == TapType::Tap {
                    self.wake();
                }
            }
            PowerState::VisibleInteractive => {
                self.last_input = Instant::now();
                self.face.on_tap(tap);
            }
        }
    }

    fn on_button(&mut self) {
        if self.face.power() == PowerState::VisibleInteractive {
            defmt::info!("Screen off");
            self.face.on_visibility_changed(false);
        } else {
            self.wake();
        }
    }

    fn wake(&mut self) {
        defmt::info!("Screen on");
        self.last_input = Instant::now();
        self.face.on_visibility_changed(true);
        self.face.on_ambient_mode_changed(false);
    }
}
