//! Backlight control
//!
//! There are three active-low backlight pins, each connected to a FET that
//! toggles backlight power through a resistor (2.2 kΩ, 100 Ω and 30 Ω).
//! Combining them gives 7 brightness levels plus off.

use embassy_nrf::{
    gpio::Output,
    peripherals::{P0_14, P0_22, P0_23},
};
use weatherface_core::PowerState;

/// Highest brightness level
pub const MAX_LEVEL: u8 = 7;

pub struct Backlight {
    low: Output<'static, P0_14>,
    mid: Output<'static, P0_22>,
    high: Output<'static, P0_23>,
    /// Current level (0 = off)
    level: u8,
}

impl Backlight {
    /// Take the backlight pins, starting switched off
    pub fn init(
        low: Output<'static, P0_14>,
        mid: Output<'static, P0_22>,
        high: Output<'static, P0_23>,
    ) -> Self {
        let mut backlight = Self {
            low,
            mid,
            high,
            level: 0,
        };
        backlight.off();
        backlight
    }

    /// Set the brightness level between 0 (off) and 7 (max brightness)
    pub fn set(&mut self, level: u8) -> Result<(), Error> {
        if level > MAX_LEVEL {
            return Err(Error::OutOfBounds);
        }
        if level == self.level {
            return Ok(());
        }
        defmt::debug!("Backlight level {}", level);

        // Active low
        self.low.set_level((level & 0x01 == 0).into());
        self.mid.set_level((level & 0x02 == 0).into());
        self.high.set_level((level & 0x04 == 0).into());
        self.level = level;
        Ok(())
    }

    pub fn off(&mut self) {
        self.low.set_high();
        self.mid.set_high();
        self.high.set_high();
        self.level = 0;
    }

    /// Follow the watch face power state
    pub fn apply(&mut self, power: PowerState, interactive: u8, ambient: u8) -> Result<(), Error> {
        match power {
            PowerState::Hidden => {
                self.off();
                Ok(())
            }
            PowerState::VisibleInteractive => self.set(interactive),
            PowerState::VisibleAmbient => self.set(ambient),
        }
    }
}

#[derive(Debug, defmt::Format)]
pub enum Error {
    OutOfBounds,
}
