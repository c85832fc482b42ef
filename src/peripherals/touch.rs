//! Touch controller
//!
//! CST816S on the shared I2C bus. Gestures are reported by the controller
//! itself; only single clicks count as taps.

use cst816s::{TouchGesture, CST816S};
use embassy_embedded_hal::shared_bus::blocking::i2c::I2cDevice;
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_10, P0_28},
    twim::{self, Twim},
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Delay;
use weatherface_core::TapType;

type Touchpad<TWI> = CST816S<
    I2cDevice<'static, NoopRawMutex, Twim<'static, TWI>>,
    Input<'static, P0_28>,
    Output<'static, P0_10>,
>;

pub struct TouchController<TWI>
where
    TWI: twim::Instance,
{
    touchpad: Touchpad<TWI>,
}

impl<TWI> TouchController<TWI>
where
    TWI: twim::Instance,
{
    /// Reset the controller and start reporting events
    pub fn init(
        twi: I2cDevice<'static, NoopRawMutex, Twim<'static, TWI>>,
        interrupt: Input<'static, P0_28>,
        reset: Output<'static, P0_10>,
    ) -> Result<Self, Error> {
        let mut touchpad = CST816S::new(twi, interrupt, reset);
        touchpad.setup(&mut Delay).map_err(|_| Error::Setup)?;
        Ok(Self { touchpad })
    }

    /// Next pending event, if the interrupt line reports one
    pub fn try_tap(&mut self) -> Option<TapType> {
        self.touchpad
            .read_one_touch_event(true)
            .map(|event| tap_type(event.gesture))
    }
}

fn tap_type(gesture: TouchGesture) -> TapType {
    match gesture {
        TouchGesture::SingleClick => TapType::Tap,
        // Finger down without a recognised gesture yet
        TouchGesture::None => TapType::Touch,
        _ => TapType::TouchCancel,
    }
}

#[derive(Debug, defmt::Format)]
pub enum Error {
    Setup,
}
