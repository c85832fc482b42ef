//! Battery status
//!
//! The battery voltage is divided by two and fed to AIN7 (P0.31); the
//! charge indication pin P0.12 is pulled low while charging. See
//! <https://wiki.pine64.org/wiki/PineTime>.

use embassy_nrf::{gpio::Input, peripherals::P0_12, saadc::Saadc};

/// One battery reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct BatteryInfo {
    /// Charge in percent (0-100)
    pub percent: u8,
    pub charging: bool,
}

pub struct Battery {
    /// ADC with the single battery voltage channel
    adc: Saadc<'static, 1>,
    /// High = battery, low = charging
    charge_indication: Input<'static, P0_12>,
}

impl Battery {
    pub fn init(adc: Saadc<'static, 1>, charge_indication: Input<'static, P0_12>) -> Self {
        Self {
            adc,
            charge_indication,
        }
    }

    /// Sample voltage and charge state
    pub async fn read(&mut self) -> BatteryInfo {
        let millivolts = self.millivolts().await;
        BatteryInfo {
            percent: percent_from_millivolts(millivolts),
            charging: self.charge_indication.is_low(),
        }
    }

    /// Battery voltage in millivolts
    async fn millivolts(&mut self) -> u16 {
        let mut buf = [0; 1];
        self.adc.sample(&mut buf).await;
        // 12 bit against a 3.3 V reference, halved by the divider:
        // mV = raw * 2 * 3300 / 4096 = raw * 2000 / 1241
        let raw = buf[0].max(0) as u32;
        (raw * 2000 / 1241).min(u16::MAX as u32) as u16
    }
}

/// Piecewise linear discharge curve of the PineTime LiPo cell
pub fn percent_from_millivolts(millivolts: u16) -> u8 {
    let percent = match millivolts {
        0..=3449 => 0,
        3450..=3699 => (millivolts - 3450) / 5,
        3700..=4199 => 50 + (millivolts - 3700) / 10,
        _ => 100,
    };
    percent as u8
}
