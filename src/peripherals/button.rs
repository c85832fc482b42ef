//! Side button
//!
//! The button only drives its input pin while P0.15 is high, so every poll
//! enables it briefly. Drawing ~34 µA when left enabled, it stays low
//! between polls.

use debouncr::{debounce_2, Debouncer, Edge, Repeat2};
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_13, P0_15},
};
use embassy_time::{Duration, Timer};

/// Time between polls; two stable samples make a press
const POLL_PERIOD: Duration = Duration::from_millis(10);

pub struct Button {
    input: Input<'static, P0_13>,
    enable: Output<'static, P0_15>,
    debouncer: Debouncer<u8, Repeat2>,
}

impl Button {
    pub fn init(input: Input<'static, P0_13>, enable: Output<'static, P0_15>) -> Self {
        Self {
            input,
            enable,
            debouncer: debounce_2(false),
        }
    }

    /// Resolve on the next debounced press
    pub async fn wait_for_press(&mut self) {
        loop {
            if self.poll().await == Some(Edge::Rising) {
                return;
            }
            Timer::after(POLL_PERIOD).await;
        }
    }

    async fn poll(&mut self) -> Option<Edge> {
        self.enable.set_high();
        // Give the output time to settle
        Timer::after(Duration::from_micros(1)).await;
        let edge = self.debouncer.update(self.input.is_high());
        self.enable.set_low();
        edge
    }
}
