//! Hardware-independent core of the PineTime weather watch face
//!
//! Everything here runs without the nRF52 peripherals so it can be tested
//! on the host:
//!
//! - `DisplayState`, the single state struct the renderer reads
//! - Change records received from the companion and the sync listener
//! - Asset transfer reassembly and icon decoding
//! - Power state machine (hidden / interactive / ambient) and redraw timing
//! - The watch face renderer, generic over any `DrawTarget<Color = Rgb565>`

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod asset;
pub mod clock;
pub mod config;
pub mod engine;
pub mod power;
pub mod record;
pub mod render;
pub mod state;

pub use asset::{AssetAssembler, AssetError, Icon};
pub use config::Config;
pub use engine::{
    AssetSink, ClockEvents, LatestAsset, SyncEvents, TapEvents, TapType, VisibilityEvents, WatchFace,
};
pub use power::{PowerState, TimerMode};
pub use record::{AssetRef, ChangeRecord, FieldValue};
pub use state::DisplayState;
