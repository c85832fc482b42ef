//! Inter-task communication channels
//!
//! The watch face task is the only consumer of `UI_EVENTS` and
//! `ICON_RESULT`; everything else only produces into them.

use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use heapless::Vec;
use weatherface_core::{
    asset::{BLOB_MAX_CHUNKS, CHUNK_MAX_LEN},
    AssetError, AssetRef, Icon,
};

use crate::ui::UiEvent;

/// Largest GATT write, ATT MTU minus the 3 byte header
pub const CHUNK_LEN: usize = CHUNK_MAX_LEN;

/// Events for the watch face task (touch, button, battery, BLE writes)
pub static UI_EVENTS: Channel<ThreadModeRawMutex, UiEvent, 8> = Channel::new();

/// Asset the watch face wants resolved; a newer request replaces an older one
pub static ASSET_REQUESTS: Signal<ThreadModeRawMutex, AssetRef> = Signal::new();

/// Raw asset chunks written by the companion, room for a whole icon
pub static ASSET_CHUNKS: Channel<ThreadModeRawMutex, Vec<u8, CHUNK_LEN>, BLOB_MAX_CHUNKS> =
    Channel::new();

/// Outcome of the most recent asset resolution
pub static ICON_RESULT: Signal<ThreadModeRawMutex, Result<Icon, AssetError>> = Signal::new();
