//! Bluetooth module
//!
//! GATT server with the weather sync service, the Current Time Service and
//! the Battery Service. Writes are decoded here and forwarded to the watch
//! face task; nothing in this module touches the display state.

// Core
use core::{cell::RefCell, mem};

// BLE
use embassy_sync::{
    blocking_mutex::{raw::ThreadModeRawMutex, Mutex},
    signal::Signal,
};
use embassy_time::{with_timeout, Duration, Timer};
use heapless::{String, Vec};
use nrf_softdevice::{
    self,
    ble::{
        advertisement_builder::{
            Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
            ServiceUuid16,
        },
        gatt_server, peripheral, Connection,
    },
    raw, Config, Softdevice,
};

// Others
use weatherface_core::{
    clock,
    config::CONFIG_PATH,
    record::{self, PATH_LEN},
    state::MESSAGE_LEN,
    ChangeRecord,
};

use crate::channels::{ASSET_CHUNKS, CHUNK_LEN, UI_EVENTS};
use crate::ui::UiEvent;

const DEVICE_NAME: &[u8] = b"PineTime";

/// Weather service UUID 9f2a0001-6b47-4e49-8e9a-6c0c0dbd6a10, little endian
const WEATHER_SERVICE: [u8; 16] = [
    0x10, 0x6a, 0xbd, 0x0d, 0x0c, 0x6c, 0x9a, 0x8e, 0x49, 0x4e, 0x47, 0x6b, 0x01, 0x00, 0x2a, 0x9f,
];

/// Largest serialized change record accepted on the config characteristic
const RECORD_LEN: usize = 200;

pub static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(
        ServiceList::Incomplete,
        &[ServiceUuid16::CURRENT_TIME, ServiceUuid16::BATTERY],
    )
    .full_name("PineTime")
    .build();

pub static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_128(ServiceList::Complete, &[WEATHER_SERVICE])
    .build();

/// Current connection, if any
static LINK: Mutex<ThreadModeRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));
/// Raised whenever a central connects
static LINK_UP: Signal<ThreadModeRawMutex, ()> = Signal::new();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub weather: WeatherService,
    pub cts: CurrentTimeService,
    pub bas: BatteryService,
}

#[nrf_softdevice::gatt_service(uuid = "9f2a0001-6b47-4e49-8e9a-6c0c0dbd6a10")]
pub struct WeatherService {
    /// Postcard encoded change record
    #[characteristic(uuid = "9f2a0002-6b47-4e49-8e9a-6c0c0dbd6a10", write)]
    pub config: Vec<u8, RECORD_LEN>,
    /// Asset chunks, answering `asset_request`; acknowledged one by one
    #[characteristic(uuid = "9f2a0003-6b47-4e49-8e9a-6c0c0dbd6a10", write)]
    pub asset_data: Vec<u8, CHUNK_LEN>,
    /// Asset id the watch wants, little endian
    #[characteristic(uuid = "9f2a0004-6b47-4e49-8e9a-6c0c0dbd6a10", read, notify)]
    pub asset_request: u32,
    /// Path the watch wants rewritten, notified once the central subscribes
    #[characteristic(uuid = "9f2a0006-6b47-4e49-8e9a-6c0c0dbd6a10", read, notify)]
    pub sync_request: Vec<u8, PATH_LEN>,
    /// Free text line, UTF-8
    #[characteristic(uuid = "9f2a0005-6b47-4e49-8e9a-6c0c0dbd6a10", write)]
    pub message: Vec<u8, MESSAGE_LEN>,
}

#[nrf_softdevice::gatt_service(uuid = "1805")]
pub struct CurrentTimeService {
    #[characteristic(uuid = "2a2b", read, write, notify)]
    pub current_time: [u8; clock::CTS_LEN],
    #[characteristic(uuid = "2a0f", read, write)]
    pub local_time_info: [u8; clock::LTI_LEN],
}

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    pub battery_level: u8,
}

/// SoftDevice configuration for a single peripheral link
pub fn softdevice_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: CHUNK_LEN as u16 + 3,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        // S113 is peripheral only
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Advertise, serve one central until it disconnects, repeat
pub async fn run(sd: &'static Softdevice, server: &'static Server) -> ! {
    let config = peripheral::Config::default();
    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                defmt::warn!("Advertising failed: {:?}", e);
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };
        defmt::info!("Central connected");
        LINK.lock(|link| link.replace(Some(conn.clone())));
        LINK_UP.signal(());
        // Readable as well, for centrals that poll instead of subscribing
        if let Ok(request) = record::sync_request(CONFIG_PATH) {
            if let Err(e) = server.weather.sync_request_set(&request) {
                defmt::warn!("Sync request not stored: {:?}", e);
            }
        }

        let reason = gatt_server::run(&conn, server, |event| {
            on_server_event(server, &conn, event)
        })
        .await;

        LINK.lock(|link| link.replace(None));
        defmt::info!("Central disconnected: {:?}", reason);
    }
}

/// The current connection, waiting up to `timeout` for one to come up
pub async fn wait_for_link(timeout: Duration) -> Option<Connection> {
    if let Some(conn) = current_link() {
        return Some(conn);
    }
    LINK_UP.reset();
    with_timeout(timeout, LINK_UP.wait()).await.ok()?;
    current_link()
}

fn current_link() -> Option<Connection> {
    LINK.lock(|link| link.borrow().clone())
}

/// Update the battery level and notify a subscribed central
pub fn publish_battery(server: &Server, percent: u8) {
    if let Err(e) = server.bas.battery_level_set(&percent) {
        defmt::warn!("Battery level not stored: {:?}", e);
        return;
    }
    if let Some(conn) = current_link() {
        // Fails when notifications are off, which is fine
        let _ = server.bas.battery_level_notify(&conn, &percent);
    }
}

/// Ask the companion for the current weather record
fn request_sync(server: &Server, conn: &Connection) {
    let request = match record::sync_request(CONFIG_PATH) {
        Ok(request) => request,
        Err(e) => {
            defmt::warn!("Sync request not encoded: {}", e);
            return;
        }
    };
    if let Err(e) = server.weather.sync_request_notify(conn, &request) {
        defmt::warn!("Sync request not sent: {:?}", e);
    } else {
        defmt::info!("Requested {}", CONFIG_PATH);
    }
}

fn on_server_event(server: &Server, conn: &Connection, event: ServerEvent) {
    match event {
        ServerEvent::Weather(event) => on_weather_event(server, conn, event),
        ServerEvent::Cts(event) => on_time_event(event),
        ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
            defmt::debug!("Battery notifications: {}", notifications);
        }
    }
}

fn on_weather_event(server: &Server, conn: &Connection, event: WeatherServiceEvent) {
    match event {
        WeatherServiceEvent::ConfigWrite(bytes) => match ChangeRecord::from_bytes(&bytes) {
            Ok(record) => forward(UiEvent::Sync(record)),
            Err(e) => defmt::warn!("Dropping change record: {}", e),
        },
        WeatherServiceEvent::AssetDataWrite(chunk) => {
            if ASSET_CHUNKS.try_send(chunk).is_err() {
                defmt::warn!("Asset chunk dropped, resolver busy");
            }
        }
        WeatherServiceEvent::AssetRequestCccdWrite { notifications } => {
            defmt::debug!("Asset request notifications: {}", notifications);
        }
        // Subscribing is the companion's signal that it is ready to sync
        WeatherServiceEvent::SyncRequestCccdWrite { notifications } => {
            if notifications {
                request_sync(server, conn);
            }
        }
        WeatherServiceEvent::MessageWrite(bytes) => {
            let text = core::str::from_utf8(&bytes)
                .ok()
                .and_then(|text| String::<MESSAGE_LEN>::try_from(text).ok());
            match text {
                Some(text) => forward(UiEvent::Message(text)),
                None => defmt::warn!("Message is not UTF-8"),
            }
        }
    }
}

fn on_time_event(event: CurrentTimeServiceEvent) {
    match event {
        CurrentTimeServiceEvent::CurrentTimeWrite(bytes) => match clock::parse_current_time(&bytes) {
            Ok(time) => forward(UiEvent::Time(time)),
            Err(e) => defmt::warn!("Invalid current time: {}", e),
        },
        CurrentTimeServiceEvent::CurrentTimeCccdWrite { .. } => {}
        CurrentTimeServiceEvent::LocalTimeInfoWrite(bytes) => {
            match clock::parse_local_time_info(&bytes) {
                Ok(zone) => forward(UiEvent::TimeZone(zone)),
                Err(e) => defmt::warn!("Invalid local time info: {}", e),
            }
        }
    }
}

fn forward(event: UiEvent) {
    if UI_EVENTS.try_send(event).is_err() {
        defmt::warn!("UI event queue full, dropping event");
    }
}
