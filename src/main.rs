#![no_std]
#![no_main]

mod channels;
mod peripherals;
mod system;
mod ui;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Core
use core::cell::RefCell;

// Device
use embassy_embedded_hal::shared_bus::blocking::i2c::I2cDevice;
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    peripherals::{SPI2, TWISPI1},
    saadc::{self, ChannelConfig, Resolution, Saadc},
    spim,
    twim::{self, Twim},
};
use embassy_sync::blocking_mutex::{raw::NoopRawMutex, Mutex};
use embassy_time::{Duration, Ticker, Timer};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1 => twim::InterruptHandler<TWISPI1>;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use channels::{ASSET_REQUESTS, ICON_RESULT, UI_EVENTS};
use peripherals::{
    backlight::Backlight, battery::Battery, button::Button, display::Display,
    touch::TouchController,
};
use system::{
    assets,
    bluetooth::{self, Server},
    config::SystemConfig,
};
use ui::{Controller, UiEvent};

// Others
use weatherface_core::{AssetAssembler, Config};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

static I2C_BUS: StaticCell<Mutex<NoopRawMutex, RefCell<Twim<'static, TWISPI1>>>> =
    StaticCell::new();
static SERVER: StaticCell<Server> = StaticCell::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    bluetooth::run(sd, server).await
}

/// Resolve requested assets one at a time, off the render path
#[embassy_executor::task]
async fn asset_resolver(server: &'static Server, config: Config) {
    let mut assembler = AssetAssembler::new();
    loop {
        let asset = ASSET_REQUESTS.wait().await;
        let result = assets::resolve(server, &mut assembler, asset, &config).await;
        if ASSET_REQUESTS.signaled() {
            defmt::debug!("Asset {} superseded", asset);
            continue;
        }
        if let Err(e) = &result {
            defmt::warn!("Asset {} not resolved: {}", asset, e);
        }
        ICON_RESULT.signal(result);
    }
}

/// Owns the watch face, the LCD and the backlight
#[embassy_executor::task]
async fn watchface(
    mut controller: Controller,
    mut display: Display<SPI2>,
    mut backlight: Backlight,
) {
    refresh(&mut controller, &mut display, &mut backlight);
    loop {
        let tick = wait_tick(controller.next_tick());
        match select3(UI_EVENTS.receive(), ICON_RESULT.wait(), tick).await {
            Either3::First(event) => controller.on_event(event),
            Either3::Second(result) => controller.on_icon(result),
            Either3::Third(()) => controller.on_tick(),
        }
        refresh(&mut controller, &mut display, &mut backlight);
    }
}

/// Bring backlight and LCD in line with the face
fn refresh(controller: &mut Controller, display: &mut Display<SPI2>, backlight: &mut Backlight) {
    let face = controller.face();
    let config = face.config();
    if let Err(e) = backlight.apply(
        face.power(),
        config.brightness_interactive,
        config.brightness_ambient,
    ) {
        defmt::warn!("Backlight: {}", e);
    }

    if controller.take_redraw() {
        if let Err(e) = display.draw(controller.face()) {
            defmt::warn!("Display: {}", e);
        }
    }
}

async fn wait_tick(delay: Option<Duration>) {
    match delay {
        Some(delay) => Timer::after(delay).await,
        None => core::future::pending().await,
    }
}

/// Poll the battery and report changes
#[embassy_executor::task]
async fn battery_status(mut battery: Battery, server: &'static Server, period: Duration) {
    let mut ticker = Ticker::every(period);
    let mut last = None;
    loop {
        let info = battery.read().await;
        if last != Some(info) {
            defmt::info!("Battery: {}", info);
            bluetooth::publish_battery(server, info.percent);
            UI_EVENTS.send(UiEvent::Battery(info)).await;
            last = Some(info);
        }
        ticker.next().await;
    }
}

#[embassy_executor::task]
async fn poll_button(mut button: Button) {
    loop {
        button.wait_for_press().await;
        UI_EVENTS.send(UiEvent::Button).await;
    }
}

/// Polls the touch controller every 10ms
#[embassy_executor::task]
async fn poll_touch(mut touch: TouchController<TWISPI1>) {
    let mut ticker = Ticker::every(Duration::from_millis(10));
    loop {
        if let Some(tap) = touch.try_tap() {
            UI_EVENTS.send(UiEvent::Tap(tap)).await;
        }
        ticker.next().await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(SystemConfig::new());
    SystemConfig::set_peripheral_priorities();
    defmt::info!("Initializing");

    let config = Config::default();

    // Initialize SAADC
    let mut saadc_config = saadc::Config::default();
    // 12 bit resolution, the battery conversion depends on it
    saadc_config.resolution = Resolution::_12BIT;
    // Pin P0.31: Voltage level
    let channel_config = ChannelConfig::single_ended(p.P0_31);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc_config, [channel_config]);
    saadc.calibrate().await;
    let battery = Battery::init(saadc, Input::new(p.P0_12, Pull::None));

    // Initialize Button
    let button = Button::init(
        Input::new(p.P0_13, Pull::None),
        Output::new(p.P0_15, Level::Low, OutputDrive::Standard),
    );

    // Initialize Backlight
    let backlight = Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
    );

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;
    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Initialize I2C at 400KHz, shared with the sensors on the same bus
    let mut i2c_config = twim::Config::default();
    i2c_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI1, Irqs, p.P0_06, p.P0_07, i2c_config);
    let i2c_bus = I2C_BUS.init(Mutex::new(RefCell::new(i2c)));

    // Initialize touch controller
    let touch = unwrap!(TouchController::init(
        I2cDevice::new(i2c_bus),
        Input::new(p.P0_28, Pull::Up), // Touchpad external interrupt pin: P0.28/AIN4 (TP_INT)
        Output::new(p.P0_10, Level::High, OutputDrive::Standard), // Touchpad reset pin: P0.10/NFC2 (TP_RESET)
    ));

    // Initialize Bluetooth
    let sd = Softdevice::enable(&bluetooth::softdevice_config());
    let server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;

    let controller = Controller::new(config, UTC_EPOCH);

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(ble_task(sd, server)));
    unwrap!(spawner.spawn(asset_resolver(server, config)));
    unwrap!(spawner.spawn(watchface(controller, display, backlight)));
    unwrap!(spawner.spawn(battery_status(
        battery,
        server,
        Duration::from_secs(config.battery_poll_secs)
    )));
    unwrap!(spawner.spawn(poll_button(button)));
    unwrap!(spawner.spawn(poll_touch(touch)));
}
