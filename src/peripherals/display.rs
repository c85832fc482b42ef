//! LCD driver
//!
//! ST7789 240x240 panel on SPIM2, driven through mipidsi. The watch face
//! renders straight into it; there is no frame buffer.

use display_interface_spi::SPIInterface;
use embassy_nrf::{
    gpio::Output,
    peripherals::{P0_18, P0_25, P0_26},
    spim::{self, Spim},
};
use embassy_time::Delay;
use mipidsi::{models::ST7789, Builder, Orientation};
use weatherface_core::{render, WatchFace};

type Lcd<SPI> = mipidsi::Display<
    SPIInterface<Spim<'static, SPI>, Output<'static, P0_18>, Output<'static, P0_25>>,
    ST7789,
    Output<'static, P0_26>,
>;

pub struct Display<SPI>
where
    SPI: spim::Instance,
{
    lcd: Lcd<SPI>,
}

impl<SPI> Display<SPI>
where
    SPI: spim::Instance,
{
    /// Reset and configure the panel
    pub fn init(
        spim: Spim<'static, SPI>,
        cs: Output<'static, P0_25>,
        dc: Output<'static, P0_18>,
        rst: Output<'static, P0_26>,
    ) -> Result<Self, Error> {
        let lcd = Builder::st7789(SPIInterface::new(spim, dc, cs))
            .with_display_size(render::LCD_W as u16, render::LCD_H as u16)
            .with_orientation(Orientation::Portrait(false))
            .init(&mut Delay, Some(rst))
            .map_err(|_| Error::Init)?;
        Ok(Self { lcd })
    }

    /// Draw the full watch face
    pub fn draw(&mut self, face: &WatchFace) -> Result<(), Error> {
        face.render(&mut self.lcd).map_err(|_| Error::Bus)
    }
}

#[derive(Debug, defmt::Format)]
pub enum Error {
    /// Panel did not come out of reset
    Init,
    /// SPI transfer failed while drawing
    Bus,
}
