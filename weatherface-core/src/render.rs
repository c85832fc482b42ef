//! Watch face renderer
//!
//! Immediate-mode drawing of a `DisplayState` onto any RGB565 draw target.
//! Interactive mode shows everything; ambient mode only time and date on
//! black.

use embedded_graphics::{
    image::{Image, ImageRawBE},
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_6X10, FONT_9X15},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Alignment, Text},
};
use profont::PROFONT_24_POINT;

use crate::asset::ICON_MAX_EDGE;
use crate::clock;
use crate::config::{Palette, Shape};
use crate::state::DisplayState;

pub const LCD_W: u32 = 240;
pub const LCD_H: u32 = 240;

/// Screen positions of every element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub center_x: i32,
    pub battery_y: i32,
    pub time_y: i32,
    pub date_y: i32,
    pub separator_y: i32,
    pub separator_half_width: i32,
    pub temperature_y: i32,
    /// Top-left corner of the icon box
    pub icon_origin: Point,
    pub message_y: i32,
    /// Message characters that fit across the panel at `message_y`
    pub message_max_chars: usize,
    pub ambient_time_y: i32,
    pub ambient_date_y: i32,
}

impl Layout {
    pub fn for_shape(shape: Shape) -> Self {
        let center_x = LCD_W as i32 / 2;
        match shape {
            Shape::Rectangular => Self {
                center_x,
                battery_y: 24,
                time_y: 80,
                date_y: 110,
                separator_y: 124,
                separator_half_width: 30,
                temperature_y: 170,
                icon_origin: Point::new(center_x - 100, 136),
                message_y: 220,
                message_max_chars: LCD_W as usize / 6,
                ambient_time_y: 110,
                ambient_date_y: 150,
            },
            // Pull everything towards the centre to stay clear of the bezel
            Shape::Round => Self {
                center_x,
                battery_y: 40,
                time_y: 90,
                date_y: 118,
                separator_y: 130,
                separator_half_width: 24,
                temperature_y: 172,
                icon_origin: Point::new(center_x - 88, 140),
                message_y: 198,
                // Chord of the bezel at that height is about 180 px
                message_max_chars: 30,
                ambient_time_y: 115,
                ambient_date_y: 150,
            },
        }
    }
}

/// Draw `state` according to its ambient flag
pub fn draw<D>(
    state: &DisplayState,
    layout: &Layout,
    palette: &Palette,
    target: &mut D,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    if state.ambient {
        draw_ambient(state, layout, palette, target)
    } else {
        draw_interactive(state, layout, palette, target)
    }
}

fn draw_interactive<D>(
    state: &DisplayState,
    layout: &Layout,
    palette: &Palette,
    target: &mut D,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let now = state.local_time();
    let cx = layout.center_x;
    target.clear(state.background)?;

    // Battery
    let mut buf = [0u8; 8];
    if let Ok(text) = format_no_std::show(
        &mut buf,
        format_args!(
            "{}%{}",
            state.battery_percent,
            if state.charging { "+" } else { "" }
        ),
    ) {
        centered(text, cx, layout.battery_y, &FONT_9X15, palette.secondary_text, target)?;
    }

    // Time
    let mut buf = [0u8; 12];
    if let Ok(text) = clock::format_time_seconds(&mut buf, now) {
        centered(text, cx, layout.time_y, &PROFONT_24_POINT, palette.digital_text, target)?;
    }

    // Date
    let mut buf = [0u8; 24];
    if let Ok(text) = clock::format_date(&mut buf, now) {
        centered(text, cx, layout.date_y, &FONT_9X15, palette.secondary_text, target)?;
    }

    Line::new(
        Point::new(cx - layout.separator_half_width, layout.separator_y),
        Point::new(cx + layout.separator_half_width, layout.separator_y),
    )
    .into_styled(PrimitiveStyle::with_stroke(palette.secondary_text, 1))
    .draw(target)?;

    // High and low, side by side right of the icon
    let mut buf = [0u8; 16];
    if let Ok(text) = format_no_std::show(&mut buf, format_args!("{}°", state.high.as_str())) {
        left_aligned(text, cx - 36, layout.temperature_y, palette.digital_text, target)?;
    }
    let mut buf = [0u8; 16];
    if let Ok(text) = format_no_std::show(&mut buf, format_args!("{}°", state.low.as_str())) {
        left_aligned(text, cx + 30, layout.temperature_y, palette.secondary_text, target)?;
    }

    if let Some(icon) = &state.weather_icon {
        let raw = ImageRawBE::<Rgb565>::new(icon.data(), icon.width() as u32);
        let inset = Point::new(
            (ICON_MAX_EDGE - icon.width()) as i32 / 2,
            (ICON_MAX_EDGE - icon.height()) as i32 / 2,
        );
        Image::new(&raw, layout.icon_origin + inset).draw(target)?;
    }

    if let Some(message) = &state.message {
        let end = message
            .char_indices()
            .nth(layout.message_max_chars)
            .map_or(message.len(), |(i, _)| i);
        centered(
            &message[..end],
            cx,
            layout.message_y,
            &FONT_6X10,
            palette.secondary_text,
            target,
        )?;
    }

    Ok(())
}

fn draw_ambient<D>(
    state: &DisplayState,
    layout: &Layout,
    palette: &Palette,
    target: &mut D,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let now = state.local_time();
    let cx = layout.center_x;
    target.clear(Rgb565::BLACK)?;

    // Low-bit panels only get one pure colour
    let (time_color, date_color) = if state.low_bit_ambient {
        (palette.ambient_text, palette.ambient_text)
    } else {
        (palette.digital_text, palette.secondary_text)
    };

    let mut buf = [0u8; 8];
    if let Ok(text) = clock::format_time(&mut buf, now) {
        centered(text, cx, layout.ambient_time_y, &PROFONT_24_POINT, time_color, target)?;
    }

    let mut buf = [0u8; 8];
    if let Ok(text) = clock::format_date_short(&mut buf, now) {
        centered(text, cx, layout.ambient_date_y, &FONT_10X20, date_color, target)?;
    }

    Ok(())
}

fn centered<D>(
    text: &str,
    x: i32,
    y: i32,
    font: &MonoFont<'_>,
    color: Rgb565,
    target: &mut D,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    Text::with_alignment(
        text,
        Point::new(x, y),
        MonoTextStyle::new(font, color),
        Alignment::Center,
    )
    .draw(target)?;
    Ok(())
}

fn left_aligned<D>(text: &str, x: i32, y: i32, color: Rgb565, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    Text::new(text, Point::new(x, y), MonoTextStyle::new(&FONT_10X20, color)).draw(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;
    use crate::asset::Icon;
    use crate::config::Config;
    use crate::engine::{SyncEvents, TapEvents, TapType, VisibilityEvents, WatchFace};

    struct Framebuffer {
        pixels: std::vec::Vec<Rgb565>,
        /// Pixels drawn outside the panel
        clipped: usize,
    }

    impl Framebuffer {
        fn new() -> Self {
            Self {
                pixels: vec![Rgb565::new(1, 2, 3); (LCD_W * LCD_H) as usize],
                clipped: 0,
            }
        }

        fn at(&self, x: i32, y: i32) -> Rgb565 {
            self.pixels[y as usize * LCD_W as usize + x as usize]
        }

        fn count(&self, color: Rgb565) -> usize {
            self.pixels.iter().filter(|p| **p == color).count()
        }
    }

    impl OriginDimensions for Framebuffer {
        fn size(&self) -> Size {
            Size::new(LCD_W, LCD_H)
        }
    }

    impl DrawTarget for Framebuffer {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if (0..LCD_W as i32).contains(&point.x) && (0..LCD_H as i32).contains(&point.y) {
                    self.pixels[point.y as usize * LCD_W as usize + point.x as usize] = color;
                } else {
                    self.clipped += 1;
                }
            }
            Ok(())
        }
    }

    fn red_icon() -> Icon {
        let mut blob = std::vec![2, 0, 2, 0];
        for _ in 0..4 {
            blob.extend_from_slice(&[0xf8, 0x00]);
        }
        Icon::decode(&blob).unwrap()
    }

    fn face() -> WatchFace {
        let mut face = WatchFace::new(Config::default());
        face.on_visibility_changed(true);
        face
    }

    #[test]
    fn test_interactive_background_and_text() {
        let face = face();
        let palette = face.config().palette;
        let mut fb = Framebuffer::new();
        face.render(&mut fb).unwrap();

        assert_eq!(fb.at(0, 0), palette.background);
        assert_eq!(fb.at(239, 239), palette.background);
        assert!(fb.count(palette.digital_text) > 0);
        assert!(fb.count(palette.secondary_text) > 0);
    }

    #[test]
    fn test_tap_changes_background() {
        let mut face = face();
        face.on_tap(TapType::Tap);
        let mut fb = Framebuffer::new();
        face.render(&mut fb).unwrap();
        assert_eq!(fb.at(0, 0), face.config().palette.background_alt);
    }

    #[test]
    fn test_icon_drawn_when_present() {
        let mut face = face();
        let layout = Layout::for_shape(face.config().shape);
        let mut fb = Framebuffer::new();
        face.render(&mut fb).unwrap();
        assert_eq!(fb.count(Rgb565::RED), 0);

        face.on_icon_resolved(Ok(red_icon()));
        face.render(&mut fb).unwrap();
        let inset = (ICON_MAX_EDGE as i32 - 2) / 2;
        let origin = layout.icon_origin;
        assert_eq!(fb.at(origin.x + inset, origin.y + inset), Rgb565::RED);
        assert_eq!(fb.count(Rgb565::RED), 4);
    }

    #[test]
    fn test_ambient_reduced_detail() {
        let mut face = face();
        face.on_icon_resolved(Ok(red_icon()));
        face.on_ambient_mode_changed(true);
        let palette = face.config().palette;

        let mut fb = Framebuffer::new();
        face.render(&mut fb).unwrap();

        assert_eq!(fb.at(0, 0), Rgb565::BLACK);
        assert_eq!(fb.count(palette.background), 0);
        assert_eq!(fb.count(Rgb565::RED), 0);

        // Low-bit ambient: black plus a single text colour
        let other = fb
            .pixels
            .iter()
            .filter(|p| **p != Rgb565::BLACK && **p != palette.ambient_text)
            .count();
        assert_eq!(other, 0);
        assert!(fb.count(palette.ambient_text) > 0);
    }

    #[test]
    fn test_ambient_full_colour_panel() {
        let mut face = face();
        face.on_properties_changed(false);
        face.on_ambient_mode_changed(true);
        let palette = face.config().palette;

        let mut fb = Framebuffer::new();
        face.render(&mut fb).unwrap();
        assert!(fb.count(palette.secondary_text) > 0);
    }

    #[test]
    fn test_full_message_stays_on_panel() {
        for shape in [Shape::Rectangular, Shape::Round] {
            let config = Config {
                shape,
                ..Config::default()
            };
            let mut face = WatchFace::new(config);
            face.on_visibility_changed(true);
            face.set_message("WWWWWWWWWWWWWWWWWWWWWWWWWWWWWWWW");
            assert_eq!(face.state().message.as_ref().map(|m| m.len()), Some(32));

            let mut fb = Framebuffer::new();
            face.render(&mut fb).unwrap();
            assert_eq!(fb.clipped, 0);

            let layout = Layout::for_shape(shape);
            let width = layout.message_max_chars as i32 * 6;
            assert!(layout.center_x - width / 2 >= 0);
            assert!(layout.center_x + width / 2 <= LCD_W as i32);
            if shape == Shape::Round {
                // Both ends of the line stay inside the circular bezel
                let r = LCD_W as i32 / 2;
                let dy = layout.message_y - r;
                assert!((width / 2).pow(2) + dy.pow(2) <= r.pow(2));
            }
        }
    }

    #[test]
    fn test_round_layout_fits_screen() {
        for shape in [Shape::Rectangular, Shape::Round] {
            let layout = Layout::for_shape(shape);
            assert!(layout.message_y < LCD_H as i32);
            assert!(layout.icon_origin.x >= 0);
            assert!(layout.icon_origin.y + (ICON_MAX_EDGE as i32) < LCD_H as i32);
        }
    }
}
