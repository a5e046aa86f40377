//! Drawing API for [`Image`]s.
//!
//! This module contains a collection of freestanding functions that draw shapes onto an [`Image`].
//! All functions return a *guard object* that allows optional customization of the shape and
//! performs the draw operation when dropped.
//!
//! Except for [`filled_rect`], all operations *overwrite* the target pixels with the shape color.
//! Pixels outside of the image are silently clipped.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{iso_8859_1, MonoTextStyle},
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::image::{Color, Image, Rect};

fn to_px(coord: f32) -> i32 {
    coord.round() as i32
}

/// Guard returned by [`filled_rect`]; fills the rectangle when dropped and allows customization.
pub struct DrawFilledRect<'a> {
    image: &'a mut Image,
    rect: Rect,
    color: Color,
}

impl DrawFilledRect<'_> {
    /// Sets the fill color.
    ///
    /// The color's alpha channel controls how opaque the fill is.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }
}

impl Drop for DrawFilledRect<'_> {
    fn drop(&mut self) {
        let (x0, y0) = (to_px(self.rect.x()), to_px(self.rect.y()));
        let (x1, y1) = (to_px(self.rect.x_max()), to_px(self.rect.y_max()));

        // Clip to the image first so that huge rectangles don't iterate over off-screen pixels.
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(self.image.width() as i32 - 1);
        let y1 = y1.min(self.image.height() as i32 - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                self.image.blend_pixel(x, y, self.color);
            }
        }
    }
}

/// Guard returned by [`marker`]; draws the marker when dropped and allows customization.
pub struct DrawMarker<'a> {
    image: &'a mut Image,
    x: i32,
    y: i32,
    color: Color,
    size: u32,
}

impl<'a> DrawMarker<'a> {
    /// Sets the marker's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the width and height of the marker.
    ///
    /// The default size is 5. The size must be *uneven* and *non-zero*. A size of 1 will result in
    /// a single pixel getting drawn.
    pub fn size(&mut self, size: u32) -> &mut Self {
        assert!(size != 0, "marker size must be greater than zero");
        assert!(size % 2 == 1, "marker size must be an uneven number");
        self.size = size;
        self
    }
}

impl Drop for DrawMarker<'_> {
    fn drop(&mut self) {
        let offset = ((self.size - 1) / 2) as i32;
        let top_left = Point::new(self.x - offset, self.y - offset);
        match Rectangle::new(top_left, Size::new(self.size, self.size))
            .into_styled(PrimitiveStyle::with_fill(self.color))
            .draw(&mut Target(self.image))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`line`][line()]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    image: &'a mut Image,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
    color: Color,
    stroke_width: u32,
}

impl<'a> DrawLine<'a> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl<'a> Drop for DrawLine<'a> {
    fn drop(&mut self) {
        match Line::new(
            Point::new(self.start_x, self.start_y),
            Point::new(self.end_x, self.end_y),
        )
        .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width))
        .draw(&mut Target(self.image))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`text`]; draws the text when dropped and allows customization.
pub struct DrawText<'a> {
    image: &'a mut Image,
    x: i32,
    y: i32,
    text: &'a str,
    color: Color,
}

impl<'a> DrawText<'a> {
    /// Sets the text color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }
}

impl<'a> Drop for DrawText<'a> {
    fn drop(&mut self) {
        // Latin-1 font, since some sign labels (`Ñ`) are not ASCII.
        let character_style = MonoTextStyle::new(&iso_8859_1::FONT_10X20, self.color);
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        match Text::with_text_style(
            self.text,
            Point::new(self.x, self.y),
            character_style,
            text_style,
        )
        .draw(&mut Target(self.image))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Fills a rectangle, alpha-blending the fill color over the existing pixels.
///
/// The default color is black at 50/255 opacity.
pub fn filled_rect(image: &mut Image, rect: Rect) -> DrawFilledRect<'_> {
    DrawFilledRect {
        image,
        rect,
        color: Color::BLACK.with_alpha(50),
    }
}

/// Draws a marker onto an image.
///
/// This can be used to visualize shape landmarks or points of interest.
pub fn marker(image: &mut Image, x: f32, y: f32) -> DrawMarker<'_> {
    DrawMarker {
        image,
        x: to_px(x),
        y: to_px(y),
        color: Color::YELLOW,
        size: 5,
    }
}

/// Draws a line onto an image.
pub fn line(image: &mut Image, start_x: f32, start_y: f32, end_x: f32, end_y: f32) -> DrawLine<'_> {
    DrawLine {
        image,
        start_x: to_px(start_x),
        start_y: to_px(start_y),
        end_x: to_px(end_x),
        end_y: to_px(end_y),
        color: Color::from_rgb8(0, 127, 139),
        stroke_width: 1,
    }
}

/// Draws a text string onto an image.
///
/// The text is drawn centered horizontally and vertically around `x` and `y`.
pub fn text<'a>(image: &'a mut Image, x: f32, y: f32, text: &'a str) -> DrawText<'a> {
    DrawText {
        image,
        x: to_px(x),
        y: to_px(y),
        text,
        color: Color::WHITE,
    }
}

struct Target<'a>(&'a mut Image);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.0.width(), self.0.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < self.0.width()
                && point.y >= 0
                && (point.y as u32) < self.0.height()
            {
                self.0.set(point.x as u32, point.y as u32, color);
            }
        }

        Ok(())
    }
}
