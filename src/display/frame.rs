/*
 *  display/frame.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed-size RGB565 frame, the unit handed to a display sink
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{IntoStorage, Rgb565, Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use image::{Rgb, RgbImage};

pub const FRAME_WIDTH: u32 = 240;
pub const FRAME_HEIGHT: u32 = 240;

const W: usize = FRAME_WIDTH as usize;
const H: usize = FRAME_HEIGHT as usize;

/// A 240x240 colour bitmap, row-major, rebuilt wholesale on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<Rgb565>,
}

impl Frame {
    pub fn new(fill: Rgb565) -> Self {
        Frame { buf: vec![fill; W * H] }
    }

    /// Solid black, the fallback background
    pub fn blank() -> Self {
        Frame::new(Rgb565::BLACK)
    }

    /// Copy a 240x240 RGB image in; anything outside the frame is ignored.
    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let mut frame = Frame::blank();
        let w = (img.width() as usize).min(W);
        let h = (img.height() as usize).min(H);
        for y in 0..h {
            for x in 0..w {
                let Rgb([r, g, b]) = *img.get_pixel(x as u32, y as u32);
                frame.buf[y * W + x] = Rgb565::from(Rgb888::new(r, g, b));
            }
        }
        frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    /// Panel byte order: RGB565, big-endian, two bytes per pixel
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.buf.len() * 2);
        for &px in &self.buf {
            let raw: u16 = px.into_storage();
            bytes.extend_from_slice(&raw.to_be_bytes());
        }
        bytes
    }

    /// Rotate counter-clockwise by a multiple of 90 degrees.
    ///
    /// Other angles return an unrotated copy; callers validate rotation
    /// up front.
    pub fn rotated(&self, degrees: u16) -> Frame {
        let turns = (degrees / 90) % 4;
        if degrees % 90 != 0 || turns == 0 {
            return self.clone();
        }
        let mut out = Frame::blank();
        for y in 0..H {
            for x in 0..W {
                let (sx, sy) = match turns {
                    1 => (W - 1 - y, x),
                    2 => (W - 1 - x, H - 1 - y),
                    _ => (y, H - 1 - x),
                };
                out.buf[y * W + x] = self.buf[sy * W + sx];
            }
        }
        out
    }

    /// Back to an 8-bit RGB image, for previews
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
            let c = Rgb888::from(self.buf[y as usize * W + x as usize]);
            Rgb([c.r(), c.g(), c.b()])
        })
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < W && y < H {
                return Some(y * W + x);
            }
        }
        None
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(FRAME_WIDTH, FRAME_HEIGHT)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // clip first; text outlines routinely run off the edge
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else { return Ok(()) };
        for y in area.top_left.y..=bottom_right.y {
            let row = y as usize * W;
            self.buf[row + area.top_left.x as usize..=row + bottom_right.x as usize].fill(color);
        }
        Ok(())
    }
}
