/*
 *  display/traits.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display sink abstraction
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

use crate::display::error::DisplayError;
use crate::display::frame::Frame;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Short name for logging
    pub name: &'static str,
}

/// Where finished frames go.
///
/// `show` is synchronous: it returns once the whole frame is on the panel,
/// and the next frame may only be submitted after that. There is no double
/// buffering. Any error is treated as fatal by the caller.
pub trait DisplaySink: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Push one complete frame
    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError>;
}

/// Boxed sink, chosen at runtime from configuration
pub type BoxedSink = Box<dyn DisplaySink>;

/// Rotation is fixed at construction and must be a quarter turn
pub fn validate_rotation(degrees: u16) -> Result<(), DisplayError> {
    match degrees {
        0 | 90 | 180 | 270 => Ok(()),
        _ => Err(DisplayError::InvalidRotation(degrees)),
    }
}
