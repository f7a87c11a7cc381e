/*
 *  display/mod.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - frame, composer, sinks
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod frame;
pub mod factory;

// Text and art composition
pub mod compose;

// Sinks
pub mod drivers;

// Re-exports for convenience
pub use traits::{BoxedSink, DisplayCapabilities, DisplaySink};
pub use error::DisplayError;
pub use frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
pub use factory::DisplaySinkFactory;
pub use compose::{wrap_text, Artwork, ComposeOptions, FontChoice, FrameComposer};
