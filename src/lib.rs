/*
 *  lib.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
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

pub mod art;
pub mod config;
pub mod coordinator;
pub mod ctx;
pub mod display;
pub mod input;
pub mod mopidy;
pub mod playback;

pub use coordinator::{AppEvent, Coordinator, CoordinatorError, EventSender};
pub use ctx::Ctx;
pub use playback::{ButtonEvent, PlaybackSession, Track, Volume};
