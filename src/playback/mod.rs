/*
 *  playback/mod.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback model and the session contract the coordinator drives
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

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use crate::mopidy::SessionError;

// Scripted session, public so integration tests can use it
pub mod mock;

/// Volume change per button press, in percentage points
pub const VOLUME_STEP: i32 = 15;

/// Snapshot of the server's current track at query time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Track {
    /// Track URI as reported by the server
    pub id: String,
    pub title: String,
    /// First listed artist, empty when the server lists none
    pub artist: String,
    /// Album URI, used for the art lookup
    pub album_id: String,
}

/// Mixer volume as a percentage, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Volume(u8);

impl Volume {
    pub const MIN: Volume = Volume(0);
    pub const MAX: Volume = Volume(100);

    /// Build a volume from any integer, pinning it to 0..=100
    pub fn clamped(value: i32) -> Self {
        Volume(value.clamp(0, 100) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Up,
    Down,
}

/// Raw volume arithmetic for one button press.
///
/// No clamping to 0..=100 happens here; the caller pins the result with
/// [`Volume::clamped`] before it goes to the server. Saturates at the i32
/// limits.
pub fn apply_step(current: i32, direction: VolumeDirection) -> i32 {
    match direction {
        VolumeDirection::Up => current.saturating_add(VOLUME_STEP),
        VolumeDirection::Down => current.saturating_sub(VOLUME_STEP),
    }
}

/// One of the four physical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonEvent {
    VolumeDown,
    VolumeUp,
    Previous,
    Next,
}

impl ButtonEvent {
    pub const ALL: [ButtonEvent; 4] = [
        ButtonEvent::VolumeDown,
        ButtonEvent::Previous,
        ButtonEvent::VolumeUp,
        ButtonEvent::Next,
    ];

    pub fn volume_direction(self) -> Option<VolumeDirection> {
        match self {
            ButtonEvent::VolumeUp => Some(VolumeDirection::Up),
            ButtonEvent::VolumeDown => Some(VolumeDirection::Down),
            _ => None,
        }
    }
}

impl fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonEvent::VolumeDown => "volume down",
            ButtonEvent::VolumeUp => "volume up",
            ButtonEvent::Previous => "previous",
            ButtonEvent::Next => "next",
        };
        f.write_str(name)
    }
}

/// Image descriptor returned by the library image lookup
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ImageRef {
    pub uri: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Album/track URI to the images the server knows for it
pub type ImageLookup = HashMap<String, Vec<ImageRef>>;

/// Callback invoked from the session's reader task; must not block
pub type SessionCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Everything the coordinator needs from the playback provider.
///
/// One implementation talks to Mopidy; tests supply their own. All calls go
/// through a single handle, each one atomic from the caller's side.
pub trait PlaybackSession {
    /// Host the session is connected to, reused for image URLs
    fn host(&self) -> &str;

    fn get_current_track(&self) -> impl Future<Output = Result<Option<Track>, SessionError>> + Send;

    /// `None` when the server has no mixer
    fn get_volume(&self) -> impl Future<Output = Result<Option<Volume>, SessionError>> + Send;

    fn set_volume(&self, volume: Volume) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn previous(&self) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn next(&self) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn get_images(&self, uris: &[String]) -> impl Future<Output = Result<ImageLookup, SessionError>> + Send;

    /// Register the single track-changed callback, replacing any earlier one
    fn on_track_changed(&mut self, callback: SessionCallback);

    /// Register the callback fired once when the transport goes away
    fn on_disconnect(&mut self, callback: SessionCallback);

    /// Release the transport
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_apply_step_is_plus_minus_fifteen(v in (i32::MIN + VOLUME_STEP)..=(i32::MAX - VOLUME_STEP)) {
            prop_assert_eq!(apply_step(v, VolumeDirection::Up), v + 15);
            prop_assert_eq!(apply_step(v, VolumeDirection::Down), v - 15);
        }

        #[test]
        fn test_stepped_volume_stays_in_range(v in 0i32..=100, up in any::<bool>()) {
            let direction = if up { VolumeDirection::Up } else { VolumeDirection::Down };
            let next = Volume::clamped(apply_step(v, direction)).percent() as i32;
            prop_assert!((0..=100).contains(&next));
            prop_assert!((next - v).abs() <= VOLUME_STEP);
        }
    }

    #[test]
    fn test_apply_step_saturates() {
        assert_eq!(apply_step(i32::MAX, VolumeDirection::Up), i32::MAX);
        assert_eq!(apply_step(i32::MIN, VolumeDirection::Down), i32::MIN);
    }

    #[test]
    fn test_volume_clamped() {
        assert_eq!(Volume::clamped(110), Volume::MAX);
        assert_eq!(Volume::clamped(-5), Volume::MIN);
        assert_eq!(Volume::clamped(42).percent(), 42);
        assert_eq!(Volume::clamped(apply_step(95, VolumeDirection::Up)).percent(), 100);
        assert_eq!(Volume::clamped(apply_step(10, VolumeDirection::Down)).percent(), 0);
    }

    #[test]
    fn test_button_volume_direction() {
        assert_eq!(ButtonEvent::VolumeUp.volume_direction(), Some(VolumeDirection::Up));
        assert_eq!(ButtonEvent::VolumeDown.volume_direction(), Some(VolumeDirection::Down));
        assert_eq!(ButtonEvent::Next.volume_direction(), None);
        assert_eq!(ButtonEvent::Previous.volume_direction(), None);
    }

    #[test]
    fn test_image_ref_deserialize() {
        let json = r#"{"__model__": "Image", "uri": "/local/abc.jpeg", "width": 300, "height": 300}"#;
        let img: ImageRef = serde_json::from_str(json).unwrap();
        assert_eq!(img.uri, "/local/abc.jpeg");
        assert_eq!(img.width, Some(300));

        let bare: ImageRef = serde_json::from_str(r#"{"uri": "/x.png"}"#).unwrap();
        assert_eq!(bare.height, None);
    }
}
