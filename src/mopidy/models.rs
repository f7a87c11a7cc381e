/*
 *  mopidy/models.rs
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

use serde::Deserialize;

use crate::playback::Track;

// Mopidy's serialized models, only the fields we render

#[derive(Debug, Clone, Deserialize)]
pub struct TlTrack {
    #[allow(dead_code)]
    #[serde(default)]
    pub tlid: Option<u64>,
    pub track: MopidyTrack,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MopidyTrack {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub uri: Option<String>,
}

impl From<TlTrack> for Track {
    fn from(tl: TlTrack) -> Self {
        let t = tl.track;
        Track {
            id: t.uri,
            title: t.name.unwrap_or_default(),
            artist: t
                .artists
                .into_iter()
                .find_map(|a| a.name)
                .unwrap_or_default(),
            album_id: t.album.and_then(|a| a.uri).unwrap_or_default(),
        }
    }
}
