/*
 *  art.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Album art lookup, download, cache, decode
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

use std::io::Cursor;
use std::path::PathBuf;

use image::RgbImage;
use log::{debug, info, warn};
use reqwest::Client;
use thiserror::Error;

use crate::display::compose::Artwork;
use crate::mopidy::SessionError;
use crate::playback::PlaybackSession;

pub const DEFAULT_CACHE_PATH: &str = "/tmp/album.jpeg";

#[derive(Debug, Error)]
pub enum ArtError {
    #[error("track has no album")]
    NoAlbum,
    #[error("no image known for {0}")]
    NoImage(String),
    #[error("image lookup failed: {0}")]
    Lookup(#[from] SessionError),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Resolves album art through the session, downloads it from the server's
/// web port and keeps the most recent image on disk.
#[derive(Debug, Clone)]
pub struct ArtFetcher {
    client: Client,
    web_port: u16,
    cache_path: PathBuf,
}

impl ArtFetcher {
    pub fn new(web_port: u16, cache_path: impl Into<PathBuf>) -> Self {
        ArtFetcher {
            client: Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            web_port,
            cache_path: cache_path.into(),
        }
    }

    /// Full download URL for an image URI; absolute URIs pass through
    pub fn resolve_url(&self, host: &str, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return uri.to_string();
        }
        format!("http://{}:{}{}", host, self.web_port, uri)
    }

    /// Art for `album_id`, or a blank background if anything goes wrong
    pub async fn fetch<S: PlaybackSession>(&self, session: &S, album_id: &str) -> Artwork {
        match self.try_fetch(session, album_id).await {
            Ok(img) => {
                debug!("Album art {}x{} for {}", img.width(), img.height(), album_id);
                Artwork::Art(img)
            }
            Err(e) => {
                warn!("No album art, using blank background: {}", e);
                Artwork::Blank
            }
        }
    }

    pub async fn try_fetch<S: PlaybackSession>(&self, session: &S, album_id: &str) -> Result<RgbImage, ArtError> {
        if album_id.is_empty() {
            return Err(ArtError::NoAlbum);
        }

        let images = session.get_images(&[album_id.to_string()]).await?;
        let uri = images
            .get(album_id)
            .and_then(|list| list.first())
            .map(|img| img.uri.clone())
            .ok_or_else(|| ArtError::NoImage(album_id.to_string()))?;

        let url = self.resolve_url(session.host(), &uri);
        info!("Fetching album art {}", url);
        let bytes = self.client.get(&url).send().await?.error_for_status()?.bytes().await?;

        if let Err(e) = tokio::fs::write(&self.cache_path, &bytes).await {
            warn!("Could not cache album art at {}: {}", self.cache_path.display(), e);
        }

        decode_art(&bytes)
    }
}

pub fn decode_art(bytes: &[u8]) -> Result<RgbImage, ArtError> {
    let image = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;
    Ok(image.to_rgb8())
}
