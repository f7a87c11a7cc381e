/*
 *  display/drivers/preview.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Preview sink - writes each frame to a PNG for desktop use
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

use std::path::PathBuf;

use image::ImageFormat;
use log::{debug, info};

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use crate::display::traits::{validate_rotation, DisplayCapabilities, DisplaySink};

/// Stand-in for the panel: every frame overwrites one PNG file
pub struct PreviewSink {
    path: PathBuf,
    rotation: u16,
    capabilities: DisplayCapabilities,
}

impl PreviewSink {
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        validate_rotation(config.rotate_deg)?;
        Ok(PreviewSink {
            path: config.preview_path.clone(),
            rotation: config.rotate_deg,
            capabilities: DisplayCapabilities {
                width: FRAME_WIDTH,
                height: FRAME_HEIGHT,
                name: "preview",
            },
        })
    }
}

impl DisplaySink for PreviewSink {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.is_dir() {
                return Err(DisplayError::InitializationFailed(format!(
                    "preview directory {} does not exist",
                    dir.display()
                )));
            }
        }
        info!("Preview frames go to {}", self.path.display());
        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let img = frame.rotated(self.rotation).to_rgb_image();
        img.save_with_format(&self.path, ImageFormat::Png)?;
        debug!("Preview written to {}", self.path.display());
        Ok(())
    }
}
