/*
 *  display/factory.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display sink factory - picks a driver from configuration
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

use log::info;

use crate::config::{DisplayConfig, DriverKind};
use crate::display::drivers::preview::PreviewSink;
use crate::display::error::DisplayError;
use crate::display::traits::BoxedSink;

#[cfg(feature = "hardware")]
use crate::display::drivers::st7789::St7789Sink;

/// Factory for creating display sinks from configuration
pub struct DisplaySinkFactory;

impl DisplaySinkFactory {
    /// Create and initialize the configured sink
    ///
    /// Any failure here is a startup failure; the caller exits.
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedSink, DisplayError> {
        let mut sink: BoxedSink = match config.driver {
            #[cfg(feature = "hardware")]
            DriverKind::St7789 => Box::new(St7789Sink::new(config)?),

            #[cfg(not(feature = "hardware"))]
            DriverKind::St7789 => {
                return Err(DisplayError::InvalidConfiguration(
                    "ST7789 driver not enabled. Enable with --features hardware".to_string()
                ));
            }

            DriverKind::Preview => Box::new(PreviewSink::new(config)?),
        };

        sink.init()?;
        let (width, height) = sink.dimensions();
        info!("Display sink ready: {} ({}x{})", sink.capabilities().name, width, height);
        Ok(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_preview() {
        let config = DisplayConfig {
            driver: DriverKind::Preview,
            preview_path: std::env::temp_dir().join("pirate-factory.png"),
            ..Default::default()
        };
        let sink = DisplaySinkFactory::create_from_config(&config).unwrap();
        assert_eq!(sink.capabilities().name, "preview");
        assert_eq!(sink.dimensions(), (240, 240));
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_factory_refuses_st7789_without_hardware() {
        let config = DisplayConfig::default();
        assert!(matches!(
            DisplaySinkFactory::create_from_config(&config),
            Err(DisplayError::InvalidConfiguration(_))
        ));
    }
}
