/*
 *  display/drivers/st7789.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  ST7789 240x240 IPS panel over SPI
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

use std::thread::sleep;
use std::time::Duration;

use log::{debug, info};
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use crate::display::traits::{validate_rotation, DisplayCapabilities, DisplaySink};

// command set
const SWRESET: u8 = 0x01;
const SLPOUT: u8 = 0x11;
const INVON: u8 = 0x21;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;
const PORCTRL: u8 = 0xB2;
const GCTRL: u8 = 0xB7;
const VCOMS: u8 = 0xBB;
const LCMCTRL: u8 = 0xC0;
const VDVVRHEN: u8 = 0xC2;
const VRHS: u8 = 0xC3;
const VDVS: u8 = 0xC4;
const FRCTRL2: u8 = 0xC6;
const PWCTRL1: u8 = 0xD0;
const PVGAMCTRL: u8 = 0xE0;
const NVGAMCTRL: u8 = 0xE1;

/// spidev's default transfer limit
const SPI_CHUNK: usize = 4096;

const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    (MADCTL, &[0x70]),
    (PORCTRL, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    (COLMOD, &[0x05]),
    (GCTRL, &[0x14]),
    (VCOMS, &[0x37]),
    (LCMCTRL, &[0x2C]),
    (VDVVRHEN, &[0x01]),
    (VRHS, &[0x12]),
    (VDVS, &[0x20]),
    (PWCTRL1, &[0xA4, 0xA1]),
    (FRCTRL2, &[0x0F]),
    (PVGAMCTRL, &[0xD0, 0x04, 0x0D, 0x11, 0x13, 0x2B, 0x3F, 0x54, 0x4C, 0x18, 0x0D, 0x0B, 0x1F, 0x23]),
    (NVGAMCTRL, &[0xD0, 0x04, 0x0C, 0x11, 0x13, 0x2C, 0x3F, 0x44, 0x51, 0x2F, 0x1F, 0x1F, 0x20, 0x23]),
    (INVON, &[]),
];

/// ST7789 driver
///
/// Frames are rotated in software before the push; the panel itself stays
/// in one fixed orientation.
pub struct St7789Sink {
    spi: Spi,
    dc: OutputPin,
    backlight: Option<OutputPin>,
    rotation: u16,
    capabilities: DisplayCapabilities,
}

impl St7789Sink {
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        validate_rotation(config.rotate_deg)?;

        let bus = match config.spi_port {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => {
                return Err(DisplayError::InvalidConfiguration(format!("Unsupported SPI port {}", other)));
            }
        };
        let cs = match config.spi_cs {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(DisplayError::InvalidConfiguration(format!("Unsupported chip select {}", other)));
            }
        };

        info!(
            "Opening ST7789 on SPI{}.{} at {} Hz (dc={}, backlight={:?})",
            config.spi_port, config.spi_cs, config.spi_speed_hz, config.dc_pin, config.backlight_pin
        );

        let spi = Spi::new(bus, cs, config.spi_speed_hz, Mode::Mode0)?;
        let gpio = Gpio::new()?;
        let dc = gpio.get(config.dc_pin)?.into_output();
        let backlight = match config.backlight_pin {
            Some(pin) => Some(gpio.get(pin)?.into_output()),
            None => None,
        };

        Ok(St7789Sink {
            spi,
            dc,
            backlight,
            rotation: config.rotate_deg,
            capabilities: DisplayCapabilities {
                width: FRAME_WIDTH,
                height: FRAME_HEIGHT,
                name: "st7789",
            },
        })
    }

    fn command(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.dc.set_low();
        self.spi.write(&[cmd])?;
        Ok(())
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_high();
        for chunk in bytes.chunks(SPI_CHUNK) {
            self.spi.write(chunk)?;
        }
        Ok(())
    }

    fn send(&mut self, cmd: u8, bytes: &[u8]) -> Result<(), DisplayError> {
        self.command(cmd)?;
        if !bytes.is_empty() {
            self.data(bytes)?;
        }
        Ok(())
    }

    /// No-op when the panel has no backlight line
    fn set_backlight(&mut self, on: bool) {
        if let Some(pin) = self.backlight.as_mut() {
            if on { pin.set_high() } else { pin.set_low() }
        }
    }

    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), DisplayError> {
        let [xs_hi, xs_lo] = x0.to_be_bytes();
        let [xe_hi, xe_lo] = x1.to_be_bytes();
        let [ys_hi, ys_lo] = y0.to_be_bytes();
        let [ye_hi, ye_lo] = y1.to_be_bytes();
        self.send(CASET, &[xs_hi, xs_lo, xe_hi, xe_lo])?;
        self.send(RASET, &[ys_hi, ys_lo, ye_hi, ye_lo])?;
        self.command(RAMWR)
    }
}

impl DisplaySink for St7789Sink {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.set_backlight(false);

        self.command(SWRESET)?;
        sleep(Duration::from_millis(150));

        for &(cmd, params) in INIT_SEQUENCE {
            self.send(cmd, params)?;
        }

        self.command(SLPOUT)?;
        self.command(DISPON)?;
        sleep(Duration::from_millis(100));

        self.set_backlight(true);
        info!("ST7789 initialized ({}x{}, rotation {})", FRAME_WIDTH, FRAME_HEIGHT, self.rotation);
        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        let bytes = frame.rotated(self.rotation).to_be_bytes();
        self.set_window(0, 0, FRAME_WIDTH as u16 - 1, FRAME_HEIGHT as u16 - 1)?;
        self.data(&bytes)?;
        debug!("ST7789 frame pushed ({} bytes)", bytes.len());
        Ok(())
    }
}

impl Drop for St7789Sink {
    fn drop(&mut self) {
        self.set_backlight(false);
    }
}
