/*
 *  input/gpio.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pulled-up GPIO buttons with falling-edge interrupts
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

use std::collections::HashSet;
use std::time::Duration;

use log::info;
use rppal::gpio::{Gpio, InputPin, Trigger};

use crate::config::ButtonConfig;
use crate::coordinator::EventSender;
use crate::input::{ButtonHandler, InputError};
use crate::playback::ButtonEvent;

/// The four buttons, armed. Interrupts stay registered while this lives.
pub struct ButtonBank {
    pins: Vec<InputPin>,
}

impl ButtonBank {
    pub fn new(config: &ButtonConfig, events: EventSender) -> Result<Self, InputError> {
        let gpio = Gpio::new()?;
        let window = Duration::from_millis(config.debounce_ms);
        let mut seen = HashSet::new();
        let mut pins = Vec::with_capacity(ButtonEvent::ALL.len());

        for button in ButtonEvent::ALL {
            let bcm = config.pin_for(button);
            if !seen.insert(bcm) {
                return Err(InputError::DuplicatePin(bcm));
            }

            let mut pin = gpio.get(bcm)?.into_input_pullup();
            let mut handler = ButtonHandler::new(button, window, events.clone());
            pin.set_async_interrupt(Trigger::FallingEdge, move |_level| {
                handler.on_edge();
            })?;

            info!("Button {} on BCM {}", button, bcm);
            pins.push(pin);
        }

        Ok(ButtonBank { pins })
    }
}

impl Drop for ButtonBank {
    fn drop(&mut self) {
        for pin in self.pins.iter_mut() {
            pin.clear_async_interrupt().ok();
        }
    }
}
