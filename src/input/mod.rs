/*
 *  input/mod.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Button input - debounce and hand-off into the event queue
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

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::ButtonConfig;
use crate::coordinator::{AppEvent, EventSender};
use crate::playback::ButtonEvent;

#[cfg(feature = "hardware")]
pub mod gpio;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum InputError {
    #[cfg(feature = "hardware")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("button pin {0} is assigned twice")]
    DuplicatePin(u8),
    #[error("buttons need the `hardware` feature; rebuild with --features hardware or set buttons.enabled: false")]
    Unsupported,
}

/// Drops edges that land within `window` of the last accepted edge
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer { window, last: None }
    }

    /// True if the edge at `now` counts as a new press
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// One logical button: debounces its edges and posts the mapped event
pub struct ButtonHandler {
    button: ButtonEvent,
    debouncer: Debouncer,
    events: EventSender,
}

impl ButtonHandler {
    pub fn new(button: ButtonEvent, window: Duration, events: EventSender) -> Self {
        ButtonHandler {
            button,
            debouncer: Debouncer::new(window),
            events,
        }
    }

    /// Falling edge seen now
    pub fn on_edge(&mut self) -> bool {
        self.on_edge_at(Instant::now())
    }

    /// Falling edge seen at `now`; returns whether an event was queued.
    ///
    /// Runs on the interrupt thread, so it only enqueues.
    pub fn on_edge_at(&mut self, now: Instant) -> bool {
        if !self.debouncer.accept(now) {
            debug!("Button {} bounce dropped", self.button);
            return false;
        }
        if !self.events.send(AppEvent::Button(self.button)) {
            warn!("Button {} pressed after shutdown", self.button);
            return false;
        }
        true
    }
}

/// Keeps the button interrupts armed while alive
pub struct Buttons {
    #[cfg(feature = "hardware")]
    _bank: gpio::ButtonBank,
}

/// Arm the configured buttons; `None` when they are switched off
pub fn start(config: &ButtonConfig, events: EventSender) -> Result<Option<Buttons>, InputError> {
    if !config.enabled {
        info!("Buttons disabled");
        return Ok(None);
    }

    #[cfg(feature = "hardware")]
    {
        let bank = gpio::ButtonBank::new(config, events)?;
        Ok(Some(Buttons { _bank: bank }))
    }

    #[cfg(not(feature = "hardware"))]
    {
        drop(events);
        Err(InputError::Unsupported)
    }
}
