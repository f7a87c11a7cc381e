/*
 *  display/drivers/mock.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display sink for testing without hardware
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

use std::sync::{Arc, Mutex};

use crate::display::error::DisplayError;
use crate::display::frame::{Frame, FRAME_HEIGHT, FRAME_WIDTH};
use crate::display::traits::{DisplayCapabilities, DisplaySink};

/// Shared, ordered record of what happened, for tests that interleave
/// several fakes
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Mock display sink
///
/// Records every frame it is shown. The state lives behind an `Arc` so a
/// test can keep a handle after the sink has been boxed and moved into the
/// coordinator.
#[derive(Debug, Clone)]
pub struct MockSink {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockSinkState>>,
    journal: Option<Journal>,
}

/// Internal state for the mock sink (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockSinkState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of successful show() calls
    pub show_count: usize,

    /// Every frame shown, oldest first
    pub frames: Vec<Frame>,

    /// Simulate failures (for error testing)
    pub simulate_show_failure: bool,
}

impl MockSink {
    pub fn new() -> Self {
        MockSink {
            capabilities: DisplayCapabilities {
                width: FRAME_WIDTH,
                height: FRAME_HEIGHT,
                name: "mock",
            },
            state: Arc::new(Mutex::new(MockSinkState::default())),
            journal: None,
        }
    }

    /// Also append "show" to a shared journal on every frame
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockSinkState>> {
        Arc::clone(&self.state)
    }

    pub fn show_count(&self) -> usize {
        self.lock().show_count
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.lock().frames.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockSinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockSink {
    fn default() -> Self {
        MockSink::new()
    }
}

impl DisplaySink for MockSink {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.lock().init_count += 1;
        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        {
            let mut state = self.lock();
            if state.simulate_show_failure {
                return Err(DisplayError::Other("Simulated show failure".to_string()));
            }
            state.show_count += 1;
            state.frames.push(frame.clone());
        } // release before touching the journal

        if let Some(journal) = &self.journal {
            journal.lock().unwrap_or_else(|e| e.into_inner()).push("show".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_records_frames() {
        let mut sink = MockSink::new();
        let state = sink.state();

        sink.init().unwrap();
        sink.show(&Frame::blank()).unwrap();
        sink.show(&Frame::blank()).unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.init_count, 1);
        assert_eq!(state.show_count, 2);
        assert_eq!(state.frames.len(), 2);
    }

    #[test]
    fn test_mock_sink_simulated_failure() {
        let mut sink = MockSink::new();

        sink.state().lock().unwrap().simulate_show_failure = true;
        assert!(sink.show(&Frame::blank()).is_err());
        assert_eq!(sink.show_count(), 0);

        sink.state().lock().unwrap().simulate_show_failure = false;
        assert!(sink.show(&Frame::blank()).is_ok());
        assert_eq!(sink.show_count(), 1);
    }

    #[test]
    fn test_mock_sink_journal() {
        let journal: Journal = Arc::default();
        let mut sink = MockSink::new().with_journal(Arc::clone(&journal));
        sink.show(&Frame::blank()).unwrap();
        assert_eq!(*journal.lock().unwrap(), vec!["show".to_string()]);
    }
}
