/*
 *  playback/mock.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory playback session for tests
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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::display::drivers::mock::Journal;
use crate::mopidy::SessionError;
use crate::playback::{ImageLookup, PlaybackSession, SessionCallback, Track, Volume};

/// Scripted server state plus a record of every call made
#[derive(Debug, Default)]
pub struct MockSessionState {
    pub track: Option<Track>,
    /// `None` means no mixer
    pub volume: Option<Volume>,
    pub images: ImageLookup,

    pub track_queries: usize,
    pub volume_queries: usize,
    pub image_queries: usize,
    pub set_volume_calls: Vec<Volume>,
    pub previous_calls: usize,
    pub next_calls: usize,
    pub closed: bool,

    /// Simulate failures (for error testing)
    pub fail_track_query: bool,
    pub fail_images: bool,
}

#[derive(Default)]
struct Callbacks {
    track_changed: Option<SessionCallback>,
    disconnect: Option<SessionCallback>,
}

/// Lets a test play the server's part after the session has been moved
/// into the coordinator
#[derive(Clone)]
pub struct MockTrigger {
    callbacks: Arc<Mutex<Callbacks>>,
}

impl MockTrigger {
    /// Push a track_playback_started notification; false if nobody listens
    pub fn track_changed(&self) -> bool {
        match &lock(&self.callbacks).track_changed {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    /// Drop the transport
    pub fn disconnect(&self) -> bool {
        match lock(&self.callbacks).disconnect.take() {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }
}

pub struct MockSession {
    host: String,
    state: Arc<Mutex<MockSessionState>>,
    callbacks: Arc<Mutex<Callbacks>>,
    journal: Option<Journal>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockSession {
    pub fn new(host: &str) -> Self {
        MockSession {
            host: host.to_string(),
            state: Arc::new(Mutex::new(MockSessionState::default())),
            callbacks: Arc::default(),
            journal: None,
        }
    }

    /// Also append each call to a shared journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_track(self, track: Track) -> Self {
        lock(&self.state).track = Some(track);
        self
    }

    pub fn with_volume(self, volume: Volume) -> Self {
        lock(&self.state).volume = Some(volume);
        self
    }

    pub fn with_images(self, images: ImageLookup) -> Self {
        lock(&self.state).images = images;
        self
    }

    pub fn state(&self) -> Arc<Mutex<MockSessionState>> {
        Arc::clone(&self.state)
    }

    pub fn trigger(&self) -> MockTrigger {
        MockTrigger { callbacks: Arc::clone(&self.callbacks) }
    }

    fn note(&self, entry: String) {
        if let Some(journal) = &self.journal {
            lock(journal).push(entry);
        }
    }
}

impl PlaybackSession for MockSession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn get_current_track(&self) -> Result<Option<Track>, SessionError> {
        self.note("get_current_track".to_string());
        // let other producers run, as a real round trip would
        tokio::task::yield_now().await;
        let mut state = lock(&self.state);
        state.track_queries += 1;
        if state.fail_track_query {
            return Err(SessionError::Rpc { code: -32000, message: "simulated failure".to_string() });
        }
        Ok(state.track.clone())
    }

    async fn get_volume(&self) -> Result<Option<Volume>, SessionError> {
        self.note("get_volume".to_string());
        let mut state = lock(&self.state);
        state.volume_queries += 1;
        Ok(state.volume)
    }

    async fn set_volume(&self, volume: Volume) -> Result<(), SessionError> {
        self.note(format!("set_volume {}", volume.percent()));
        let mut state = lock(&self.state);
        state.set_volume_calls.push(volume);
        state.volume = Some(volume);
        Ok(())
    }

    async fn previous(&self) -> Result<(), SessionError> {
        self.note("previous".to_string());
        lock(&self.state).previous_calls += 1;
        Ok(())
    }

    async fn next(&self) -> Result<(), SessionError> {
        self.note("next".to_string());
        lock(&self.state).next_calls += 1;
        Ok(())
    }

    async fn get_images(&self, uris: &[String]) -> Result<ImageLookup, SessionError> {
        self.note("get_images".to_string());
        let mut state = lock(&self.state);
        state.image_queries += 1;
        if state.fail_images {
            return Err(SessionError::Closed);
        }
        Ok(state
            .images
            .iter()
            .filter(|(uri, _)| uris.contains(uri))
            .map(|(uri, imgs)| (uri.clone(), imgs.clone()))
            .collect())
    }

    fn on_track_changed(&mut self, callback: SessionCallback) {
        lock(&self.callbacks).track_changed = Some(callback);
    }

    fn on_disconnect(&mut self, callback: SessionCallback) {
        lock(&self.callbacks).disconnect = Some(callback);
    }

    async fn close(&mut self) {
        self.note("close".to_string());
        lock(&self.state).closed = true;
    }
}
