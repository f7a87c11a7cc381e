/*
 *  coordinator.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Event coordinator - one loop serializing button presses and track
 *  changes into playback commands and screen updates
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

use std::time::Duration;

use log::{debug, error, info, trace, warn};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;

use crate::ctx::Ctx;
use crate::display::compose::Artwork;
use crate::display::error::DisplayError;
use crate::mopidy::SessionError;
use crate::playback::{apply_step, ButtonEvent, PlaybackSession, Volume, VolumeDirection};

pub const HEARTBEAT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Button(ButtonEvent),
    TrackChanged,
    SessionLost,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Ready,
    Rendering,
    AwaitingCommand,
    Terminated,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("display failure: {0}")]
    Display(#[from] DisplayError),
    #[error("lost the Mopidy session")]
    SessionLost,
}

/// Producer handle; safe to use from any thread, never blocks
#[derive(Debug, Clone)]
pub struct EventSender(UnboundedSender<AppEvent>);

impl EventSender {
    /// Queue an event; false once the loop is gone
    pub fn send(&self, event: AppEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// FIFO of everything the loop reacts to
#[derive(Debug)]
pub struct EventQueue {
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        EventQueue { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender(self.tx.clone())
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<AppEvent> {
        self.rx.try_recv().ok()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        EventQueue::new()
    }
}

pub struct Coordinator<S: PlaybackSession> {
    ctx: Ctx<S>,
    queue: EventQueue,
    state: CoordinatorState,
}

impl<S: PlaybackSession> Coordinator<S> {
    pub fn new(ctx: Ctx<S>) -> Self {
        Coordinator {
            ctx,
            queue: EventQueue::new(),
            state: CoordinatorState::Ready,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Handle for buttons, signal handlers and tests
    pub fn events(&self) -> EventSender {
        self.queue.sender()
    }

    /// Drive the loop until `Shutdown`, or until the session or the screen
    /// fails. Dropping the future stops the loop between awaits.
    pub async fn run(&mut self) -> Result<(), CoordinatorError> {
        let tx = self.queue.sender();
        self.ctx.session.on_track_changed(Box::new(move || {
            tx.send(AppEvent::TrackChanged);
        }));
        let tx = self.queue.sender();
        self.ctx.session.on_disconnect(Box::new(move || {
            tx.send(AppEvent::SessionLost);
        }));

        let result = self.event_loop().await;
        self.state = CoordinatorState::Terminated;
        result
    }

    async fn event_loop(&mut self) -> Result<(), CoordinatorError> {
        self.render().await?;

        let mut ticker = tokio::time::interval(HEARTBEAT);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            let event = tokio::select! {
                ev = self.queue.next() => ev,
                _ = ticker.tick() => {
                    trace!("idle ({:?})", self.state);
                    continue;
                }
            };

            match event {
                Some(AppEvent::Button(button)) => self.handle_button(button).await,
                Some(AppEvent::TrackChanged) => self.render().await?,
                Some(AppEvent::SessionLost) => {
                    error!("Mopidy connection lost");
                    return Err(CoordinatorError::SessionLost);
                }
                Some(AppEvent::Shutdown) | None => {
                    info!("Event loop stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Exactly one playback command per press; never renders
    async fn handle_button(&mut self, button: ButtonEvent) {
        self.state = CoordinatorState::AwaitingCommand;
        debug!("Button: {}", button);

        let result = match button.volume_direction() {
            Some(direction) => self.change_volume(direction).await,
            None if button == ButtonEvent::Previous => self.ctx.session.previous().await,
            None => self.ctx.session.next().await,
        };
        if let Err(e) = result {
            error!("{} failed: {}", button, e);
        }

        self.state = CoordinatorState::Ready;
    }

    async fn change_volume(&self, direction: VolumeDirection) -> Result<(), SessionError> {
        let Some(current) = self.ctx.session.get_volume().await? else {
            warn!("Mopidy has no mixer, ignoring volume button");
            return Ok(());
        };
        let target = Volume::clamped(apply_step(current.percent() as i32, direction));
        info!("Volume {} -> {}", current, target);
        self.ctx.session.set_volume(target).await
    }

    /// Current track -> art -> compose -> show, start to finish
    async fn render(&mut self) -> Result<(), CoordinatorError> {
        self.state = CoordinatorState::Rendering;

        let frame = match self.ctx.session.get_current_track().await {
            Ok(Some(track)) => {
                info!("Now playing: {} - {}", track.title, track.artist);
                let art = self.ctx.art.fetch(&self.ctx.session, &track.album_id).await;
                self.ctx.composer.compose(&art, &track.title, &track.artist)
            }
            Ok(None) => {
                info!("Nothing playing");
                self.ctx.composer.compose(&Artwork::Blank, "", "")
            }
            Err(e) => {
                error!("Could not read the current track: {}", e);
                self.state = CoordinatorState::Ready;
                return Ok(());
            }
        };

        self.ctx.sink.show(&frame)?;
        self.state = CoordinatorState::Ready;
        Ok(())
    }

    /// Release the session; call once the loop has stopped
    pub async fn close(&mut self) {
        self.ctx.session.close().await;
        self.state = CoordinatorState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::ArtFetcher;
    use crate::display::compose::FrameComposer;
    use crate::display::drivers::mock::{Journal, MockSink};
    use crate::display::frame::Frame;
    use crate::playback::mock::MockSession;
    use crate::playback::Track;
    use std::sync::Arc;

    fn track(title: &str) -> Track {
        Track {
            id: format!("local:track:{}", title),
            title: title.to_string(),
            artist: "Artist".to_string(),
            album_id: "local:album:1".to_string(),
        }
    }

    fn rig_with(session: MockSession, sink: MockSink) -> Coordinator<MockSession> {
        let cache = std::env::temp_dir().join(format!("pirate-coord-{}.img", std::process::id()));
        let ctx = Ctx::new(session, ArtFetcher::new(1, cache), FrameComposer::default(), Box::new(sink));
        Coordinator::new(ctx)
    }

    fn rig(session: MockSession) -> (Coordinator<MockSession>, MockSink) {
        let sink = MockSink::new();
        (rig_with(session, sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_initial_render_then_shutdown() {
        let session = MockSession::new("127.0.0.1").with_track(track("One"));
        let state = session.state();
        let (mut coordinator, sink) = rig(session);
        assert_eq!(coordinator.state(), CoordinatorState::Ready);

        coordinator.events().send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Terminated);
        assert_eq!(sink.show_count(), 1);

        coordinator.close().await;
        assert!(state.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn test_no_track_shows_blank_frame() {
        let (mut coordinator, sink) = rig(MockSession::new("127.0.0.1"));
        coordinator.events().send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();
        assert_eq!(sink.last_frame(), Some(Frame::blank()));
    }

    #[tokio::test]
    async fn test_track_changes_render_in_order() {
        let journal: Journal = Arc::default();
        let session = MockSession::new("127.0.0.1")
            .with_track(track("One"))
            .with_journal(Arc::clone(&journal));
        let trigger = session.trigger();
        let sink = MockSink::new().with_journal(Arc::clone(&journal));
        let mut coordinator = rig_with(session, sink.clone());
        let events = coordinator.events();

        let driver = async {
            // wait for the loop to register its callback
            while !trigger.track_changed() {
                tokio::task::yield_now().await;
            }
            trigger.track_changed();
            events.send(AppEvent::Shutdown);
        };
        let (result, ()) = tokio::join!(coordinator.run(), driver);
        result.unwrap();

        let one_render = ["get_current_track", "get_images", "show"];
        let expected: Vec<String> = one_render.iter().cycle().take(9).map(|s| s.to_string()).collect();
        assert_eq!(*journal.lock().unwrap(), expected);
        assert_eq!(sink.show_count(), 3);
    }

    #[tokio::test]
    async fn test_volume_button_sets_once() {
        let session = MockSession::new("127.0.0.1").with_volume(Volume::clamped(50));
        let state = session.state();
        let (mut coordinator, sink) = rig(session);

        let events = coordinator.events();
        events.send(AppEvent::Button(ButtonEvent::VolumeUp));
        events.send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.set_volume_calls, vec![Volume::clamped(65)]);
        // buttons never render; only the initial frame was shown
        assert_eq!(sink.show_count(), 1);
    }

    #[tokio::test]
    async fn test_volume_is_clamped_at_the_ends() {
        let session = MockSession::new("127.0.0.1").with_volume(Volume::clamped(95));
        let state = session.state();
        let (mut coordinator, _sink) = rig(session);

        let events = coordinator.events();
        events.send(AppEvent::Button(ButtonEvent::VolumeUp));
        events.send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();
        assert_eq!(state.lock().unwrap().set_volume_calls, vec![Volume::MAX]);

        let session = MockSession::new("127.0.0.1").with_volume(Volume::clamped(10));
        let state = session.state();
        let (mut coordinator, _sink) = rig(session);
        let events = coordinator.events();
        events.send(AppEvent::Button(ButtonEvent::VolumeDown));
        events.send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();
        assert_eq!(state.lock().unwrap().set_volume_calls, vec![Volume::MIN]);
    }

    #[tokio::test]
    async fn test_no_mixer_skips_volume() {
        let session = MockSession::new("127.0.0.1");
        let state = session.state();
        let (mut coordinator, _sink) = rig(session);

        let events = coordinator.events();
        events.send(AppEvent::Button(ButtonEvent::VolumeDown));
        events.send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.volume_queries, 1);
        assert!(state.set_volume_calls.is_empty());
    }

    #[tokio::test]
    async fn test_transport_buttons() {
        let session = MockSession::new("127.0.0.1");
        let state = session.state();
        let (mut coordinator, sink) = rig(session);

        let events = coordinator.events();
        events.send(AppEvent::Button(ButtonEvent::Previous));
        events.send(AppEvent::Button(ButtonEvent::Next));
        events.send(AppEvent::Button(ButtonEvent::Next));
        events.send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.previous_calls, 1);
        assert_eq!(state.next_calls, 2);
        assert_eq!(sink.show_count(), 1);
    }

    #[tokio::test]
    async fn test_track_query_error_keeps_running() {
        let session = MockSession::new("127.0.0.1").with_track(track("One"));
        session.state().lock().unwrap().fail_track_query = true;
        let state = session.state();
        let (mut coordinator, sink) = rig(session);

        let events = coordinator.events();
        events.send(AppEvent::TrackChanged);
        events.send(AppEvent::Button(ButtonEvent::Next));
        events.send(AppEvent::Shutdown);
        coordinator.run().await.unwrap();

        assert_eq!(sink.show_count(), 0);
        let state = state.lock().unwrap();
        assert_eq!(state.track_queries, 2);
        assert_eq!(state.next_calls, 1);
    }

    #[tokio::test]
    async fn test_display_failure_is_fatal() {
        let (mut coordinator, sink) = rig(MockSession::new("127.0.0.1").with_track(track("One")));
        sink.state().lock().unwrap().simulate_show_failure = true;
        coordinator.events().send(AppEvent::Shutdown);

        assert!(matches!(coordinator.run().await, Err(CoordinatorError::Display(_))));
        assert_eq!(coordinator.state(), CoordinatorState::Terminated);
    }

    #[tokio::test]
    async fn test_session_loss_is_fatal() {
        let session = MockSession::new("127.0.0.1");
        let trigger = session.trigger();
        let (mut coordinator, _sink) = rig(session);

        let driver = async {
            while !trigger.disconnect() {
                tokio::task::yield_now().await;
            }
        };
        let (result, ()) = tokio::join!(coordinator.run(), driver);
        assert!(matches!(result, Err(CoordinatorError::SessionLost)));
    }
}
