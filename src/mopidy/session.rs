/*
 *  mopidy/session.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Long-lived Mopidy session: JSON-RPC requests and pushed events over
 *  one WebSocket
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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex as TokMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::mopidy::models::TlTrack;
use crate::mopidy::rpc::{Incoming, JsonRpcRequest, SessionError};
use crate::playback::{ImageLookup, PlaybackSession, SessionCallback, Track, Volume};

/// Default Mopidy HTTP/WebSocket port
pub const DEFAULT_PORT: u16 = 6680;

const TRACK_PLAYBACK_STARTED: &str = "track_playback_started";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Waiter = oneshot::Sender<Result<Value, SessionError>>;
type Pending = Arc<StdMutex<HashMap<u64, Waiter>>>;

#[derive(Default)]
struct Listeners {
    track_changed: Option<SessionCallback>,
    disconnect: Option<SessionCallback>,
}

fn lock<T>(m: &StdMutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mixer reply to a volume; `null` (no mixer) or non-integers give `None`
fn volume_from(result: &Value) -> Option<Volume> {
    result.as_i64().map(|v| Volume::clamped(v.clamp(0, 100) as i32))
}

/// The one connection to the playback provider.
///
/// Requests are written through the shared sink; a background reader task
/// routes replies back to their callers by id and fires the registered
/// callbacks for pushed events.
pub struct MopidySession {
    host: String,
    port: u16,
    next_id: AtomicU64,
    sink: TokMutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    listeners: Arc<StdMutex<Listeners>>,
    reader: Option<JoinHandle<()>>,
}

impl MopidySession {
    /// Open the session at `ws://{host}:{port}/mopidy/ws`.
    pub async fn connect(host: &str, port: u16) -> Result<Self, SessionError> {
        let url = format!("ws://{}:{}/mopidy/ws", host, port);
        info!("Connecting to Mopidy at {}", url);

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|source| SessionError::Connect { url: url.clone(), source })?;
        let (sink, stream) = stream.split();

        let pending: Pending = Arc::new(StdMutex::new(HashMap::new()));
        let listeners = Arc::new(StdMutex::new(Listeners::default()));
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&pending), Arc::clone(&listeners)));

        info!("Mopidy session established");
        Ok(MopidySession {
            host: host.to_string(),
            port,
            next_id: AtomicU64::new(1),
            sink: TokMutex::new(sink),
            pending,
            listeners,
            reader: Some(reader),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Send one request and wait for its reply.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))
            .map_err(SessionError::Serialization)?;

        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        debug!("-> {} (#{})", method, id);
        let sent = self.sink.lock().await.send(Message::Text(body)).await;
        if let Err(e) = sent {
            lock(&self.pending).remove(&id);
            return Err(e.into());
        }

        rx.await.map_err(|_| SessionError::Closed)?
    }
}

async fn read_loop(mut stream: SplitStream<WsStream>, pending: Pending, listeners: Arc<StdMutex<Listeners>>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => dispatch(&text, &pending, &listeners),
            Ok(Message::Close(frame)) => {
                info!("Mopidy closed the session: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Mopidy transport error: {}", e);
                break;
            }
        }
    }

    // dropping the waiters fails every outstanding call with Closed
    lock(&pending).clear();
    if let Some(callback) = lock(&listeners).disconnect.as_ref() {
        callback();
    }
}

fn dispatch(text: &str, pending: &Pending, listeners: &StdMutex<Listeners>) {
    match serde_json::from_str::<Incoming>(text) {
        Ok(Incoming::Event(ev)) if ev.event == TRACK_PLAYBACK_STARTED => {
            debug!("<- event {}", ev.event);
            if let Some(callback) = lock(listeners).track_changed.as_ref() {
                callback();
            }
        }
        Ok(Incoming::Event(ev)) => debug!("Ignoring Mopidy event '{}'", ev.event),
        Ok(Incoming::Response(resp)) => {
            let Some(id) = resp.id else {
                warn!("Mopidy reply without id: {}", text);
                return;
            };
            match lock(pending).remove(&id) {
                Some(waiter) => {
                    let _ = waiter.send(resp.into_result());
                }
                None => debug!("No caller waiting for reply #{}", id),
            }
        }
        Err(e) => warn!("Unparseable message from Mopidy: {}", e),
    }
}

impl PlaybackSession for MopidySession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn get_current_track(&self) -> Result<Option<Track>, SessionError> {
        let result = self.call("core.playback.get_current_tl_track", None).await?;
        if result.is_null() {
            return Ok(None);
        }
        let tl_track: TlTrack = serde_json::from_value(result).map_err(SessionError::Deserialization)?;
        Ok(Some(tl_track.into()))
    }

    async fn get_volume(&self) -> Result<Option<Volume>, SessionError> {
        let result = self.call("core.mixer.get_volume", None).await?;
        Ok(volume_from(&result))
    }

    async fn set_volume(&self, volume: Volume) -> Result<(), SessionError> {
        let accepted = self
            .call("core.mixer.set_volume", Some(json!({ "volume": volume.percent() })))
            .await?;
        if accepted == Value::Bool(false) {
            warn!("Mopidy refused volume {}", volume);
        }
        Ok(())
    }

    async fn previous(&self) -> Result<(), SessionError> {
        self.call("core.playback.previous", None).await.map(|_| ())
    }

    async fn next(&self) -> Result<(), SessionError> {
        self.call("core.playback.next", None).await.map(|_| ())
    }

    async fn get_images(&self, uris: &[String]) -> Result<ImageLookup, SessionError> {
        let result = self.call("core.library.get_images", Some(json!({ "uris": uris }))).await?;
        if result.is_null() {
            return Ok(ImageLookup::new());
        }
        serde_json::from_value(result).map_err(SessionError::Deserialization)
    }

    fn on_track_changed(&mut self, callback: SessionCallback) {
        lock(&self.listeners).track_changed = Some(callback);
    }

    fn on_disconnect(&mut self, callback: SessionCallback) {
        lock(&self.listeners).disconnect = Some(callback);
    }

    async fn close(&mut self) {
        // stop reading first so a deliberate close is not reported as a lost session
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Err(e) = self.sink.lock().await.close().await {
            debug!("Error closing Mopidy session: {}", e);
        }
        lock(&self.pending).clear();
        info!("Mopidy session closed");
    }
}

impl Drop for MopidySession {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            debug!("MopidySession dropped, stopping reader task");
            reader.abort();
        }
    }
}
