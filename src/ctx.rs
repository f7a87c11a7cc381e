/*
 *  ctx.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *  (c) 2020-26 Stuart Hunter
 *
 *  Everything the event loop owns
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

use crate::art::ArtFetcher;
use crate::display::compose::FrameComposer;
use crate::display::traits::BoxedSink;
use crate::playback::PlaybackSession;

/// One per process: the session, the art cache and the screen
pub struct Ctx<S: PlaybackSession> {
    pub session: S,
    pub art: ArtFetcher,
    pub composer: FrameComposer,
    pub sink: BoxedSink,
}

impl<S: PlaybackSession> Ctx<S> {
    pub fn new(session: S, art: ArtFetcher, composer: FrameComposer, sink: BoxedSink) -> Self {
        Ctx { session, art, composer, sink }
    }
}
