use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use crate::{
    domain::track::{Track, TrackId},
    playback::{
        channel::{ChannelEvent, ChannelEventKind, MediaChannel, SourceId},
        clock::format_clock,
    },
};

/// Observable transport state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportState {
    pub current_track: Option<TrackId>,
    pub is_playing: bool,
    /// seconds
    pub position: f64,
    /// seconds, 0 while unknown
    pub duration: f64,
    /// 0..=1
    pub volume: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
        }
    }
}

impl TransportState {
    /// `position / duration` as shown next to the transport controls
    pub fn clock_label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position),
            format_clock(self.duration)
        )
    }
}

/// Drives one media channel and mirrors its events into `TransportState`.
///
/// Selecting a different track preempts the current one immediately.
/// Events still in flight for a preempted source are discarded.
pub struct PlaybackController<C> {
    channel: C,
    state: TransportState,
    source: Option<SourceId>,
    observers: Vec<Sender<TransportState>>,
}

impl<C: MediaChannel> PlaybackController<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: TransportState::default(),
            source: None,
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Receives a snapshot after every state change
    pub fn subscribe(&mut self) -> Receiver<TransportState> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    /// Selecting the current track toggles play/pause, any other track
    /// replaces it and starts from the beginning.
    pub fn select(&mut self, track: &Track) {
        if self.state.current_track == Some(track.id) {
            self.toggle_play_pause();
            return;
        }

        let Some(url) = track.public_url.as_deref() else {
            log::warn!("track {} has no public url, cannot play it", track.id);
            return;
        };

        self.source = Some(self.channel.set_source(url));
        self.channel.set_volume(self.state.volume);
        self.channel.set_current_time(0.0);
        self.channel.play();

        self.state.current_track = Some(track.id);
        self.state.is_playing = true;
        self.state.position = 0.0;
        self.state.duration = 0.0;
        log::debug!("playing track {}", track.id);
        self.notify();
    }

    pub fn toggle_play_pause(&mut self) {
        if self.state.current_track.is_none() {
            return;
        }

        if self.channel.is_paused() {
            self.channel.play();
            self.state.is_playing = true;
        } else {
            self.channel.pause();
            self.state.is_playing = false;
        }
        self.notify();
    }

    pub fn seek(&mut self, target: f64) {
        if self.state.current_track.is_none() {
            return;
        }

        self.channel.set_current_time(target);
        self.state.position = target;
        self.notify();
    }

    /// Moves by `delta` seconds, clamped to the known media bounds
    pub fn jump(&mut self, delta: f64) {
        // metadata event may not have been drained yet, so ask the channel too
        let upper = Some(self.state.duration)
            .filter(|d| *d > 0.0)
            .or_else(|| self.channel.duration().filter(|d| d.is_finite() && *d > 0.0))
            .unwrap_or(f64::INFINITY);
        let target = (self.channel.current_time() + delta).clamp(0.0, upper);
        self.seek(target);
    }

    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.channel.set_volume(volume);
        self.state.volume = volume;
        self.notify();
    }

    /// Applies one channel event, returns false when it belonged to a replaced source
    pub fn handle_event(&mut self, event: ChannelEvent) -> bool {
        if self.source != Some(event.source) {
            log::debug!("dropping {:?} from stale source {:?}", event.kind, event.source);
            return false;
        }

        match event.kind {
            ChannelEventKind::TimeUpdate(position) => self.state.position = position,
            ChannelEventKind::MetadataLoaded(duration) => {
                self.state.duration = if duration.is_finite() { duration } else { 0.0 };
            }
            // no auto-advance, position stays where the media ended
            ChannelEventKind::Ended => self.state.is_playing = false,
        }
        self.notify();
        true
    }

    /// Applies every pending event without blocking, returns how many were applied
    pub fn drain(&mut self, events: &Receiver<ChannelEvent>) -> usize {
        let pending: Vec<_> = events.try_iter().collect();
        pending
            .into_iter()
            .filter(|event| self.handle_event(*event))
            .count()
    }

    fn notify(&mut self) {
        let snapshot = self.state.clone();
        self.observers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
