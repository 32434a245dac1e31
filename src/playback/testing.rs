//! Scripted media channel. Playback time only moves when it is set.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::playback::channel::{ChannelEvent, ChannelEventKind, MediaChannel, SourceId};

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    SetSource(String),
    SetVolume(f64),
    SetCurrentTime(f64),
    Play,
    Pause,
}

#[derive(Debug)]
pub struct FakeChannel {
    pub calls: Vec<ChannelCall>,
    pub source_id: SourceId,
    pub volume: f64,
    pub time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    events: Sender<ChannelEvent>,
}

impl FakeChannel {
    pub fn new() -> (Self, Receiver<ChannelEvent>) {
        let (events, rx) = mpsc::channel();
        let channel = Self {
            calls: Vec::new(),
            source_id: SourceId::default(),
            volume: 1.0,
            time: 0.0,
            duration: None,
            paused: true,
            events,
        };
        (channel, rx)
    }

    /// Emits an event for the current source
    pub fn emit(&self, kind: ChannelEventKind) {
        self.events
            .send(ChannelEvent::new(self.source_id, kind))
            .unwrap();
    }
}

impl MediaChannel for FakeChannel {
    fn set_source(&mut self, url: &str) -> SourceId {
        self.calls.push(ChannelCall::SetSource(url.to_string()));
        self.source_id = self.source_id.next();
        self.time = 0.0;
        self.duration = None;
        self.paused = true;
        self.source_id
    }

    fn set_volume(&mut self, volume: f64) {
        self.calls.push(ChannelCall::SetVolume(volume));
        self.volume = volume;
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.calls.push(ChannelCall::SetCurrentTime(seconds));
        self.time = seconds;
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) {
        self.calls.push(ChannelCall::Play);
        self.paused = false;
    }

    fn pause(&mut self) {
        self.calls.push(ChannelCall::Pause);
        self.paused = true;
    }
}
