//! The physical audio channel the controller drives

/// Identifies one `set_source` call. Events carry the source they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceId(pub u64);

impl SourceId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelEventKind {
    /// Playback advanced, carries the new position in seconds
    TimeUpdate(f64),
    /// Media metadata is known, carries the duration in seconds
    MetadataLoaded(f64),
    /// Reached the end of the media
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelEvent {
    pub source: SourceId,
    pub kind: ChannelEventKind,
}

impl ChannelEvent {
    pub fn new(source: SourceId, kind: ChannelEventKind) -> Self {
        Self { source, kind }
    }
}

pub trait MediaChannel {
    /// Starts loading a new source, abandoning the previous one
    fn set_source(&mut self, url: &str) -> SourceId;

    fn set_volume(&mut self, volume: f64);

    fn set_current_time(&mut self, seconds: f64);

    fn current_time(&self) -> f64;

    /// `None` while the duration is not known yet
    fn duration(&self) -> Option<f64>;

    fn is_paused(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);
}
