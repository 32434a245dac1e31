//! Single-channel playback: one media channel, one current track

pub mod channel;
pub mod clock;
pub mod controller;

pub use clock::format_clock;
pub use controller::{PlaybackController, TransportState};

#[cfg(test)]
pub(crate) mod testing;
