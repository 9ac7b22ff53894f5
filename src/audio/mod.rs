//! Audio plumbing shared by the microphone pump and the playback scheduler.

pub mod pcm;
pub mod playback;

pub use pcm::{AudioChunk, AudioFragment};
pub use playback::{PlaybackScheduler, ScheduledFragment};

/// Sample rate of microphone audio sent to the realtime endpoint.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;
/// Sample rate of synthesized speech received from the realtime endpoint.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
/// Samples per microphone frame.
pub const INPUT_FRAME_SAMPLES: usize = 4096;
