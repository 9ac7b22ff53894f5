//! Local capture and playback devices.
//!
//! The assistant only sees these traits. A device is acquired with `open`
//! (which is where permission is refused) and released with `stop`/`close`.

pub mod camera;
pub mod mirror;
pub mod wav;

pub use camera::DirectoryCamera;
pub use mirror::mirror_jpeg;
pub use wav::{WavMicrophone, WavRecorder};

use async_trait::async_trait;

use crate::error::MediaError;

/// Source of microphone streams.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Acquire the microphone, producing mono audio at `sample_rate`.
    async fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioInput>, MediaError>;
}

/// A live microphone stream.
#[async_trait]
pub trait AudioInput: Send {
    /// Next block of samples in `[-1.0, 1.0]`. `None` once the stream ends.
    async fn next_frame(&mut self) -> Option<Vec<f32>>;

    /// Stop capturing and release the device.
    fn stop(&mut self);
}

/// Source of camera streams.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Acquire the camera.
    async fn open(&self) -> Result<Box<dyn CameraStream>, MediaError>;
}

/// A live camera stream.
#[async_trait]
pub trait CameraStream: Send {
    /// Grab one still frame as JPEG bytes.
    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, MediaError>;

    /// Stop capturing and release the device.
    fn stop(&mut self);
}

/// Source of playback devices.
pub trait AudioOutput: Send + Sync {
    /// Open an output running at `sample_rate`. Its clock starts at zero.
    fn open(&self, sample_rate: u32) -> Result<Box<dyn PlaybackDevice>, MediaError>;
}

/// An open playback device with its own clock.
pub trait PlaybackDevice: Send {
    /// Seconds on the device clock.
    fn current_time(&self) -> f64;

    /// Queue `samples` to start at `start` seconds on the device clock.
    fn play_at(&mut self, samples: &[i16], start: f64) -> Result<(), MediaError>;

    /// Stop playback and release the device.
    fn close(&mut self) -> Result<(), MediaError>;
}
