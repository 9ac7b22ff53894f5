//! Camera backed by a directory of JPEG stills.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::error::{MediaDevice, MediaError};

use super::{Camera, CameraStream};

/// Serves the `.jpg`/`.jpeg` files of a directory in name order, cycling.
pub struct DirectoryCamera {
    dir: PathBuf,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Camera for DirectoryCamera {
    async fn open(&self) -> Result<Box<dyn CameraStream>, MediaError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| MediaError::Unavailable {
                device: MediaDevice::Camera,
                reason: format!("{}: {e}", self.dir.display()),
            })?;

        let mut frames = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
            if is_jpeg {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(MediaError::Unavailable {
                device: MediaDevice::Camera,
                reason: format!("no JPEG frames in {}", self.dir.display()),
            });
        }

        info!(dir = %self.dir.display(), frames = frames.len(), "Camera opened");
        Ok(Box::new(DirectoryStream {
            frames,
            next: 0,
            stopped: false,
        }))
    }
}

struct DirectoryStream {
    frames: Vec<PathBuf>,
    next: usize,
    stopped: bool,
}

#[async_trait]
impl CameraStream for DirectoryStream {
    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, MediaError> {
        if self.stopped {
            return Err(MediaError::Unavailable {
                device: MediaDevice::Camera,
                reason: "camera stopped".to_string(),
            });
        }
        let path = &self.frames[self.next % self.frames.len()];
        self.next += 1;
        Ok(tokio::fs::read(path).await?)
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
