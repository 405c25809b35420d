use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use tokio::sync::watch;

use crate::common::frame::Frame;
use crate::error::AppError;

/// Wraps a live capture device and hands out its current frame.
pub trait FrameSource: Send + Sync {
    /// `None` while the device has not produced anything yet.
    fn current_frame(&self) -> Option<Frame>;
}

/// Latest-value slot a camera driver publishes into. Readers always see the
/// most recent frame; older frames are dropped.
#[derive(Clone)]
pub struct LatestFrameSource {
    rx: watch::Receiver<Option<Frame>>,
}

#[derive(Clone)]
pub struct FramePublisher {
    tx: Arc<watch::Sender<Option<Frame>>>,
}

impl LatestFrameSource {
    pub fn channel() -> (FramePublisher, LatestFrameSource) {
        let (tx, rx) = watch::channel(None);
        (FramePublisher { tx: Arc::new(tx) }, LatestFrameSource { rx })
    }
}

impl FramePublisher {
    pub fn publish(&self, image: DynamicImage) {
        self.tx.send_replace(Some(Frame::new(image, Utc::now())));
    }

    /// Signals that the camera went away; subsequent ticks skip.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl FrameSource for LatestFrameSource {
    fn current_frame(&self) -> Option<Frame> {
        self.rx.borrow().clone()
    }
}

/// Serves a single still image as every frame. Used for kiosk bring-up
/// without a camera attached.
pub struct StillImageSource {
    image: Arc<DynamicImage>,
}

impl StillImageSource {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let image = image::open(path)?;
        Ok(Self::new(image))
    }
}

impl FrameSource for StillImageSource {
    fn current_frame(&self) -> Option<Frame> {
        Some(Frame::from_shared(self.image.clone(), Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_source_is_empty_until_published() {
        let (publisher, source) = LatestFrameSource::channel();
        assert!(source.current_frame().is_none());

        publisher.publish(DynamicImage::new_rgb8(8, 6));
        let frame = source.current_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));

        publisher.clear();
        assert!(source.current_frame().is_none());
    }

    #[test]
    fn still_source_issues_fresh_frame_ids() {
        let source = StillImageSource::new(DynamicImage::new_rgb8(4, 4));
        let a = source.current_frame().unwrap();
        let b = source.current_frame().unwrap();
        assert_ne!(a.frame_id(), b.frame_id());
    }
}
