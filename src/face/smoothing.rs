use std::collections::VecDeque;

use crate::common::{FaceBox, Frame, Landmarks};
use crate::error::FaceLocatorError;
use crate::face::FaceLocator;

/// Averages face boxes over a short sliding window to damp detector jitter.
/// A frame without a face empties the window.
pub struct SmoothedFaceLocator<L> {
    inner: L,
    history: VecDeque<FaceBox>,
    window_size: usize,
}

impl<L: FaceLocator> SmoothedFaceLocator<L> {
    pub fn new(inner: L, window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            inner,
            history: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    pub fn into_inner(self) -> L {
        self.inner
    }

    fn averaged(&self) -> Option<FaceBox> {
        let n = self.history.len() as f32;
        if n == 0.0 {
            return None;
        }
        let sum = self
            .history
            .iter()
            .fold(FaceBox::new(0.0, 0.0, 0.0, 0.0), |acc, b| {
                FaceBox::new(
                    acc.x + b.x,
                    acc.y + b.y,
                    acc.width + b.width,
                    acc.height + b.height,
                )
            });
        Some(FaceBox::new(sum.x / n, sum.y / n, sum.width / n, sum.height / n))
    }
}

impl<L: FaceLocator> FaceLocator for SmoothedFaceLocator<L> {
    fn locate(&mut self, frame: &Frame) -> Result<Option<Landmarks>, FaceLocatorError> {
        let Some(mut landmarks) = self.inner.locate(frame)? else {
            self.history.clear();
            return Ok(None);
        };

        if self.history.len() >= self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(landmarks.bounds);

        if let Some(bounds) = self.averaged() {
            landmarks.bounds = bounds;
        }
        Ok(Some(landmarks))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
