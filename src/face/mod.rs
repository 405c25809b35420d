//! Face presence and geometry.
//!
//! Detection itself is an external capability: implement [`FaceLocator`] for
//! whatever backend the device ships with. This module only smooths its output
//! and crops frames to the detected region.

pub mod smoothing;

pub use smoothing::SmoothedFaceLocator;

use crate::common::{FaceBox, Frame, Landmarks};
use crate::error::FaceLocatorError;

/// Pluggable face detection backend.
pub trait FaceLocator: Send {
    /// `Ok(None)` means "no face in this frame", which is not an error.
    /// `Err(FaceLocatorError::Unavailable)` means the backend cannot work at
    /// all and quality gating should be bypassed.
    fn locate(&mut self, frame: &Frame) -> Result<Option<Landmarks>, FaceLocatorError>;

    fn name(&self) -> &'static str;
}

impl<L: FaceLocator + ?Sized> FaceLocator for Box<L> {
    fn locate(&mut self, frame: &Frame) -> Result<Option<Landmarks>, FaceLocatorError> {
        (**self).locate(frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Crops `frame` to `bounds` grown by `margin`, clamped to the frame.
/// Returns the original frame when the region would be empty.
pub fn crop_to_face(frame: &Frame, bounds: &FaceBox, margin: f32) -> Frame {
    let (x, y, w, h) = bounds.padded(margin).to_pixels(frame.width(), frame.height());
    if w == 0 || h == 0 {
        return frame.clone();
    }
    let cropped = frame.image().crop_imm(x, y, w, h);
    Frame::new(cropped, frame.captured_at())
}
