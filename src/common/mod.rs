pub mod frame;
pub mod geometry;
pub mod source;

pub use frame::Frame;
pub use geometry::{FaceBox, Landmarks};
pub use source::{FramePublisher, FrameSource, LatestFrameSource, StillImageSource};
