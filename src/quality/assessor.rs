use tokio::time::Instant;

use crate::common::{Frame, Landmarks};
use crate::config::QualityThresholds;
use crate::quality::lighting;
use crate::quality::report::{QualityReport, QualitySignal, SignalKind};
use crate::quality::stability::{GateState, StabilityTracker};
use std::time::Duration;

/// Classifies a frame into lighting/pose/distance signals and tracks how long
/// all three have held together. Pure with respect to UI.
#[derive(Debug)]
pub struct QualityAssessor {
    thresholds: QualityThresholds,
    stability: StabilityTracker,
}

impl QualityAssessor {
    pub fn new(thresholds: QualityThresholds, stability_window: Duration) -> Self {
        Self {
            thresholds,
            stability: StabilityTracker::new(stability_window),
        }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    pub fn assess_lighting(&self, frame: &Frame) -> QualitySignal {
        let Some(stats) = lighting::measure(frame.image(), self.thresholds.sample_step) else {
            return QualitySignal::fail(SignalKind::Lighting, "Camera is not ready");
        };

        let t = &self.thresholds;
        if stats.mean <= t.min_brightness {
            QualitySignal::fail(SignalKind::Lighting, "Too dark, please add more light")
        } else if stats.mean >= t.max_brightness {
            QualitySignal::fail(SignalKind::Lighting, "Too bright, please avoid direct light")
        } else if stats.std_dev <= t.min_contrast {
            QualitySignal::fail(SignalKind::Lighting, "Image looks flat, check the lighting")
        } else {
            QualitySignal::pass(SignalKind::Lighting)
        }
    }

    // Head-pose estimation belongs to the face locator; a landmark set is enough here.
    pub fn assess_pose(&self, landmarks: Option<&Landmarks>) -> QualitySignal {
        match landmarks {
            Some(_) => QualitySignal::pass(SignalKind::Pose),
            None => QualitySignal::fail(SignalKind::Pose, "No face detected"),
        }
    }

    pub fn assess_distance(&self, landmarks: Option<&Landmarks>) -> QualitySignal {
        let Some(landmarks) = landmarks else {
            return QualitySignal::fail(SignalKind::Distance, "No face detected");
        };

        let fraction = landmarks.bounds.area_fraction();
        if fraction < self.thresholds.min_face_fraction {
            QualitySignal::fail(SignalKind::Distance, "Please move closer to the camera")
        } else if fraction > self.thresholds.max_face_fraction {
            QualitySignal::fail(SignalKind::Distance, "Please move back from the camera")
        } else {
            QualitySignal::pass(SignalKind::Distance)
        }
    }

    pub fn update_stability(&mut self, all_green: bool, now: Instant) -> GateState {
        self.stability.update(all_green, now)
    }

    /// Measures all three signals and advances the stability window.
    pub fn assess(
        &mut self,
        frame: &Frame,
        landmarks: Option<&Landmarks>,
        now: Instant,
    ) -> QualityReport {
        let lighting = self.assess_lighting(frame);
        let pose = self.assess_pose(landmarks);
        let distance = self.assess_distance(landmarks);
        let all_green = lighting.passed && pose.passed && distance.passed;
        let state = self.update_stability(all_green, now);

        QualityReport {
            lighting,
            pose,
            distance,
            state,
        }
    }

    pub fn state(&self) -> GateState {
        self.stability.state()
    }

    pub fn reset(&mut self) {
        self.stability.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FaceBox;
    use chrono::Utc;
    use image::{DynamicImage, ImageBuffer, Rgb};

    fn textured_frame(base: u8, amplitude: u8) -> Frame {
        let img = ImageBuffer::from_fn(64, 64, |x, y| {
            let v = if (x / 4 + y / 4) % 2 == 0 {
                base.saturating_add(amplitude)
            } else {
                base.saturating_sub(amplitude)
            };
            Rgb([v, v, v])
        });
        Frame::new(DynamicImage::ImageRgb8(img), Utc::now())
    }

    fn assessor() -> QualityAssessor {
        QualityAssessor::new(QualityThresholds::default(), Duration::from_millis(500))
    }

    #[test]
    fn lighting_requires_mid_band_and_contrast() {
        let a = assessor();
        assert!(a.assess_lighting(&textured_frame(140, 40)).passed);
        assert!(!a.assess_lighting(&textured_frame(40, 20)).passed);
        assert!(!a.assess_lighting(&textured_frame(230, 20)).passed);
        assert!(!a.assess_lighting(&textured_frame(140, 0)).passed);
    }

    #[test]
    fn lighting_thresholds_are_independent() {
        let thresholds = QualityThresholds {
            min_contrast: 0.0,
            ..QualityThresholds::default()
        };
        let a = QualityAssessor::new(thresholds, Duration::from_millis(500));
        assert!(a.assess_lighting(&textured_frame(140, 1)).passed);
    }

    #[test]
    fn missing_landmarks_fail_pose_and_distance() {
        let a = assessor();
        assert!(!a.assess_pose(None).passed);
        assert!(!a.assess_distance(None).passed);
    }

    #[test]
    fn distance_band_rejects_too_far_and_too_close() {
        let a = assessor();
        let far = Landmarks::from_box(FaceBox::new(0.45, 0.45, 0.1, 0.1));
        let good = Landmarks::from_box(FaceBox::new(0.3, 0.2, 0.4, 0.5));
        let close = Landmarks::from_box(FaceBox::new(0.0, 0.0, 0.95, 0.95));
        assert!(!a.assess_distance(Some(&far)).passed);
        assert!(a.assess_distance(Some(&good)).passed);
        assert!(!a.assess_distance(Some(&close)).passed);
    }

    #[test]
    fn assess_drives_stability() {
        let mut a = assessor();
        let frame = textured_frame(140, 40);
        let face = Landmarks::from_box(FaceBox::new(0.3, 0.2, 0.4, 0.5));
        let t0 = Instant::now();

        let r = a.assess(&frame, Some(&face), t0);
        assert!(r.all_green());
        assert!(!r.state.is_stable());

        let r = a.assess(&frame, Some(&face), t0 + Duration::from_millis(600));
        assert_eq!(r.state, GateState::AllGreenStable);

        let r = a.assess(&frame, None, t0 + Duration::from_millis(700));
        assert_eq!(r.state, GateState::AwaitingSignal);
        assert_eq!(r.failure_reason(), Some("No face detected"));
    }
}
