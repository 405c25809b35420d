/// Face bounding box in normalized frame coordinates (0..1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Tight box around a set of normalized points.
    pub fn enclosing(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Fraction of the frame covered by the box, after clamping to the frame.
    pub fn area_fraction(&self) -> f32 {
        let clamped = self.clamped();
        clamped.width * clamped.height
    }

    pub fn clamped(&self) -> Self {
        let x0 = self.x.clamp(0.0, 1.0);
        let y0 = self.y.clamp(0.0, 1.0);
        let x1 = (self.x + self.width).clamp(0.0, 1.0);
        let y1 = (self.y + self.height).clamp(0.0, 1.0);
        Self::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }

    /// Grows the box by `margin` of its own size on every side.
    pub fn padded(&self, margin: f32) -> Self {
        let dx = self.width * margin;
        let dy = self.height * margin;
        Self::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }

    /// Pixel rectangle `(x, y, w, h)` inside a `frame_width` x `frame_height` frame.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> (u32, u32, u32, u32) {
        let c = self.clamped();
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let x = (c.x * fw).floor() as u32;
        let y = (c.y * fh).floor() as u32;
        let w = ((c.width * fw).ceil() as u32).min(frame_width.saturating_sub(x));
        let h = ((c.height * fh).ceil() as u32).min(frame_height.saturating_sub(y));
        (x, y, w, h)
    }
}

/// Face landmark set produced by a face locator.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    pub points: Vec<(f32, f32)>,
    pub bounds: FaceBox,
}

impl Landmarks {
    pub fn from_points(points: Vec<(f32, f32)>) -> Option<Self> {
        let bounds = FaceBox::enclosing(&points)?;
        Some(Self { points, bounds })
    }

    pub fn from_box(bounds: FaceBox) -> Self {
        Self {
            points: Vec::new(),
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_box_covers_all_points() {
        let b = FaceBox::enclosing(&[(0.2, 0.3), (0.6, 0.1), (0.4, 0.7)]).unwrap();
        assert!((b.x - 0.2).abs() < 1e-6);
        assert!((b.y - 0.1).abs() < 1e-6);
        assert!((b.width - 0.4).abs() < 1e-6);
        assert!((b.height - 0.6).abs() < 1e-6);
        assert!(FaceBox::enclosing(&[]).is_none());
    }

    #[test]
    fn area_is_clamped_to_frame() {
        let b = FaceBox::new(0.5, 0.5, 1.0, 1.0);
        assert!((b.area_fraction() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn pixel_rect_stays_inside_frame() {
        let b = FaceBox::new(0.25, 0.25, 0.5, 0.5).padded(1.0);
        let (x, y, w, h) = b.to_pixels(100, 80);
        assert_eq!((x, y), (0, 0));
        assert!(x + w <= 100);
        assert!(y + h <= 80);
    }
}
