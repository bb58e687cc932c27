/// A bounding box in frame pixel coordinates, `(x1, y1)` top-left and
/// `(x2, y2)` bottom-right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Clamps the box into `[0, width] x [0, height]`.
    pub fn clamp(&self, width: u32, height: u32) -> BoundingBox {
        BoundingBox {
            x1: self.x1.clamp(0.0, width as f64),
            y1: self.y1.clamp(0.0, height as f64),
            x2: self.x2.clamp(0.0, width as f64),
            y2: self.y2.clamp(0.0, height as f64),
        }
    }
}

/// One detected object in one frame: bounding region, class, confidence,
/// and, when tracking is enabled, a stable identity across frames.
///
/// Owned transiently by the loop iteration that created it; discarded
/// after rendering unless the caller surfaces it explicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub label: String,
    pub score: f64,
    pub track_id: Option<u32>,
}

impl Detection {
    /// Text burned into the annotated frame next to the bounding box,
    /// e.g. `"person #3 87%"` or `"dog 52%"`.
    pub fn caption(&self) -> String {
        match self.track_id {
            Some(id) => format!("{} #{} {:.0}%", self.label, id, self.score * 100.0),
            None => format!("{} {:.0}%", self.label, self.score * 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[rstest]
    #[case::no_overlap(bbox(0.0, 0.0, 10.0, 10.0), bbox(20.0, 20.0, 30.0, 30.0), 0.0)]
    #[case::identical(bbox(0.0, 0.0, 10.0, 10.0), bbox(0.0, 0.0, 10.0, 10.0), 1.0)]
    #[case::partial(bbox(0.0, 0.0, 10.0, 10.0), bbox(5.0, 5.0, 15.0, 15.0), 25.0 / 175.0)]
    #[case::touching_edges(bbox(0.0, 0.0, 10.0, 10.0), bbox(10.0, 0.0, 20.0, 10.0), 0.0)]
    #[case::zero_area(bbox(0.0, 0.0, 0.0, 10.0), bbox(0.0, 0.0, 10.0, 10.0), 0.0)]
    fn test_iou(#[case] a: BoundingBox, #[case] b: BoundingBox, #[case] expected: f64) {
        assert_relative_eq!(a.iou(&b), expected);
    }

    #[test]
    fn test_clamp_restricts_to_frame() {
        let clamped = bbox(-5.0, -5.0, 700.0, 500.0).clamp(640, 480);
        assert_eq!(clamped, bbox(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_degenerate_box_has_zero_area() {
        assert_eq!(bbox(10.0, 10.0, 5.0, 20.0).area(), 0.0);
    }

    #[test]
    fn test_caption_without_track() {
        let det = Detection {
            bbox: bbox(0.0, 0.0, 1.0, 1.0),
            class_id: 16,
            label: "dog".into(),
            score: 0.52,
            track_id: None,
        };
        assert_eq!(det.caption(), "dog 52%");
    }

    #[test]
    fn test_caption_with_track() {
        let det = Detection {
            bbox: bbox(0.0, 0.0, 1.0, 1.0),
            class_id: 0,
            label: "person".into(),
            score: 0.871,
            track_id: Some(3),
        };
        assert_eq!(det.caption(), "person #3 87%");
    }
}
