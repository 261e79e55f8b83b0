use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Role a fiducial plays in the scene, derived from its decoded payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerRole {
    Robot,
    Target,
    Unknown,
}

/// Axis-aligned bounding box in image pixels.
///
/// `(left, top)` is the reference point used by pose estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Tightest box containing all `points`. `None` for an empty slice.
    pub fn enclosing(points: &[Point2<f32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    #[inline]
    pub fn origin(&self) -> Point2<f32> {
        Point2::new(self.left, self.top)
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.left + 0.5 * self.width, self.top + 0.5 * self.height)
    }
}

/// One fiducial found in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub role: MarkerRole,
    /// Decoded payload text.
    pub payload: String,
    pub bbox: BoundingBox,
    /// Corner points in decoder order; four when the symbol was fully resolved.
    pub polygon: Vec<Point2<f32>>,
}

impl MarkerDetection {
    #[inline]
    pub fn is_fully_resolved(&self) -> bool {
        self.polygon.len() == 4
    }
}

/// Robot and target markers resolved from one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerPair {
    pub robot: Option<MarkerDetection>,
    pub target: Option<MarkerDetection>,
}

impl MarkerPair {
    /// Both markers present in the same frame.
    pub fn both(&self) -> Option<(&MarkerDetection, &MarkerDetection)> {
        Some((self.robot.as_ref()?, self.target.as_ref()?))
    }

    pub fn count(&self) -> usize {
        usize::from(self.robot.is_some()) + usize::from(self.target.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_box_spans_rotated_quad() {
        let quad = [
            Point2::new(20.0, 10.0),
            Point2::new(30.0, 20.0),
            Point2::new(20.0, 30.0),
            Point2::new(10.0, 20.0),
        ];
        let bbox = BoundingBox::enclosing(&quad).expect("non-empty");
        assert_eq!(bbox, BoundingBox::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(bbox.center(), Point2::new(20.0, 20.0));
    }

    #[test]
    fn enclosing_box_of_nothing_is_none() {
        assert!(BoundingBox::enclosing(&[]).is_none());
    }

    #[test]
    fn pair_reports_both_only_when_complete() {
        let det = MarkerDetection {
            role: MarkerRole::Robot,
            payload: "car".into(),
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            polygon: Vec::new(),
        };
        let mut pair = MarkerPair {
            robot: Some(det.clone()),
            target: None,
        };
        assert!(pair.both().is_none());
        assert_eq!(pair.count(), 1);

        pair.target = Some(MarkerDetection {
            role: MarkerRole::Target,
            ..det
        });
        assert!(pair.both().is_some());
        assert_eq!(pair.count(), 2);
    }
}
