//! Hit testing: does a pointer position land on a drawn item?
//!
//! All predicates are pure and total. Anything they can't make sense of
//! (too few points, the wrong shape, NaN coordinates) is simply a miss.

use crate::config::HitConfig;
use crate::item::{DrawnItem, ShapeKind};
use kurbo::Point;

/// Test `point` against `item` with the default distances.
pub fn hit(point: Point, item: &DrawnItem) -> bool {
    hit_with(point, item, &HitConfig::default())
}

/// Test `point` against `item`, dispatching on its shape.
pub fn hit_with(point: Point, item: &DrawnItem, config: &HitConfig) -> bool {
    match item.shape {
        ShapeKind::Rectangle | ShapeKind::Oval => is_point_close_to_frame(point, item, config.frame_margin),
        ShapeKind::Line | ShapeKind::StraightLine => is_point_close_to_line(point, item, config.line_slack),
    }
}

/// Border test for rectangles and ovals.
///
/// The point must fall inside the anchor box grown by `margin` on every side
/// but not inside the box shrunk by `margin`, so only a frame of width
/// `2 * margin` around the outline is clickable. Ovals use the same frame as
/// their bounding rectangle.
///
/// When the box is narrower than `2 * margin` on an axis the shrunk interval
/// on that axis is empty, nothing is inside the inner box, and the entire
/// grown box counts as a hit.
pub fn is_point_close_to_frame(point: Point, item: &DrawnItem, margin: f64) -> bool {
    if !matches!(item.shape, ShapeKind::Rectangle | ShapeKind::Oval) {
        return false;
    }
    let Some((start, end)) = item.anchors() else {
        return false;
    };
    if !is_finite(point) {
        return false;
    }

    let min_x = start.x.min(end.x);
    let max_x = start.x.max(end.x);
    let min_y = start.y.min(end.y);
    let max_y = start.y.max(end.y);

    let in_outer = within(point.x, min_x - margin, max_x + margin)
        && within(point.y, min_y - margin, max_y + margin);
    let in_inner = within(point.x, min_x + margin, max_x - margin)
        && within(point.y, min_y + margin, max_y - margin);
    in_outer && !in_inner
}

/// Proximity test for lines.
///
/// A straight line is the segment between its two anchors; a free-form
/// line is the polyline through all of its points. The point hits when it
/// is closer than `stroke_width + slack`.
pub fn is_point_close_to_line(point: Point, item: &DrawnItem, slack: f64) -> bool {
    let points = item.points();
    if points.len() < 2 || !is_finite(point) {
        return false;
    }
    let threshold = item.stroke_width() + slack;
    let distance = match item.shape {
        ShapeKind::StraightLine => point_to_segment_dist(point, points[0], points[1]),
        ShapeKind::Line => point_to_polyline_dist(point, points),
        ShapeKind::Rectangle | ShapeKind::Oval => return false,
    };
    distance < threshold
}

/// Distance from a point to the segment `a`-`b`. A zero-length segment is
/// treated as the point `a`.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq == 0.0 {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + t * seg;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// First hit scanning from the topmost item down. `items` must be in
/// back-to-front order.
pub fn topmost_hit<'a, I>(point: Point, items: I, config: &HitConfig) -> Option<&'a DrawnItem>
where
    I: DoubleEndedIterator<Item = &'a DrawnItem>,
{
    items.rev().find(|item| hit_with(point, item, config))
}

fn within(v: f64, lo: f64, hi: f64) -> bool {
    lo <= v && v <= hi
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ObjectId;
    use crate::item::SerializableColor;

    fn item(shape: ShapeKind, width: f64, points: &[(f64, f64)]) -> DrawnItem {
        DrawnItem::new(ObjectId::new(1, 0), shape, SerializableColor::black(), width)
            .with_points(points.iter().map(|&(x, y)| Point::new(x, y)))
    }

    #[test]
    fn test_rectangle_frame() {
        let rect = item(ShapeKind::Rectangle, 4.0, &[(0.0, 0.0), (300.0, 300.0)]);
        assert!(hit(Point::new(50.0, 50.0), &rect));
        assert!(!hit(Point::new(150.0, 150.0), &rect));
        // Just outside the grown box.
        assert!(hit(Point::new(-100.0, 150.0), &rect));
        assert!(!hit(Point::new(-100.5, 150.0), &rect));
        assert!(!hit(Point::new(150.0, 401.0), &rect));
    }

    #[test]
    fn test_rectangle_anchor_order_irrelevant() {
        let rect = item(ShapeKind::Rectangle, 4.0, &[(300.0, 0.0), (0.0, 300.0)]);
        assert!(hit(Point::new(250.0, 20.0), &rect));
        assert!(!hit(Point::new(150.0, 150.0), &rect));
    }

    #[test]
    fn test_oval_uses_frame() {
        let oval = item(ShapeKind::Oval, 4.0, &[(0.0, 0.0), (300.0, 300.0)]);
        assert!(hit(Point::new(350.0, 150.0), &oval));
        assert!(!hit(Point::new(150.0, 150.0), &oval));
    }

    #[test]
    fn test_small_frame_is_solid() {
        let rect = item(ShapeKind::Rectangle, 4.0, &[(0.0, 0.0), (100.0, 100.0)]);
        assert!(hit(Point::new(50.0, 50.0), &rect));
        assert!(hit(Point::new(-90.0, 190.0), &rect));
        assert!(!hit(Point::new(250.0, 50.0), &rect));

        // Narrow on one axis only.
        let wide = item(ShapeKind::Rectangle, 4.0, &[(0.0, 0.0), (1000.0, 50.0)]);
        assert!(hit(Point::new(500.0, 25.0), &wide));
    }

    #[test]
    fn test_straight_line() {
        let line = item(ShapeKind::StraightLine, 4.0, &[(0.0, 0.0), (100.0, 0.0)]);
        assert!(hit(Point::new(50.0, 40.0), &line));
        assert!(!hit(Point::new(50.0, 60.0), &line));
        assert!(!hit(Point::new(50.0, 54.0), &line));
        // Past the end, distance is to the endpoint.
        assert!(hit(Point::new(130.0, 40.0), &line));
        assert!(!hit(Point::new(140.0, 40.0), &line));
    }

    #[test]
    fn test_straight_line_ignores_extra_points() {
        let line = item(ShapeKind::StraightLine, 4.0, &[(0.0, 0.0), (100.0, 0.0), (100.0, 500.0)]);
        assert!(!hit(Point::new(100.0, 300.0), &line));
    }

    #[test]
    fn test_zero_length_segment() {
        let dot = item(ShapeKind::StraightLine, 4.0, &[(10.0, 10.0), (10.0, 10.0)]);
        assert!(hit(Point::new(10.0, 60.0), &dot));
        assert!(!hit(Point::new(10.0, 64.0), &dot));
    }

    #[test]
    fn test_freeform_line_follows_polyline() {
        let stroke = item(ShapeKind::Line, 2.0, &[(0.0, 0.0), (100.0, 0.0), (100.0, 500.0)]);
        assert!(hit(Point::new(130.0, 300.0), &stroke));
        assert!(!hit(Point::new(200.0, 300.0), &stroke));
    }

    #[test]
    fn test_too_few_points_never_hits() {
        for shape in [ShapeKind::Rectangle, ShapeKind::Oval, ShapeKind::Line, ShapeKind::StraightLine] {
            assert!(!hit(Point::new(0.0, 0.0), &item(shape, 4.0, &[])));
            assert!(!hit(Point::new(0.0, 0.0), &item(shape, 4.0, &[(0.0, 0.0)])));
        }
    }

    #[test]
    fn test_wrong_predicate_for_shape() {
        let rect = item(ShapeKind::Rectangle, 4.0, &[(0.0, 0.0), (100.0, 0.0)]);
        let line = item(ShapeKind::StraightLine, 4.0, &[(0.0, 0.0), (300.0, 300.0)]);
        assert!(!is_point_close_to_line(Point::new(50.0, 0.0), &rect, 50.0));
        assert!(!is_point_close_to_frame(Point::new(0.0, 0.0), &line, 100.0));
    }

    #[test]
    fn test_nan_point_misses() {
        let rect = item(ShapeKind::Rectangle, 4.0, &[(0.0, 0.0), (300.0, 300.0)]);
        let line = item(ShapeKind::Line, 4.0, &[(0.0, 0.0), (300.0, 300.0)]);
        assert!(!hit(Point::new(f64::NAN, 0.0), &rect));
        assert!(!hit(Point::new(0.0, f64::NAN), &line));
    }

    #[test]
    fn test_custom_distances() {
        let config = HitConfig { frame_margin: 10.0, line_slack: 0.0 };
        let rect = item(ShapeKind::Rectangle, 4.0, &[(0.0, 0.0), (300.0, 300.0)]);
        assert!(!hit_with(Point::new(50.0, 50.0), &rect, &config));
        assert!(hit_with(Point::new(5.0, 50.0), &rect, &config));

        let line = item(ShapeKind::StraightLine, 4.0, &[(0.0, 0.0), (100.0, 0.0)]);
        assert!(hit_with(Point::new(50.0, 3.0), &line, &config));
        assert!(!hit_with(Point::new(50.0, 5.0), &line, &config));
    }

    #[test]
    fn test_topmost_hit_prefers_last() {
        let segment = |local_id, x0: f64| {
            DrawnItem::new(ObjectId::new(1, local_id), ShapeKind::StraightLine, SerializableColor::black(), 4.0)
                .with_points([Point::new(x0, 0.0), Point::new(x0 + 100.0, 0.0)])
        };
        let items = [segment(1, 0.0), segment(2, 0.0), segment(3, 1000.0)];

        let found = topmost_hit(Point::new(50.0, 10.0), items.iter(), &HitConfig::default());
        assert_eq!(found.map(|i| i.id()), Some(ObjectId::new(1, 2)));
        assert!(topmost_hit(Point::new(500.0, 500.0), items.iter(), &HitConfig::default()).is_none());
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-9);
        assert!(point_to_polyline_dist(Point::new(0.0, 0.0), &[a]).is_infinite());
    }
}
