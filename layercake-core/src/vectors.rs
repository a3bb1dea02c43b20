//! # Paths
//!
//! A path item is a set of polyline strokes in image coordinates. Paths have no pixels; their
//! item rectangle always covers the canvas.

use crate::item::{Item, ItemKind, TreeItem};

/// Below this, lengths and cross products count as zero.
const EPSILON: f64 = 1e-9;

pub(crate) type Point = [f64; 2];

fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1]]
}
fn dot(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}
fn cross(a: Point, b: Point) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}
fn distance(a: Point, b: Point) -> f64 {
    let d = sub(a, b);
    dot(d, d).sqrt()
}

#[derive(Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub anchors: Vec<Point>,
    pub closed: bool,
}
impl Stroke {
    #[must_use]
    pub fn new(anchors: Vec<Point>, closed: bool) -> Self {
        Self { anchors, closed }
    }
    /// Consecutive anchor pairs, including the closing one.
    fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let closing = if self.closed && self.anchors.len() > 2 {
            self.anchors.last().copied().zip(self.anchors.first().copied())
        } else {
            None
        };
        self.anchors
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing)
    }
    /// `[x1, y1, x2, y2]` of all anchors.
    #[must_use]
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let (first, rest) = self.anchors.split_first()?;
        Some(rest.iter().fold(
            [first[0], first[1], first[0], first[1]],
            |[x1, y1, x2, y2], [x, y]| [x1.min(*x), y1.min(*y), x2.max(*x), y2.max(*y)],
        ))
    }
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for anchor in &mut self.anchors {
            anchor[0] += dx;
            anchor[1] += dy;
        }
    }
    /// The point of the stroke closest to `point`.
    #[must_use]
    pub fn nearest_point(&self, point: Point) -> Option<Point> {
        if let [only] = self.anchors.as_slice() {
            return Some(*only);
        }
        self.segments()
            .map(|(a, b)| {
                let ab = sub(b, a);
                let len2 = dot(ab, ab);
                let t = if len2 < EPSILON {
                    0.0
                } else {
                    (dot(sub(point, a), ab) / len2).clamp(0.0, 1.0)
                };
                [a[0] + ab[0] * t, a[1] + ab[1] * t]
            })
            .min_by(|a, b| distance(*a, point).total_cmp(&distance(*b, point)))
    }
    /// A point where the stroke runs parallel to the line `p1 -> p2`, nearest to `p1`. On a
    /// polyline those are the anchors that are extreme along the line's normal.
    #[must_use]
    pub fn nearest_tangent(&self, p1: Point, p2: Point) -> Option<Point> {
        let direction = sub(p2, p1);
        if dot(direction, direction) < EPSILON {
            return None;
        }
        let normal = [-direction[1], direction[0]];
        let height = |p: Point| dot(normal, p);
        let n = self.anchors.len();
        let neighbor = |i: usize, step: isize| -> Option<Point> {
            let j = i.checked_add_signed(step);
            match j {
                Some(j) if j < n => Some(self.anchors[j]),
                _ if self.closed && n > 2 => {
                    Some(self.anchors[if step < 0 { n - 1 } else { 0 }])
                }
                _ => None,
            }
        };
        (0..n)
            .filter_map(|i| {
                let here = self.anchors[i];
                let h = height(here);
                let before = neighbor(i, -1).map(|p| height(p) - h);
                let after = neighbor(i, 1).map(|p| height(p) - h);
                let parallel = |d: Option<f64>| d.is_some_and(|d| d.abs() < EPSILON);
                let extreme = match (before, after) {
                    (Some(b), Some(a)) => parallel(Some(b)) || parallel(Some(a)) || b * a > 0.0,
                    (d, None) | (None, d) => parallel(d),
                };
                extreme.then_some(here)
            })
            .min_by(|a, b| distance(*a, p1).total_cmp(&distance(*b, p1)))
    }
    /// Where the infinite line through `p1` and `p2` crosses the stroke, nearest to `p1`.
    #[must_use]
    pub fn nearest_intersection(&self, p1: Point, p2: Point) -> Option<Point> {
        let direction = sub(p2, p1);
        if dot(direction, direction) < EPSILON {
            return None;
        }
        self.segments()
            .filter_map(|(a, b)| {
                let ab = sub(b, a);
                let denom = cross(direction, ab);
                if denom.abs() < EPSILON {
                    return None;
                }
                // Parameter along the segment, which must land inside it.
                let u = cross(sub(a, p1), direction) / denom;
                (-EPSILON..=1.0 + EPSILON)
                    .contains(&u)
                    .then(|| [a[0] + ab[0] * u, a[1] + ab[1] * u])
            })
            .min_by(|a, b| distance(*a, p1).total_cmp(&distance(*b, p1)))
    }
}

#[derive(Clone, Debug)]
pub struct Vectors {
    pub(crate) item: Item,
    pub(crate) strokes: Vec<Stroke>,
}
impl Vectors {
    #[must_use]
    pub fn new(item: Item) -> Self {
        Self {
            item,
            strokes: Vec::new(),
        }
    }
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }
    /// `[x1, y1, x2, y2]` of all strokes.
    #[must_use]
    pub fn bounds(&self) -> Option<[f64; 4]> {
        self.strokes
            .iter()
            .filter_map(Stroke::bounds)
            .reduce(|[a1, b1, a2, b2], [c1, d1, c2, d2]| {
                [a1.min(c1), b1.min(d1), a2.max(c2), b2.max(d2)]
            })
    }
    pub(crate) fn translate(&mut self, dx: f64, dy: f64) {
        for stroke in &mut self.strokes {
            stroke.translate(dx, dy);
        }
    }
}
impl TreeItem for Vectors {
    const KIND: ItemKind = ItemKind::Vectors;
    fn item(&self) -> &Item {
        &self.item
    }
    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn square() -> Stroke {
        Stroke::new(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]], true)
    }
    #[test]
    fn bounds() {
        assert_eq!(square().bounds(), Some([0.0, 0.0, 10.0, 10.0]));
        assert_eq!(Stroke::default().bounds(), None);
    }
    #[test]
    fn nearest_point_on_closing_segment() {
        assert_eq!(square().nearest_point([-3.0, 5.0]), Some([0.0, 5.0]));
        // Open strokes have no closing segment.
        let mut open = square();
        open.closed = false;
        assert_eq!(open.nearest_point([-3.0, 4.0]), Some([0.0, 0.0]));
    }
    #[test]
    fn intersection_nearest_to_first_point() {
        let hit = square().nearest_intersection([-5.0, 5.0], [20.0, 5.0]);
        assert_eq!(hit, Some([0.0, 5.0]));
        let hit = square().nearest_intersection([20.0, 5.0], [-5.0, 5.0]);
        assert_eq!(hit, Some([10.0, 5.0]));
        // The line is infinite in both directions.
        let hit = square().nearest_intersection([-5.0, 5.0], [-4.0, 5.0]);
        assert_eq!(hit, Some([0.0, 5.0]));
        assert_eq!(square().nearest_intersection([-5.0, 50.0], [20.0, 50.0]), None);
    }
    #[test]
    fn tangent_picks_extreme_anchor() {
        let diamond = Stroke::new(vec![[5.0, 0.0], [10.0, 5.0], [5.0, 10.0], [0.0, 5.0]], true);
        // A horizontal line is tangent at the top and bottom corners.
        assert_eq!(diamond.nearest_tangent([0.0, 1.0], [10.0, 1.0]), Some([5.0, 0.0]));
        assert_eq!(diamond.nearest_tangent([0.0, 9.0], [10.0, 9.0]), Some([5.0, 10.0]));
        // Degenerate direction.
        assert_eq!(diamond.nearest_tangent([1.0, 1.0], [1.0, 1.0]), None);
    }
}
