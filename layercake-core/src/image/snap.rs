//! Snapping positions to guides, the grid, the canvas edges and the active path.
//!
//! Every query returns whether anything was within reach, plus the snapped (or untouched)
//! coordinates. Each axis keeps the closest candidate strictly nearer than its epsilon.

use super::Image;
use crate::guide::{Grid, Orientation};
use crate::vectors::{Point, Stroke};

/// Which targets to snap to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SnapOptions {
    pub guides: bool,
    pub grid: bool,
    pub canvas: bool,
    /// The active path's strokes.
    pub vectors: bool,
}
impl SnapOptions {
    #[must_use]
    pub fn all() -> Self {
        Self {
            guides: true,
            grid: true,
            canvas: true,
            vectors: true,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Axis {
    X,
    Y,
}

/// Closest candidate so far along one axis.
#[derive(Copy, Clone, Debug)]
struct Nearest {
    target: f64,
    distance: f64,
}
impl Nearest {
    fn new(unsnapped: f64) -> Self {
        Self {
            target: unsnapped,
            distance: f64::MAX,
        }
    }
    /// Take `candidate` if it is closer than both `epsilon` and the best so far.
    fn offer(&mut self, unsnapped: f64, candidate: f64, epsilon: f64) -> bool {
        let distance = (candidate - unsnapped).abs();
        if distance < epsilon.min(self.distance) {
            self.distance = distance;
            self.target = candidate;
            true
        } else {
            false
        }
    }
    /// Like [`Self::offer`], but `candidate` is where `edge` should go, and the target is
    /// `origin` moved along with it.
    fn offer_edge(&mut self, origin: f64, edge: f64, candidate: f64, epsilon: f64) -> bool {
        let distance = (candidate - edge).abs();
        if distance < epsilon.min(self.distance) {
            self.distance = distance;
            self.target = (origin + (candidate - edge)).round();
            true
        } else {
            false
        }
    }
}

impl Image {
    fn extent(&self, axis: Axis) -> f64 {
        f64::from(match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        })
    }
    fn in_snap_range(&self, axis: Axis, value: f64, epsilon: f64) -> bool {
        value >= -epsilon && value < self.extent(axis) + epsilon
    }
    /// Drop toggles for targets the image doesn't have.
    fn effective(&self, mut options: SnapOptions) -> SnapOptions {
        options.guides &= !self.guides.is_empty();
        options.grid &= self.grid.is_some();
        options.vectors &= self.vectors.active().is_some();
        options
    }
    fn active_strokes(&self) -> &[Stroke] {
        self.vectors
            .active()
            .and_then(|id| self.vectors.get(id))
            .map_or(&[], |v| v.strokes())
    }
    /// Guides, grid lines and canvas edges along one axis.
    fn snap_axis(&self, axis: Axis, value: f64, epsilon: f64, options: SnapOptions, nearest: &mut Nearest) -> bool {
        let mut snapped = false;
        if options.guides {
            let orientation = match axis {
                Axis::X => Orientation::Vertical,
                Axis::Y => Orientation::Horizontal,
            };
            for guide in self.guides.iter().filter(|g| g.orientation == orientation) {
                if guide.position >= 0 {
                    snapped |= nearest.offer(value, f64::from(guide.position), epsilon);
                }
            }
        }
        if let Some(grid) = self.grid.filter(|_| options.grid) {
            let (spacing, offset) = match axis {
                Axis::X => (grid.xspacing, grid.xoffset),
                Axis::Y => (grid.yspacing, grid.yoffset),
            };
            for line in Grid::lines(spacing, offset, self.extent(axis)) {
                snapped |= nearest.offer(value, line, epsilon);
            }
        }
        if options.canvas {
            snapped |= nearest.offer(value, 0.0, epsilon);
            snapped |= nearest.offer(value, self.extent(axis), epsilon);
        }
        snapped
    }

    /// Snap an x coordinate to vertical guides, the grid and the canvas edges.
    #[must_use]
    pub fn snap_x(&self, x: f64, epsilon: f64, options: SnapOptions) -> (bool, f64) {
        self.snap_single(Axis::X, x, epsilon, options)
    }
    /// Snap a y coordinate to horizontal guides, the grid and the canvas edges.
    #[must_use]
    pub fn snap_y(&self, y: f64, epsilon: f64, options: SnapOptions) -> (bool, f64) {
        self.snap_single(Axis::Y, y, epsilon, options)
    }
    fn snap_single(&self, axis: Axis, value: f64, epsilon: f64, options: SnapOptions) -> (bool, f64) {
        let options = SnapOptions {
            vectors: false,
            ..self.effective(options)
        };
        let mut nearest = Nearest::new(value);
        if options == SnapOptions::default() || !self.in_snap_range(axis, value, epsilon) {
            return (false, value);
        }
        let snapped = self.snap_axis(axis, value, epsilon, options, &mut nearest);
        (snapped, nearest.target)
    }

    /// Snap a point, each axis independently. Paths snap to their nearest point.
    #[must_use]
    pub fn snap_point(&self, point: Point, epsilon: [f64; 2], options: SnapOptions) -> (bool, Point) {
        let [x, y] = point;
        let [epsilon_x, epsilon_y] = epsilon;
        let options = self.effective(options);
        if options == SnapOptions::default()
            || !self.in_snap_range(Axis::X, x, epsilon_x)
            || !self.in_snap_range(Axis::Y, y, epsilon_y)
        {
            return (false, point);
        }
        let mut nearest_x = Nearest::new(x);
        let mut nearest_y = Nearest::new(y);
        let mut snapped = self.snap_axis(Axis::X, x, epsilon_x, options, &mut nearest_x);
        snapped |= self.snap_axis(Axis::Y, y, epsilon_y, options, &mut nearest_y);
        if options.vectors {
            for stroke in self.active_strokes() {
                if let Some([nx, ny]) = stroke.nearest_point(point) {
                    snapped |= nearest_x.offer(x, nx, epsilon_x);
                    snapped |= nearest_y.offer(y, ny, epsilon_y);
                }
            }
        }
        (snapped, [nearest_x.target, nearest_y.target])
    }

    /// Snap a rectangle by moving it. Edges are tried before the center on each axis, each
    /// success narrowing what later candidates must beat. Returns the new top left corner.
    #[must_use]
    pub fn snap_rectangle(
        &self,
        corners: [f64; 4],
        epsilon: [f64; 2],
        options: SnapOptions,
    ) -> (bool, Point) {
        let [x1, y1, x2, y2] = corners;
        let [epsilon_x, epsilon_y] = epsilon;
        let options = self.effective(options);
        if options == SnapOptions::default() {
            return (false, [x1, y1]);
        }
        let axis_options = SnapOptions {
            vectors: false,
            ..options
        };
        let mut nearest_x = Nearest::new(x1);
        let mut nearest_y = Nearest::new(y1);
        let mut snapped = false;
        let centers = [(x1 + x2) / 2.0, (y1 + y2) / 2.0];

        for (axis, origin, edges, epsilon, nearest) in [
            (Axis::X, x1, [x1, x2, centers[0]], epsilon_x, &mut nearest_x),
            (Axis::Y, y1, [y1, y2, centers[1]], epsilon_y, &mut nearest_y),
        ] {
            for (n, edge) in edges.into_iter().enumerate() {
                let reach = epsilon.min(nearest.distance);
                let (hit, candidate) = self.snap_single(axis, edge, reach, axis_options);
                if hit {
                    nearest.distance = (candidate - edge).abs();
                    nearest.target = if n == 0 {
                        candidate
                    } else {
                        (origin + (candidate - edge)).round()
                    };
                    snapped = true;
                }
            }
        }

        if options.vectors {
            for stroke in self.active_strokes() {
                let edges = [
                    // Top, bottom, left, right.
                    ([x1, y1], [x2, y1]),
                    ([x1, y2], [x2, y2]),
                    ([x1, y1], [x1, y2]),
                    ([x2, y1], [x2, y2]),
                ];
                for (index, (a, b)) in edges.into_iter().enumerate() {
                    let horizontal = index < 2;
                    if let Some([tx, ty]) = stroke.nearest_tangent(a, b) {
                        snapped |= match index {
                            0 => nearest_y.offer(y1, ty, epsilon_y),
                            1 => nearest_y.offer_edge(y1, y2, ty, epsilon_y),
                            2 => nearest_x.offer(x1, tx, epsilon_x),
                            _ => nearest_x.offer_edge(x1, x2, tx, epsilon_x),
                        };
                    }
                    // Where the edge line crosses the stroke, nearest to either end.
                    if let Some([ix, iy]) = stroke.nearest_intersection(a, b) {
                        snapped |= if horizontal {
                            nearest_x.offer(x1, ix, epsilon_x)
                        } else {
                            nearest_y.offer(y1, iy, epsilon_y)
                        };
                    }
                    if let Some([ix, iy]) = stroke.nearest_intersection(b, a) {
                        snapped |= if horizontal {
                            nearest_x.offer_edge(x1, x2, ix, epsilon_x)
                        } else {
                            nearest_y.offer_edge(y1, y2, iy, epsilon_y)
                        };
                    }
                }
            }
        }
        (snapped, [nearest_x.target, nearest_y.target])
    }
}

#[cfg(test)]
mod test {
    use super::super::test_util::*;
    use super::*;

    fn guides_only() -> SnapOptions {
        SnapOptions {
            guides: true,
            ..SnapOptions::default()
        }
    }

    #[test]
    fn epsilon_is_exclusive() {
        let mut image = image(100, 100);
        image.add_guide(Orientation::Horizontal, 50, true).unwrap();
        assert_eq!(image.snap_y(54.0, 5.0, guides_only()), (true, 50.0));
        assert_eq!(image.snap_y(56.0, 5.0, guides_only()), (false, 56.0));
        assert_eq!(image.snap_y(55.0, 5.0, guides_only()), (false, 55.0));
        // Vertical guides only affect x.
        assert_eq!(image.snap_x(51.0, 5.0, guides_only()), (false, 51.0));
    }
    #[test]
    fn nearest_candidate_wins() {
        let mut image = image(100, 100);
        image.add_guide(Orientation::Vertical, 40, true).unwrap();
        image.add_guide(Orientation::Vertical, 44, true).unwrap();
        assert_eq!(image.snap_x(43.0, 5.0, guides_only()), (true, 44.0));
        assert_eq!(image.snap_x(41.0, 5.0, guides_only()), (true, 40.0));
    }
    #[test]
    fn grid_and_canvas() {
        let mut image = image(100, 100);
        image.set_grid(Some(Grid::new(16.0, 16.0)), true).unwrap();
        let grid = SnapOptions {
            grid: true,
            ..SnapOptions::default()
        };
        assert_eq!(image.snap_x(30.0, 3.0, grid), (true, 32.0));
        let canvas = SnapOptions {
            canvas: true,
            ..SnapOptions::default()
        };
        assert_eq!(image.snap_x(98.0, 3.0, canvas), (true, 100.0));
        // Far outside the canvas nothing snaps.
        assert_eq!(image.snap_x(-10.0, 3.0, canvas), (false, -10.0));
        // Nothing to snap to.
        assert_eq!(image.snap_x(1.0, 3.0, guides_only()), (false, 1.0));
    }
    #[test]
    fn point_snaps_per_axis() {
        let mut image = image(100, 100);
        image.add_guide(Orientation::Horizontal, 20, true).unwrap();
        let (snapped, point) = image.snap_point([50.0, 22.0], [3.0, 3.0], guides_only());
        assert!(snapped);
        assert_eq!(point, [50.0, 20.0]);
    }
    #[test]
    fn point_snaps_to_active_path() {
        let mut image = image(100, 100);
        let mut path = image.new_vectors(None);
        path.strokes
            .push(Stroke::new(vec![[10.0, 10.0], [10.0, 90.0]], false));
        image.add_vectors(path, None, true).unwrap();
        let options = SnapOptions {
            vectors: true,
            ..SnapOptions::default()
        };
        let (snapped, point) = image.snap_point([12.0, 50.0], [4.0, 4.0], options);
        assert!(snapped);
        assert_eq!(point, [10.0, 50.0]);
    }
    #[test]
    fn rectangle_snaps_by_edges() {
        let mut image = image(100, 100);
        image.add_guide(Orientation::Vertical, 50, true).unwrap();
        // The right edge is in reach and drags the rectangle along.
        let (snapped, corner) = image.snap_rectangle([38.0, 0.0, 48.0, 10.0], [3.0, 3.0], guides_only());
        assert!(snapped);
        assert_eq!(corner, [40.0, 0.0]);
        let (snapped, corner) = image.snap_rectangle([20.0, 0.0, 30.0, 10.0], [3.0, 3.0], guides_only());
        assert!(!snapped);
        assert_eq!(corner, [20.0, 0.0]);
        let (snapped, corner) = image.snap_rectangle([47.0, 5.0, 60.0, 9.0], [4.0, 4.0], guides_only());
        assert!(snapped);
        assert_eq!(corner, [50.0, 5.0]);
    }
}
