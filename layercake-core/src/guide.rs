//! Guides, sample points and the grid: non-pixel helpers that live on the image.

use crate::id::{GuideId, SamplePointId};

#[derive(
    strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize,
)]
pub enum Orientation {
    /// A line of constant `y`.
    Horizontal,
    /// A line of constant `x`.
    Vertical,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Guide {
    pub id: GuideId,
    pub orientation: Orientation,
    pub position: i32,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SamplePoint {
    pub id: SamplePointId,
    pub x: i32,
    pub y: i32,
}

#[derive(Copy, Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct Grid {
    pub xspacing: f64,
    pub yspacing: f64,
    pub xoffset: f64,
    pub yoffset: f64,
}
impl Grid {
    #[must_use]
    pub fn new(xspacing: f64, yspacing: f64) -> Self {
        Self {
            xspacing,
            yspacing,
            xoffset: 0.0,
            yoffset: 0.0,
        }
    }
    /// Grid lines along one axis, ascending, within `[0, extent]`. Empty when spacing isn't
    /// positive.
    pub(crate) fn lines(spacing: f64, offset: f64, extent: f64) -> impl Iterator<Item = f64> {
        let start = if spacing > 0.0 {
            offset.rem_euclid(spacing)
        } else {
            f64::INFINITY
        };
        std::iter::successors(Some(start), move |line| Some(line + spacing))
            .take_while(move |line| *line <= extent)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn grid_lines() {
        let lines: Vec<_> = Grid::lines(10.0, 23.0, 40.0).collect();
        assert_eq!(lines, vec![3.0, 13.0, 23.0, 33.0]);
        let lines: Vec<_> = Grid::lines(10.0, -4.0, 20.0).collect();
        assert_eq!(lines, vec![6.0, 16.0]);
        assert_eq!(Grid::lines(0.0, 0.0, 100.0).count(), 0);
        assert_eq!(Grid::lines(-1.0, 0.0, 100.0).count(), 0);
    }
}
