//! Parametric brushes, rendered to a mask on demand.

use super::Data;
use crate::buffer::{Buffer, BufferError, Format, Precision};

#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum BrushShape {
    #[default]
    Circle,
    Square,
    Diamond,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GeneratedBrush {
    name: String,
    shape: BrushShape,
    radius: f64,
    spikes: u32,
    hardness: f64,
    aspect_ratio: f64,
    /// Degrees.
    angle: f64,
    /// Distance between dabs, in percent of the brush size.
    spacing: f64,
}
impl Default for GeneratedBrush {
    fn default() -> Self {
        Self {
            name: "Untitled".to_owned(),
            shape: BrushShape::Circle,
            radius: 5.0,
            spikes: 2,
            hardness: 0.0,
            aspect_ratio: 1.0,
            angle: 0.0,
            spacing: 20.0,
        }
    }
}
impl Data for GeneratedBrush {
    const FOLDER: &'static str = "brushes";
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn standard() -> Self {
        Self {
            name: "Standard".to_owned(),
            ..Self::default()
        }
    }
    fn validate(&self) -> Result<(), String> {
        let values = [self.radius, self.hardness, self.aspect_ratio, self.angle, self.spacing];
        if values.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err("brush parameters must be finite".to_owned())
        }
    }
}

/// Not a real gaussian, but a smooth falloff from 1 at 0 to 0 at 1.
fn gauss(f: f64) -> f64 {
    if f < -0.5 {
        let f = -1.0 - f;
        2.0 * f * f
    } else if f < 0.5 {
        1.0 - 2.0 * f * f
    } else {
        let f = 1.0 - f;
        2.0 * f * f
    }
}

impl GeneratedBrush {
    #[must_use]
    pub fn shape(&self) -> BrushShape {
        self.shape
    }
    pub fn set_shape(&mut self, shape: BrushShape) {
        self.shape = shape;
    }
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }
    /// Clamped to `[0, 32767]`.
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.clamp(0.0, 32767.0);
    }
    #[must_use]
    pub fn spikes(&self) -> u32 {
        self.spikes
    }
    /// Clamped to `[2, 20]`.
    pub fn set_spikes(&mut self, spikes: u32) {
        self.spikes = spikes.clamp(2, 20);
    }
    #[must_use]
    pub fn hardness(&self) -> f64 {
        self.hardness
    }
    pub fn set_hardness(&mut self, hardness: f64) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }
    /// Clamped to `[1, 1000]`.
    pub fn set_aspect_ratio(&mut self, ratio: f64) {
        self.aspect_ratio = ratio.clamp(1.0, 1000.0);
    }
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }
    /// Folded into `[0, 180]`.
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = if angle < 0.0 {
            -(angle % 180.0)
        } else if angle > 180.0 {
            angle % 180.0
        } else {
            angle
        };
    }
    #[must_use]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }
    pub fn set_spacing(&mut self, spacing: f64) {
        self.spacing = spacing.clamp(1.0, 5000.0);
    }

    /// Pixel size of the rendered mask: the rotated, squashed shape's bounding box.
    #[must_use]
    pub fn mask_size(&self) -> (i32, i32) {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let major = self.radius;
        let minor = self.radius / self.aspect_ratio;
        let half_width = (major * cos).abs() + (minor * sin).abs();
        let half_height = (major * sin).abs() + (minor * cos).abs();
        // Shave off rounding noise so a right angle doesn't grow the box by a pixel.
        let size = |half: f64| az::saturating_cast::<f64, i32>((2.0 * half - 1e-6).ceil()).max(1);
        (size(half_width), size(half_height))
    }

    /// Render the brush as a mask, 1 at the center fading to 0 at the radius.
    pub fn mask(&self) -> Result<Buffer, BufferError> {
        let (width, height) = self.mask_size();
        let mut mask = Buffer::new(width, height, Format::mask(Precision::Float))?;
        let exponent = if 1.0 - self.hardness < 0.000_000_4 {
            1_000_000.0
        } else {
            0.4 / (1.0 - self.hardness)
        };
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let center = [f64::from(width) / 2.0, f64::from(height) / 2.0];
        let sector = std::f64::consts::PI / f64::from(self.spikes);
        for y in 0..height {
            for x in 0..width {
                let dx = f64::from(x) + 0.5 - center[0];
                let dy = f64::from(y) + 0.5 - center[1];
                // Into the brush's own frame, then undo the squash.
                let mut u = dx * cos + dy * sin;
                let mut v = (dy * cos - dx * sin) * self.aspect_ratio;
                if self.spikes > 2 {
                    let r = u.hypot(v);
                    let theta = v.atan2(u).abs() % (2.0 * sector);
                    let theta = (theta - sector).abs();
                    u = r * theta.cos();
                    v = r * theta.sin();
                }
                let d = match self.shape {
                    BrushShape::Circle => u.hypot(v),
                    BrushShape::Square => u.abs().max(v.abs()),
                    BrushShape::Diamond => u.abs() + v.abs(),
                };
                let value = if self.radius <= 0.0 || d > self.radius {
                    0.0
                } else {
                    gauss((d / self.radius).powf(exponent))
                };
                #[allow(clippy::cast_possible_truncation)]
                let value = value as f32;
                mask.put(x, y, [value, value, value, 1.0]);
            }
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn setters_clamp() {
        let mut brush = GeneratedBrush::standard();
        brush.set_spikes(40);
        assert_eq!(brush.spikes(), 20);
        brush.set_aspect_ratio(0.5);
        assert_eq!(brush.aspect_ratio(), 1.0);
        brush.set_angle(200.0);
        assert_eq!(brush.angle(), 20.0);
        brush.set_angle(-30.0);
        assert_eq!(brush.angle(), 30.0);
        brush.set_hardness(3.0);
        assert_eq!(brush.hardness(), 1.0);
    }
    #[test]
    fn hard_circle_mask() {
        let mut brush = GeneratedBrush::standard();
        brush.set_hardness(1.0);
        assert_eq!(brush.mask_size(), (10, 10));
        let mask = brush.mask().unwrap();
        assert_eq!(mask.mask_value(5, 5), 1.0);
        assert_eq!(mask.mask_value(0, 0), 0.0);
        assert_eq!(mask.mask_value(0, 5), 1.0);
    }
    #[test]
    fn soft_mask_fades() {
        let brush = GeneratedBrush::standard();
        let mask = brush.mask().unwrap();
        let center = mask.mask_value(5, 5);
        let edge = mask.mask_value(1, 5);
        assert!(center > edge);
        assert!(edge > 0.0);
    }
    #[test]
    fn squashed_and_rotated_size() {
        let mut brush = GeneratedBrush::standard();
        brush.set_aspect_ratio(5.0);
        assert_eq!(brush.mask_size(), (10, 2));
        brush.set_angle(90.0);
        assert_eq!(brush.mask_size(), (2, 10));
    }
}
