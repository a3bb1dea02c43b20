//! Gradients: a run of segments covering `0.0..=1.0`, each blending between two end colors.

use super::Data;
use crate::color::Color;
use crate::context::Context;

/// Segments narrower than this evaluate at their center.
const EPSILON: f64 = 1e-10;
/// Allowed slack where neighboring segments meet.
const JOIN_EPSILON: f64 = 1e-6;

/// How the blend factor runs from the left end to the right end of a segment.
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
pub enum SegmentBlend {
    #[default]
    Linear,
    Curved,
    Sine,
    SphereIncreasing,
    SphereDecreasing,
}

/// The space colors are interpolated in.
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
pub enum SegmentColoring {
    #[default]
    Rgb,
    /// Hue turns counter-clockwise.
    HsvCcw,
    /// Hue turns clockwise.
    HsvCw,
}

/// Where an end color comes from.
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
pub enum ColorSource {
    #[default]
    Fixed,
    Foreground,
    ForegroundTransparent,
    Background,
    BackgroundTransparent,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Segment {
    pub left: f64,
    pub middle: f64,
    pub right: f64,
    pub left_color: Color,
    pub left_source: ColorSource,
    pub right_color: Color,
    pub right_source: ColorSource,
    pub blend: SegmentBlend,
    pub coloring: SegmentColoring,
}
impl Default for Segment {
    /// Black to white over the whole range.
    fn default() -> Self {
        Self {
            left: 0.0,
            middle: 0.5,
            right: 1.0,
            left_color: Color::BLACK,
            left_source: ColorSource::Fixed,
            right_color: Color::WHITE,
            right_source: ColorSource::Fixed,
            blend: SegmentBlend::Linear,
            coloring: SegmentColoring::Rgb,
        }
    }
}

/// Straight RGBA of an end. Transparent variants keep the context color's RGB.
fn end_color(source: ColorSource, fixed: Color, context: &Context) -> [f32; 4] {
    let with_alpha = |color: Color, alpha: Option<f32>| {
        let mut rgba = color.to_straight();
        if let Some(alpha) = alpha {
            rgba[3] = alpha;
        }
        rgba
    };
    match source {
        ColorSource::Fixed => fixed.to_straight(),
        ColorSource::Foreground => with_alpha(context.foreground(), None),
        ColorSource::ForegroundTransparent => with_alpha(context.foreground(), Some(0.0)),
        ColorSource::Background => with_alpha(context.background(), None),
        ColorSource::BackgroundTransparent => with_alpha(context.background(), Some(0.0)),
    }
}

fn linear_factor(middle: f64, pos: f64) -> f64 {
    if pos <= middle {
        if middle < EPSILON {
            0.0
        } else {
            0.5 * pos / middle
        }
    } else {
        let pos = pos - middle;
        let middle = 1.0 - middle;
        if middle < EPSILON {
            1.0
        } else {
            0.5 + 0.5 * pos / middle
        }
    }
}

impl SegmentBlend {
    /// Blend factor at `pos`, both relative to the segment.
    #[must_use]
    pub fn factor(self, middle: f64, pos: f64) -> f64 {
        match self {
            Self::Linear => linear_factor(middle, pos),
            Self::Curved => pos.powf(0.5f64.ln() / middle.max(EPSILON).ln()),
            Self::Sine => {
                let pos = linear_factor(middle, pos);
                ((-std::f64::consts::FRAC_PI_2 + std::f64::consts::PI * pos).sin() + 1.0) / 2.0
            }
            Self::SphereIncreasing => {
                let pos = linear_factor(middle, pos) - 1.0;
                (1.0 - pos * pos).sqrt()
            }
            Self::SphereDecreasing => {
                let pos = linear_factor(middle, pos);
                1.0 - (1.0 - pos * pos).sqrt()
            }
        }
    }
}

fn rgb_to_hsv([r, g, b]: [f64; 3]) -> [f64; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta == 0.0 {
        return [0.0, s, max];
    }
    let sextant = if r == max {
        (g - b) / delta
    } else if g == max {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    let h = sextant / 6.0;
    [if h < 0.0 { h + 1.0 } else { h }, s, max]
}

fn hsv_to_rgb([h, s, v]: [f64; 3]) -> [f64; 3] {
    if s == 0.0 {
        return [v; 3];
    }
    let h = if h >= 1.0 { 0.0 } else { h * 6.0 };
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    // Sector is in 0..6.
    #[allow(clippy::cast_possible_truncation)]
    let sector = sector as i32;
    match sector {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

impl Segment {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }
    /// Color at `pos`, an absolute gradient position inside this segment.
    #[must_use]
    pub fn color_at(&self, context: &Context, pos: f64) -> Color {
        let width = self.width();
        let (middle, pos) = if width < EPSILON {
            (0.5, 0.5)
        } else {
            ((self.middle - self.left) / width, (pos - self.left) / width)
        };
        let factor = self.blend.factor(middle, pos);
        let left = end_color(self.left_source, self.left_color, context).map(f64::from);
        let right = end_color(self.right_source, self.right_color, context).map(f64::from);
        let lerp = |a: f64, b: f64| a + (b - a) * factor;

        let rgb = match self.coloring {
            SegmentColoring::Rgb => [lerp(left[0], right[0]), lerp(left[1], right[1]), lerp(left[2], right[2])],
            coloring => {
                let [lh, ls, lv] = rgb_to_hsv([left[0], left[1], left[2]]);
                let [rh, rs, rv] = rgb_to_hsv([right[0], right[1], right[2]]);
                let h = match coloring {
                    SegmentColoring::HsvCcw if lh < rh => lh + (rh - lh) * factor,
                    SegmentColoring::HsvCcw => {
                        let h = lh + (1.0 - (lh - rh)) * factor;
                        if h > 1.0 {
                            h - 1.0
                        } else {
                            h
                        }
                    }
                    _ if rh < lh => lh - (lh - rh) * factor,
                    _ => {
                        let h = lh - (1.0 - (rh - lh)) * factor;
                        if h < 0.0 {
                            h + 1.0
                        } else {
                            h
                        }
                    }
                };
                hsv_to_rgb([h, lerp(ls, rs), lerp(lv, rv)])
            }
        };
        let alpha = lerp(left[3], right[3]);
        #[allow(clippy::cast_possible_truncation)]
        let rgba = [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32, alpha as f32];
        Color::from_straight_lossy(rgba)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Gradient {
    name: String,
    #[serde(rename = "segment")]
    segments: Vec<Segment>,
}
impl Default for Gradient {
    fn default() -> Self {
        Self {
            name: "Untitled".to_owned(),
            segments: vec![Segment::default()],
        }
    }
}
impl Data for Gradient {
    const FOLDER: &'static str = "gradients";
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
        let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) else {
            return Err("gradient has no segments".to_owned());
        };
        if first.left.abs() > JOIN_EPSILON || (last.right - 1.0).abs() > JOIN_EPSILON {
            return Err(format!("segments span {}..{}, not 0..1", first.left, last.right));
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if !(segment.left <= segment.middle && segment.middle <= segment.right) {
                return Err(format!("segment {index} is out of order"));
            }
        }
        for (index, pair) in self.segments.windows(2).enumerate() {
            if (pair[0].right - pair[1].left).abs() > JOIN_EPSILON {
                return Err(format!("segments {index} and {} don't meet", index + 1));
            }
        }
        Ok(())
    }
}

impl Gradient {
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }
    pub fn segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.segments.get_mut(index)
    }
    /// Index of the segment covering `pos`, clamped into `0.0..=1.0`. On a boundary the left
    /// segment wins.
    #[must_use]
    pub fn segment_at(&self, pos: f64) -> Option<usize> {
        let pos = pos.clamp(0.0, 1.0);
        self.segments
            .iter()
            .position(|s| pos >= s.left && pos <= s.right)
            .or_else(|| (!self.segments.is_empty()).then(|| self.segments.len() - 1))
    }
    /// Color at `pos` in `0.0..=1.0`, running right to left when `reverse`.
    #[must_use]
    pub fn color_at(&self, context: &Context, pos: f64, reverse: bool) -> Color {
        let pos = pos.clamp(0.0, 1.0);
        let pos = if reverse { 1.0 - pos } else { pos };
        self.segment_at(pos)
            .map_or(Color::TRANSPARENT, |i| self.segments[i].color_at(context, pos))
    }
    /// Whether any end color follows the context's foreground or background.
    #[must_use]
    pub fn uses_context_colors(&self) -> bool {
        self.segments.iter().any(|s| {
            s.left_source != ColorSource::Fixed || s.right_source != ColorSource::Fixed
        })
    }
    /// Split a segment at its middle. The new joint gets the color the gradient had there.
    /// Returns the index of the right half.
    pub fn split_midpoint(&mut self, context: &Context, index: usize) -> Option<usize> {
        let segment = *self.segments.get(index)?;
        let color = segment.color_at(context, segment.middle);
        let left = Segment {
            right: segment.middle,
            middle: (segment.left + segment.middle) / 2.0,
            right_color: color,
            right_source: ColorSource::Fixed,
            ..segment
        };
        let right = Segment {
            left: segment.middle,
            middle: (segment.middle + segment.right) / 2.0,
            left_color: color,
            left_source: ColorSource::Fixed,
            ..segment
        };
        self.segments[index] = left;
        self.segments.insert(index + 1, right);
        Some(index + 1)
    }
    /// Split a segment into `parts` equal segments that reproduce its colors at their joints.
    /// Returns the index range of the new segments.
    pub fn split_uniform(
        &mut self,
        context: &Context,
        index: usize,
        parts: usize,
    ) -> Option<std::ops::Range<usize>> {
        let segment = *self.segments.get(index)?;
        if parts == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let step = segment.width() / parts as f64;
        let mut pieces: Vec<Segment> = (0..parts)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let left = segment.left + i as f64 * step;
                let right = left + step;
                Segment {
                    left,
                    middle: (left + right) / 2.0,
                    right,
                    left_color: segment.color_at(context, left),
                    left_source: ColorSource::Fixed,
                    right_color: segment.color_at(context, right),
                    right_source: ColorSource::Fixed,
                    ..segment
                }
            })
            .collect();
        if let Some(first) = pieces.first_mut() {
            first.left = segment.left;
            first.left_color = segment.left_color;
            first.left_source = segment.left_source;
        }
        if let Some(last) = pieces.last_mut() {
            last.right = segment.right;
            last.right_color = segment.right_color;
            last.right_source = segment.right_source;
        }
        self.segments.splice(index..=index, pieces);
        Some(index..index + parts)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(color: Color, expected: [f32; 4]) -> bool {
        color
            .to_straight()
            .iter()
            .zip(expected)
            .all(|(a, b)| (a - b).abs() < 1e-5)
    }

    #[test]
    fn standard_runs_black_to_white() {
        let gradient = Gradient::standard();
        let context = Context::default();
        assert_eq!(gradient.color_at(&context, 0.0, false), Color::BLACK);
        assert_eq!(gradient.color_at(&context, 1.0, false), Color::WHITE);
        assert!(close(gradient.color_at(&context, 0.5, false), [0.5, 0.5, 0.5, 1.0]));
        assert!(close(gradient.color_at(&context, 0.25, true), [0.75, 0.75, 0.75, 1.0]));
        // Out of range positions clamp.
        assert_eq!(gradient.color_at(&context, 7.0, false), Color::WHITE);
    }
    #[test]
    fn middle_bends_linear_blend() {
        assert_eq!(SegmentBlend::Linear.factor(0.25, 0.25), 0.5);
        assert_eq!(SegmentBlend::Linear.factor(0.25, 0.625), 0.75);
        assert_eq!(SegmentBlend::Linear.factor(0.0, 0.0), 0.0);
        assert!((SegmentBlend::Curved.factor(0.5, 0.3) - 0.3).abs() < 1e-12);
        assert!((SegmentBlend::Sine.factor(0.5, 0.5) - 0.5).abs() < 1e-12);
        assert_eq!(SegmentBlend::SphereIncreasing.factor(0.5, 1.0), 1.0);
        assert_eq!(SegmentBlend::SphereDecreasing.factor(0.5, 0.0), 0.0);
    }
    #[test]
    fn context_colors() {
        let mut context = Context::default();
        context.set_foreground(Color::from_straight_lossy([1.0, 0.0, 0.0, 1.0]));
        let gradient = Gradient {
            segments: vec![Segment {
                left_source: ColorSource::ForegroundTransparent,
                right_source: ColorSource::Foreground,
                ..Segment::default()
            }],
            ..Gradient::standard()
        };
        assert!(gradient.uses_context_colors());
        assert!(close(gradient.color_at(&context, 0.5, false), [1.0, 0.0, 0.0, 0.5]));
        assert_eq!(gradient.color_at(&context, 0.0, false), Color::TRANSPARENT);
    }
    #[test]
    fn hue_direction() {
        let context = Context::default();
        let red = Color::from_straight_lossy([1.0, 0.0, 0.0, 1.0]);
        let blue = Color::from_straight_lossy([0.0, 0.0, 1.0, 1.0]);
        let segment = |coloring| Segment {
            left_color: red,
            right_color: blue,
            coloring,
            ..Segment::default()
        };
        let ccw = segment(SegmentColoring::HsvCcw).color_at(&context, 0.5);
        assert!(close(ccw, [0.0, 1.0, 0.0, 1.0]));
        let cw = segment(SegmentColoring::HsvCw).color_at(&context, 0.5);
        assert!(close(cw, [1.0, 0.0, 1.0, 1.0]));
    }
    #[test]
    fn splitting_keeps_colors() {
        let context = Context::default();
        let mut gradient = Gradient::standard();
        assert_eq!(gradient.split_midpoint(&context, 0), Some(1));
        assert_eq!(gradient.segments().len(), 2);
        assert_eq!(gradient.segment(0).unwrap().right, 0.5);
        assert_eq!(gradient.segment(1).unwrap().middle, 0.75);
        assert!(gradient.validate().is_ok());
        assert!(close(gradient.color_at(&context, 0.5, false), [0.5, 0.5, 0.5, 1.0]));

        assert_eq!(gradient.split_uniform(&context, 1, 2), Some(1..3));
        assert_eq!(gradient.segments().len(), 3);
        assert!(gradient.validate().is_ok());
        assert_eq!(gradient.segment(2).unwrap().right_color, Color::WHITE);
        assert!(close(gradient.segment(1).unwrap().right_color, [0.75, 0.75, 0.75, 1.0]));
        assert_eq!(gradient.segment_at(0.6), Some(1));
        assert_eq!(gradient.split_uniform(&context, 9, 2), None);
    }
    #[test]
    fn gaps_are_invalid() {
        let gradient = Gradient {
            segments: vec![
                Segment {
                    right: 0.4,
                    middle: 0.2,
                    ..Segment::default()
                },
                Segment {
                    left: 0.6,
                    ..Segment::default()
                },
            ],
            ..Gradient::standard()
        };
        assert!(gradient.validate().is_err());
        let empty = Gradient {
            segments: Vec::new(),
            ..Gradient::standard()
        };
        assert!(empty.validate().is_err());
    }
    #[test]
    fn save_and_load() {
        let dir = super::super::factory::test_util::scratch_dir("gradient_save_and_load");
        let context = Context::default();
        let mut gradient = Gradient::standard();
        gradient.set_name("Sunset".to_owned());
        gradient.split_midpoint(&context, 0);
        if let Some(segment) = gradient.segment_mut(1) {
            segment.blend = SegmentBlend::Sine;
            segment.coloring = SegmentColoring::HsvCw;
            segment.right_source = ColorSource::Background;
        }
        let path = dir.join("Sunset.toml");
        super::super::save(&gradient, &path).unwrap();
        let loaded: Gradient = super::super::load(&path).unwrap();
        assert_eq!(loaded, gradient);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
