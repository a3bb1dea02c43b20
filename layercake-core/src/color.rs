use crate::util::{FiniteF32, FiniteF32Error};

/// A premultiplied, linear RGBA color. All fully transparent colors are normalized to
/// [`Color::TRANSPARENT`], so comparing two colors compares what they look like.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color([FiniteF32; 4]);
impl Color {
    pub const TRANSPARENT: Self = Self([FiniteF32::ZERO; 4]);
    pub const WHITE: Self = Self([FiniteF32::ONE; 4]);
    pub const BLACK: Self = Self([
        FiniteF32::ZERO,
        FiniteF32::ZERO,
        FiniteF32::ZERO,
        FiniteF32::ONE,
    ]);
    /// From premultiplied components. Non-finite components are an error.
    pub fn from_array(rgba: [f32; 4]) -> Result<Self, FiniteF32Error> {
        let [r, g, b, a] = rgba;
        if a == 0.0 {
            // Still validate the rest, for consistency.
            for c in [r, g, b] {
                FiniteF32::new(c)?;
            }
            return Ok(Self::TRANSPARENT);
        }
        Ok(Self([
            FiniteF32::new(r)?,
            FiniteF32::new(g)?,
            FiniteF32::new(b)?,
            FiniteF32::new(a)?,
        ]))
    }
    /// From straight (not premultiplied) components, which is how people usually write colors.
    pub fn from_straight(rgba: [f32; 4]) -> Result<Self, FiniteF32Error> {
        let [r, g, b, a] = rgba;
        Self::from_array([r * a, g * a, b * a, a])
    }
    /// From straight components, replacing non-finite values with zero.
    #[must_use]
    pub fn from_straight_lossy(rgba: [f32; 4]) -> Self {
        Self::from_straight(rgba.map(|c| FiniteF32::new_lossy(c).get())).unwrap_or(Self::TRANSPARENT)
    }
    /// Premultiplied components.
    #[must_use]
    pub fn as_array(self) -> [f32; 4] {
        self.0.map(FiniteF32::get)
    }
    #[must_use]
    pub fn alpha(self) -> f32 {
        self.0[3].get()
    }
    /// Straight components. Transparent yields all zeros.
    #[must_use]
    pub fn to_straight(self) -> [f32; 4] {
        let [r, g, b, a] = self.as_array();
        if a == 0.0 {
            [0.0; 4]
        } else {
            [r / a, g / a, b / a, a]
        }
    }
    /// Same color, fully opaque.
    #[must_use]
    pub fn opaque(self) -> Self {
        let [r, g, b, _] = self.to_straight();
        Self::from_straight_lossy([r, g, b, 1.0])
    }
    /// Premultiplied luminance, used when a color lands in a grayscale buffer.
    #[must_use]
    pub fn luminance(self) -> f32 {
        let [r, g, b, _] = self.as_array();
        luminance([r, g, b])
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
impl TryFrom<[f32; 4]> for Color {
    type Error = FiniteF32Error;
    fn try_from(value: [f32; 4]) -> Result<Self, Self::Error> {
        Self::from_array(value)
    }
}
impl From<Color> for [f32; 4] {
    fn from(value: Color) -> Self {
        value.as_array()
    }
}

/// Rec. 709 luma weights.
#[must_use]
pub fn luminance([r, g, b]: [f32; 3]) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn transparent_normalized() {
        let a = Color::from_array([1.0, 0.5, 0.0, 0.0]).unwrap();
        assert_eq!(a, Color::TRANSPARENT);
    }
    #[test]
    fn straight_round_trip() {
        let c = Color::from_straight([1.0, 0.5, 0.25, 0.5]).unwrap();
        assert_eq!(c.as_array(), [0.5, 0.25, 0.125, 0.5]);
        assert_eq!(c.to_straight(), [1.0, 0.5, 0.25, 0.5]);
    }
    #[test]
    fn rejects_nan() {
        assert!(Color::from_array([f32::NAN, 0.0, 0.0, 1.0]).is_err());
    }
}
