//! Utility types, used throughout the crate.

/// A float which is non-NaN and non-infinite.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
#[repr(transparent)]
pub struct FiniteF32(f32);
impl FiniteF32 {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);
    pub fn new(val: f32) -> Result<Self, FiniteF32Error> {
        if val.is_finite() {
            Ok(Self(val))
        } else {
            Err(FiniteF32Error::NotFinite)
        }
    }
    /// Replace non-finite values with zero.
    #[must_use]
    pub fn new_lossy(val: f32) -> Self {
        Self::new(val).unwrap_or(Self::ZERO)
    }
    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for FiniteF32 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<f32> for FiniteF32 {
    type Error = FiniteF32Error;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<FiniteF32> for f32 {
    fn from(value: FiniteF32) -> Self {
        value.get()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiniteF32Error {
    #[error("not finite")]
    NotFinite,
}

// No NaN can be constructed, so equality is reflexive.
impl Eq for FiniteF32 {}
#[allow(clippy::derive_ord_xor_partial_ord)]
impl Ord for FiniteF32 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl std::hash::Hash for FiniteF32 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Normalize -0.0 so that it hashes like 0.0, matching `==`.
        let bits = if self.0 == 0.0 { 0 } else { self.0.to_bits() };
        state.write_u32(bits);
    }
}

/// An integer rectangle, in pixels. `x`/`y` is the top-left corner.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}
impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    /// Construct from two corners, `(x1, y1)` inclusive and `(x2, y2)` exclusive.
    #[must_use]
    pub const fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }
    #[must_use]
    pub const fn x2(&self) -> i32 {
        self.x + self.width
    }
    #[must_use]
    pub const fn y2(&self) -> i32 {
        self.y + self.height
    }
    #[must_use]
    pub const fn offset(&self) -> [i32; 2] {
        [self.x, self.y]
    }
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }
    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.x2().max(other.x2()),
            self.y2().max(other.y2()),
        )
    }
    /// Overlapping area, or `None` if the rectangles are disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let rect = Self::from_corners(
            self.x.max(other.x),
            self.y.max(other.y),
            self.x2().min(other.x2()),
            self.y2().min(other.y2()),
        );
        (!rect.is_empty()).then_some(rect)
    }
    #[must_use]
    pub const fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
    /// Number of pixels covered. Negative extents count as empty.
    #[must_use]
    pub fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            u64::from(self.width.unsigned_abs()) * u64::from(self.height.unsigned_abs())
        }
    }
}

/// Round half away from zero and saturate into an `i32`.
#[must_use]
pub fn round_i32(value: f64) -> i32 {
    use az::SaturatingAs;
    if value.is_nan() {
        0
    } else {
        value.round().saturating_as::<i32>()
    }
}
