//! # Buffers
//!
//! A rectangular block of pixels plus the format they are meant to be stored in. Pixels are kept
//! as premultiplied `f32` RGBA no matter the format; the format decides how values are quantized
//! when written and how many bytes the buffer is accounted as.
//!
//! Compositing lives behind the [`Applicator`] trait so a faster engine can be dropped in.

mod applicator;

pub use applicator::{Applicator, ComponentMask, Composite, ReferenceApplicator};

use crate::color::{luminance, Color};
use crate::util::Rect;

#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum BaseType {
    Rgb,
    Gray,
    /// Palette based. Palettes are not modeled here, values are kept as 8 bit color.
    Indexed,
}

#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
/// Ordered from least to most precise.
pub enum Precision {
    U8,
    U16,
    Half,
    U32,
    Float,
}
impl Precision {
    #[must_use]
    pub const fn bytes_per_component(self) -> u64 {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::Half => 2,
            Self::U32 | Self::Float => 4,
        }
    }
    /// Round a component to the nearest representable value.
    #[must_use]
    pub fn quantize(self, value: f32) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        fn steps(value: f32, max: u32) -> f32 {
            let max = max as f32;
            (value.clamp(0.0, 1.0) * max).round() / max
        }
        match self {
            Self::U8 => steps(value, u32::from(u8::MAX)),
            Self::U16 => steps(value, u32::from(u16::MAX)),
            // f32 cannot hold all of u32's steps anyway, so clamping is all that's observable.
            Self::U32 => value.clamp(0.0, 1.0),
            // Keep 11 significant bits.
            Self::Half => f32::from_bits(value.to_bits() & 0xFFFF_E000),
            Self::Float => value,
        }
    }
}

/// Base type, precision and alpha of a pixel buffer.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct Format {
    pub base_type: BaseType,
    pub precision: Precision,
    pub has_alpha: bool,
}
impl Format {
    #[must_use]
    pub const fn new(base_type: BaseType, precision: Precision, has_alpha: bool) -> Self {
        Self {
            base_type,
            precision,
            has_alpha,
        }
    }
    /// Single component, no alpha. The format of channels and masks.
    #[must_use]
    pub const fn mask(precision: Precision) -> Self {
        Self::new(BaseType::Gray, precision, false)
    }
    #[must_use]
    pub const fn with_alpha(self) -> Self {
        Self::new(self.base_type, self.precision, true)
    }
    #[must_use]
    pub const fn without_alpha(self) -> Self {
        Self::new(self.base_type, self.precision, false)
    }
    #[must_use]
    pub const fn components(self) -> u64 {
        let color = match self.base_type {
            BaseType::Rgb => 3,
            BaseType::Gray | BaseType::Indexed => 1,
        };
        if self.has_alpha {
            color + 1
        } else {
            color
        }
    }
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u64 {
        match self.base_type {
            // Indexed pixels are an index byte (plus alpha), whatever the precision.
            BaseType::Indexed => self.components(),
            _ => self.components() * self.precision.bytes_per_component(),
        }
    }
    /// Force a premultiplied pixel into what this format can represent.
    #[must_use]
    pub fn normalize(self, [r, g, b, a]: [f32; 4]) -> [f32; 4] {
        let precision = match self.base_type {
            BaseType::Indexed => Precision::U8,
            _ => self.precision,
        };
        let (a, rgb) = if self.has_alpha {
            (a, [r, g, b])
        } else if a > 0.0 {
            // Drop alpha by un-premultiplying against nothing behind.
            (1.0, [r / a, g / a, b / a])
        } else {
            (1.0, [0.0; 3])
        };
        let a = precision.quantize(a);
        let rgb = match self.base_type {
            BaseType::Gray if rgb[0] == rgb[1] && rgb[1] == rgb[2] => rgb,
            BaseType::Gray => [luminance(rgb); 3],
            BaseType::Rgb | BaseType::Indexed => rgb,
        };
        let [r, g, b] = rgb.map(|c| precision.quantize(c).min(a));
        [r, g, b, a]
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("invalid buffer size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },
    #[error("failed to allocate a {width}x{height} buffer")]
    AllocationFailed { width: i32, height: i32 },
}

#[derive(Clone, PartialEq, Debug)]
pub struct Buffer {
    format: Format,
    width: i32,
    height: i32,
    pixels: Vec<[f32; 4]>,
}
impl Buffer {
    /// Allocate a transparent buffer. Reports allocation failure instead of aborting.
    pub fn new(width: i32, height: i32, format: Format) -> Result<Self, BufferError> {
        if width <= 0 || height <= 0 {
            return Err(BufferError::InvalidSize { width, height });
        }
        let failed = BufferError::AllocationFailed { width, height };
        let len = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(w, h)| w.checked_mul(h))
            .ok_or(failed)?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| failed)?;
        let fill = format.normalize([0.0; 4]);
        pixels.resize(len, fill);
        Ok(Self {
            format,
            width,
            height,
            pixels,
        })
    }
    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }
    /// The buffer's own area, at the origin.
    #[must_use]
    pub fn extent(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
    /// Bytes this buffer would occupy in its declared format.
    #[must_use]
    pub fn memsize(&self) -> u64 {
        self.extent().area() * self.format.bytes_per_pixel()
    }
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.extent().contains(x, y) {
            return None;
        }
        // Both in range and non-negative, checked above.
        let (x, y, w) = (x.unsigned_abs() as usize, y.unsigned_abs() as usize, self.width.unsigned_abs() as usize);
        Some(y * w + x)
    }
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        self.index(x, y).map(|i| self.pixels[i])
    }
    /// Write a single pixel, normalized to this buffer's format. Out of bounds is ignored.
    pub fn put(&mut self, x: i32, y: i32, pixel: [f32; 4]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = self.format.normalize(pixel);
        }
    }
    pub(crate) fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, [f32; 4]> {
        let width = self.width.unsigned_abs() as usize;
        self.pixels.chunks_exact_mut(width)
    }
    pub(crate) fn pixels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.pixels
    }
    /// Clear the given area to transparent (or opaque black, without alpha). `None` clears everything.
    pub fn clear(&mut self, rect: Option<Rect>) {
        let fill = self.format.normalize([0.0; 4]);
        self.fill_raw(rect.unwrap_or_else(|| self.extent()), fill);
    }
    /// Fill the given area with a color.
    pub fn set_color(&mut self, rect: Rect, color: Color) {
        let fill = self.format.normalize(color.as_array());
        self.fill_raw(rect, fill);
    }
    fn fill_raw(&mut self, rect: Rect, fill: [f32; 4]) {
        let Some(rect) = rect.intersect(&self.extent()) else {
            return;
        };
        let (x1, x2) = (rect.x.unsigned_abs() as usize, rect.x2().unsigned_abs() as usize);
        for row in self
            .rows_mut()
            .skip(rect.y.unsigned_abs() as usize)
            .take(rect.height.unsigned_abs() as usize)
        {
            row[x1..x2].fill(fill);
        }
    }
    /// Copy `src_rect` of `src` into this buffer, placing its top-left corner at `dst_offset`.
    /// Anything falling outside either buffer is skipped.
    pub fn copy_from(&mut self, src: &Buffer, src_rect: Rect, dst_offset: [i32; 2]) {
        let Some(src_rect) = src_rect.intersect(&src.extent()) else {
            return;
        };
        let dx = dst_offset[0] - src_rect.x;
        let dy = dst_offset[1] - src_rect.y;
        let Some(dst_rect) = src_rect.translate(dx, dy).intersect(&self.extent()) else {
            return;
        };
        for y in dst_rect.y..dst_rect.y2() {
            for x in dst_rect.x..dst_rect.x2() {
                if let Some(pixel) = src.get(x - dx, y - dy) {
                    self.put(x, y, pixel);
                }
            }
        }
    }
    /// A new buffer holding a copy of `rect`. Parts of `rect` outside this buffer stay transparent.
    pub fn copy_region(&self, rect: Rect) -> Result<Buffer, BufferError> {
        let mut region = Buffer::new(rect.width, rect.height, self.format)?;
        region.copy_from(self, rect, [0, 0]);
        Ok(region)
    }
    /// A copy of this buffer in another format.
    pub fn convert(&self, format: Format) -> Result<Buffer, BufferError> {
        if format == self.format {
            return Ok(self.clone());
        }
        let mut converted = Buffer::new(self.width, self.height, format)?;
        for (dst, src) in converted.pixels.iter_mut().zip(&self.pixels) {
            *dst = format.normalize(*src);
        }
        Ok(converted)
    }
    /// Read a pixel as a mask value. Masks store their value in every color component.
    #[must_use]
    pub fn mask_value(&self, x: i32, y: i32) -> f32 {
        self.get(x, y).map_or(0.0, |[v, ..]| v)
    }
    /// Bounds of all pixels with a nonzero mask value, or `None` if there are none.
    #[must_use]
    pub fn mask_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.mask_value(x, y) > 0.0 {
                    let pixel = Rect::new(x, y, 1, 1);
                    bounds = Some(bounds.map_or(pixel, |b| b.union(&pixel)));
                }
            }
        }
        bounds
    }
}

#[cfg(test)]
mod test {
    use super::*;
    const RGBA: Format = Format::new(BaseType::Rgb, Precision::Float, true);
    #[test]
    fn rejects_empty() {
        assert_eq!(
            Buffer::new(0, 5, RGBA),
            Err(BufferError::InvalidSize {
                width: 0,
                height: 5
            })
        );
    }
    #[test]
    fn fill_and_copy() {
        let mut a = Buffer::new(4, 4, RGBA).unwrap();
        a.set_color(Rect::new(1, 1, 2, 2), Color::WHITE);
        assert_eq!(a.get(0, 0), Some([0.0; 4]));
        assert_eq!(a.get(1, 1), Some([1.0; 4]));

        let mut b = Buffer::new(4, 4, RGBA).unwrap();
        // Move the square into the bottom-right corner.
        b.copy_from(&a, Rect::new(1, 1, 2, 2), [2, 2]);
        assert_eq!(b.get(3, 3), Some([1.0; 4]));
        assert_eq!(b.get(1, 1), Some([0.0; 4]));
        // Clipped copy shouldn't panic.
        b.copy_from(&a, a.extent(), [-10, 3]);
    }
    #[test]
    fn quantize_u8() {
        let gray8 = Format::new(BaseType::Gray, Precision::U8, false);
        let [v, _, _, a] = gray8.normalize([0.5, 0.5, 0.5, 1.0]);
        assert_eq!(a, 1.0);
        assert_eq!(v, (0.5f32 * 255.0).round() / 255.0);
    }
    #[test]
    fn mask_bounds() {
        let mut mask = Buffer::new(10, 10, Format::mask(Precision::U8)).unwrap();
        assert_eq!(mask.mask_bounds(), None);
        mask.set_color(Rect::new(2, 3, 4, 1), Color::WHITE);
        assert_eq!(mask.mask_bounds(), Some(Rect::new(2, 3, 4, 1)));
    }
    #[test]
    fn memsize_follows_format() {
        let buffer = Buffer::new(10, 10, Format::new(BaseType::Rgb, Precision::U16, true)).unwrap();
        assert_eq!(buffer.memsize(), 10 * 10 * 4 * 2);
    }
}
