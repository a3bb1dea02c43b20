use super::Buffer;
use crate::blend::LayerMode;
use crate::util::Rect;

bitflags::bitflags! {
    /// Which components of the destination a composite may write.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct ComponentMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const COLOR = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL = Self::COLOR.bits() | Self::ALPHA.bits();
    }
}
impl Default for ComponentMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// One "apply buffer onto destination" operation.
#[derive(Clone, Copy, Debug)]
pub struct Composite<'a> {
    pub apply: &'a Buffer,
    /// Where the apply buffer's origin lands, in destination coordinates.
    pub apply_offset: [i32; 2],
    /// Scales the coverage of each pixel by the mask's value.
    pub mask: Option<&'a Buffer>,
    /// Where the mask's origin lands, in destination coordinates.
    pub mask_offset: [i32; 2],
    pub opacity: f32,
    pub mode: LayerMode,
    pub affect: ComponentMask,
    /// Destination pixels outside of this are left untouched.
    pub output: Rect,
}
impl<'a> Composite<'a> {
    /// Normal mode, full opacity, no mask, affecting the whole destination.
    #[must_use]
    pub fn new(apply: &'a Buffer, apply_offset: [i32; 2], output: Rect) -> Self {
        Self {
            apply,
            apply_offset,
            mask: None,
            mask_offset: apply_offset,
            opacity: 1.0,
            mode: LayerMode::Normal,
            affect: ComponentMask::ALL,
            output,
        }
    }
}

/// The pixel engine seam. Composites are synchronous and only touch the destination.
pub trait Applicator {
    /// Composite `params.apply` over `dest` in place.
    fn composite(&self, dest: &mut Buffer, params: &Composite<'_>);
}

/// Straightforward CPU implementation, parallel over rows.
#[derive(Copy, Clone, Debug, Default)]
pub struct ReferenceApplicator;

impl Applicator for ReferenceApplicator {
    fn composite(&self, dest: &mut Buffer, params: &Composite<'_>) {
        use rayon::iter::{IndexedParallelIterator, ParallelIterator};
        use rayon::slice::ParallelSliceMut;

        let Some(region) = params.output.intersect(&dest.extent()) else {
            return;
        };
        let format = dest.format();
        let width = dest.width().unsigned_abs() as usize;
        let skip = region.y.unsigned_abs() as usize;
        let take = region.height.unsigned_abs() as usize;

        dest.pixels_mut()
            .par_chunks_mut(width)
            .enumerate()
            .skip(skip)
            .take(take)
            .for_each(|(y, row)| {
                // `y` came from a row count that started as an i32.
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let y = y as i32;
                for x in region.x..region.x2() {
                    let Some(source) = params
                        .apply
                        .get(x - params.apply_offset[0], y - params.apply_offset[1])
                    else {
                        continue;
                    };
                    let mut coverage = params.opacity;
                    if let Some(mask) = params.mask {
                        coverage *= mask
                            .mask_value(x - params.mask_offset[0], y - params.mask_offset[1]);
                    }
                    let slot = &mut row[x.unsigned_abs() as usize];
                    let blended = blend_pixel(params.mode, *slot, source, coverage, [x, y]);
                    let merged = merge_components(*slot, blended, params.affect);
                    *slot = format.normalize(merged);
                }
            });
    }
}

fn merge_components(backdrop: [f32; 4], blended: [f32; 4], affect: ComponentMask) -> [f32; 4] {
    let flags = [
        ComponentMask::RED,
        ComponentMask::GREEN,
        ComponentMask::BLUE,
        ComponentMask::ALPHA,
    ];
    let mut out = backdrop;
    for (i, flag) in flags.into_iter().enumerate() {
        if affect.contains(flag) {
            out[i] = blended[i];
        }
    }
    out
}

/// Premultiplied separable compositing:
/// `out = (1 - ab) * S + (1 - as) * B + as * ab * blend(cb, cs)`.
fn blend_pixel(
    mode: LayerMode,
    backdrop: [f32; 4],
    source: [f32; 4],
    coverage: f32,
    [x, y]: [i32; 2],
) -> [f32; 4] {
    let source = source.map(|c| c * coverage);
    let (sa, ba) = (source[3], backdrop[3]);
    if sa <= 0.0 {
        return backdrop;
    }
    if mode == LayerMode::Dissolve {
        return if dissolve_noise(x, y) < sa {
            // Wins the roll: lands fully opaque.
            [source[0] / sa, source[1] / sa, source[2] / sa, 1.0]
        } else {
            backdrop
        };
    }
    let mut out = [0.0; 4];
    for c in 0..3 {
        let cs = source[c] / sa;
        let cb = if ba > 0.0 { backdrop[c] / ba } else { 0.0 };
        out[c] = (1.0 - ba) * source[c] + (1.0 - sa) * backdrop[c] + sa * ba * mode.blend_channel(cb, cs);
    }
    out[3] = sa + ba - sa * ba;
    out
}

/// Deterministic per-pixel noise in `[0, 1)`.
#[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn dissolve_noise(x: i32, y: i32) -> f32 {
    let mut h = (x as u32).wrapping_mul(0x9E37_79B1) ^ (y as u32).wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    (h >> 8) as f32 / (1u32 << 24) as f32
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::{BaseType, Format, Precision};
    use crate::color::Color;

    const RGBA: Format = Format::new(BaseType::Rgb, Precision::Float, true);

    #[test]
    fn normal_over_transparent_is_exact() {
        let mut src = Buffer::new(3, 3, RGBA).unwrap();
        src.set_color(Rect::new(0, 0, 3, 3), Color::from_straight([0.2, 0.4, 0.6, 0.7]).unwrap());
        let mut dest = Buffer::new(3, 3, RGBA).unwrap();
        let extent = dest.extent();
        ReferenceApplicator.composite(&mut dest, &Composite::new(&src, [0, 0], extent));
        assert_eq!(dest, src);
    }
    #[test]
    fn output_rect_respected() {
        let mut src = Buffer::new(4, 4, RGBA).unwrap();
        src.set_color(src.extent(), Color::WHITE);
        let mut dest = Buffer::new(4, 4, RGBA).unwrap();
        ReferenceApplicator.composite(
            &mut dest,
            &Composite::new(&src, [0, 0], Rect::new(1, 1, 1, 1)),
        );
        assert_eq!(dest.get(1, 1), Some([1.0; 4]));
        assert_eq!(dest.get(0, 0), Some([0.0; 4]));
        assert_eq!(dest.get(2, 2), Some([0.0; 4]));
    }
    #[test]
    fn mask_and_opacity() {
        let mut src = Buffer::new(2, 1, RGBA).unwrap();
        src.set_color(src.extent(), Color::WHITE);
        let mut mask = Buffer::new(2, 1, Format::mask(Precision::Float)).unwrap();
        mask.set_color(Rect::new(0, 0, 1, 1), Color::WHITE);
        let mut dest = Buffer::new(2, 1, RGBA).unwrap();
        let mut params = Composite::new(&src, [0, 0], dest.extent());
        params.mask = Some(&mask);
        params.opacity = 0.5;
        ReferenceApplicator.composite(&mut dest, &params);
        assert_eq!(dest.get(0, 0), Some([0.5; 4]));
        // Masked away entirely.
        assert_eq!(dest.get(1, 0), Some([0.0; 4]));
    }
    #[test]
    fn alpha_not_affected() {
        let mut src = Buffer::new(1, 1, RGBA).unwrap();
        src.set_color(src.extent(), Color::WHITE);
        let mut dest = Buffer::new(1, 1, RGBA).unwrap();
        dest.set_color(dest.extent(), Color::BLACK);
        let mut params = Composite::new(&src, [0, 0], dest.extent());
        params.affect = ComponentMask::COLOR;
        ReferenceApplicator.composite(&mut dest, &params);
        assert_eq!(dest.get(0, 0), Some([1.0; 4]));
    }
}
