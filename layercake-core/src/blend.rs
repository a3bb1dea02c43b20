#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(u8)]
pub enum LayerMode {
    #[default]
    Normal,
    /// Per-pixel random choice between source and backdrop, weighted by source alpha.
    Dissolve,
    Multiply,
    Screen,
    Overlay,
    Addition,
    Difference,
    Darken,
    Lighten,
}
impl LayerMode {
    /// The separable blend function `B(backdrop, source)` on straight color components.
    /// Dissolve has no blend function of its own, it composites like normal where it lands.
    #[must_use]
    pub fn blend_channel(self, backdrop: f32, source: f32) -> f32 {
        match self {
            Self::Normal | Self::Dissolve => source,
            Self::Multiply => backdrop * source,
            Self::Screen => backdrop + source - backdrop * source,
            // Overlay is hard-light with the arguments swapped.
            Self::Overlay => {
                if backdrop <= 0.5 {
                    2.0 * backdrop * source
                } else {
                    let b = 2.0 * backdrop - 1.0;
                    b + source - b * source
                }
            }
            Self::Addition => (backdrop + source).min(1.0),
            Self::Difference => (backdrop - source).abs(),
            Self::Darken => backdrop.min(source),
            Self::Lighten => backdrop.max(source),
        }
    }
}

/// Blend mode and opacity of a layer.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    pub mode: LayerMode,
    /// Opacity modulate, in `[0, 1]`.
    pub opacity: f32,
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            mode: LayerMode::default(),
            opacity: 1.0,
        }
    }
}
impl Blend {
    #[must_use]
    pub fn new(mode: LayerMode, opacity: f32) -> Self {
        Self {
            mode,
            opacity: clamp_opacity(opacity),
        }
    }
}

#[must_use]
pub fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn normal_is_source() {
        assert_eq!(LayerMode::Normal.blend_channel(0.3, 0.7), 0.7);
    }
    #[test]
    fn multiply_white_identity() {
        assert_eq!(LayerMode::Multiply.blend_channel(0.25, 1.0), 0.25);
    }
    #[test]
    fn opacity_clamped() {
        assert_eq!(Blend::new(LayerMode::Normal, 3.0).opacity, 1.0);
        assert_eq!(Blend::new(LayerMode::Normal, f32::NAN).opacity, 1.0);
        assert_eq!(Blend::new(LayerMode::Normal, -1.0).opacity, 0.0);
    }
}
