//! The user's current painting state: colors, paint mode and opacity, and the data registries
//! the active records are picked from.

use crate::blend::{clamp_opacity, LayerMode};
use crate::color::Color;
use crate::data::{
    brush::GeneratedBrush, dynamics::Dynamics, factory::DataFactory, gradient::Gradient,
    palette::Palette, pattern::Pattern, template::Template,
};

#[derive(Debug)]
pub struct Context {
    foreground: Color,
    background: Color,
    paint_mode: LayerMode,
    opacity: f32,
    pub palettes: DataFactory<Palette>,
    pub patterns: DataFactory<Pattern>,
    pub gradients: DataFactory<Gradient>,
    pub brushes: DataFactory<GeneratedBrush>,
    pub dynamics: DataFactory<Dynamics>,
    pub templates: DataFactory<Template>,
}
impl Default for Context {
    fn default() -> Self {
        Self {
            foreground: Color::BLACK,
            background: Color::WHITE,
            paint_mode: LayerMode::Normal,
            opacity: 1.0,
            palettes: DataFactory::default(),
            patterns: DataFactory::default(),
            gradients: DataFactory::default(),
            brushes: DataFactory::default(),
            dynamics: DataFactory::default(),
            templates: DataFactory::default(),
        }
    }
}
impl Context {
    #[must_use]
    pub fn foreground(&self) -> Color {
        self.foreground
    }
    #[must_use]
    pub fn background(&self) -> Color {
        self.background
    }
    pub fn set_foreground(&mut self, color: Color) {
        self.foreground = color;
    }
    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }
    pub fn swap_colors(&mut self) {
        std::mem::swap(&mut self.foreground, &mut self.background);
    }
    /// Black on white.
    pub fn default_colors(&mut self) {
        self.foreground = Color::BLACK;
        self.background = Color::WHITE;
    }
    #[must_use]
    pub fn paint_mode(&self) -> LayerMode {
        self.paint_mode
    }
    pub fn set_paint_mode(&mut self, mode: LayerMode) {
        self.paint_mode = mode;
    }
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }
    /// Clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = clamp_opacity(opacity);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn colors() {
        let mut context = Context::default();
        assert_eq!(context.background(), Color::WHITE);
        context.swap_colors();
        assert_eq!(context.foreground(), Color::WHITE);
        assert_eq!(context.background(), Color::BLACK);
        context.set_foreground(Color::TRANSPARENT);
        context.default_colors();
        assert_eq!(context.foreground(), Color::BLACK);
    }
    #[test]
    fn opacity_is_clamped() {
        let mut context = Context::default();
        context.set_opacity(1.5);
        assert_eq!(context.opacity(), 1.0);
        context.set_opacity(-0.5);
        assert_eq!(context.opacity(), 0.0);
    }
}
