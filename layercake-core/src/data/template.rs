use super::Data;
use crate::buffer::{BaseType, Precision};
use crate::color::Color;
use crate::config::CoreConfig;
use crate::context::Context;
use crate::error::ImageError;
use crate::image::Image;
use crate::item::{InsertParent, Parasite, ParasiteFlags};

/// Parasite holding a new image's comment.
pub const COMMENT_PARASITE: &str = "layercake-comment";

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
pub enum FillType {
    Foreground,
    #[default]
    Background,
    White,
    Transparent,
}

/// Everything needed to start a new image.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Template {
    name: String,
    pub width: i32,
    pub height: i32,
    pub resolution: [f64; 2],
    pub base_type: BaseType,
    pub precision: Precision,
    pub fill: FillType,
    pub comment: Option<String>,
}
impl Default for Template {
    fn default() -> Self {
        Self {
            name: "Untitled".to_owned(),
            width: 640,
            height: 400,
            resolution: [72.0, 72.0],
            base_type: BaseType::Rgb,
            precision: Precision::U8,
            fill: FillType::Background,
            comment: None,
        }
    }
}
impl Data for Template {
    const FOLDER: &'static str = "templates";
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
        if self.width <= 0 || self.height <= 0 {
            return Err(format!("template size {}x{} is not positive", self.width, self.height));
        }
        if !self.resolution.iter().all(|r| r.is_finite() && *r > 0.0) {
            return Err(format!("template resolution {:?} is not positive", self.resolution));
        }
        Ok(())
    }
}

impl Template {
    /// A new, clean image with a single filled background layer and no undo history.
    pub fn create_image(&self, context: &Context, config: CoreConfig) -> Result<Image, ImageError> {
        self.validate().map_err(ImageError::Contract)?;
        let mut image = Image::new(self.width, self.height, self.base_type, self.precision, config)?;
        image.undo_disable();
        image.set_resolution(self.resolution, false)?;
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            let parasite = Parasite::new(COMMENT_PARASITE, ParasiteFlags::PERSISTENT, comment.as_bytes());
            image.attach_parasite(None, parasite, false)?;
        }
        let name = image.config().names.background.clone();
        let mut layer = image.new_layer(&name, image.canvas(), self.fill == FillType::Transparent)?;
        let color = match self.fill {
            FillType::Foreground => Some(context.foreground()),
            FillType::Background => Some(context.background()),
            FillType::White => Some(Color::WHITE),
            FillType::Transparent => None,
        };
        if let Some(color) = color {
            let extent = layer.buffer().extent();
            layer.buffer_mut().set_color(extent, color);
        }
        image.add_layer(layer, InsertParent::Toplevel, None, false)?;
        image.undo_enable()?;
        image.clean_all();
        log::debug!("created image {} from template {:?}", image.id(), self.name);
        Ok(image)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::item::TreeItem;

    #[test]
    fn background_filled_image() {
        let mut context = Context::default();
        context.set_background(Color::from_straight_lossy([1.0, 0.0, 0.0, 1.0]));
        let template = Template {
            width: 8,
            height: 6,
            resolution: [300.0, 300.0],
            comment: Some("hello".to_owned()),
            ..Template::standard()
        };
        let image = template.create_image(&context, CoreConfig::default()).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert_eq!(image.resolution(), [300.0, 300.0]);
        assert!(!image.is_dirty());
        assert!(image.undo_stack().is_empty());
        assert!(image.undo_is_enabled());
        let layer = image.layers().iter().next().unwrap();
        assert_eq!(layer.item().name(), "Background");
        assert!(!layer.has_alpha());
        assert_eq!(layer.buffer().get(7, 5), Some([1.0, 0.0, 0.0, 1.0]));
        let comment = image.parasites().find(COMMENT_PARASITE).unwrap();
        assert_eq!(comment.data(), b"hello");
    }
    #[test]
    fn transparent_fill_has_alpha() {
        let template = Template {
            width: 4,
            height: 4,
            fill: FillType::Transparent,
            ..Template::standard()
        };
        let image = template.create_image(&Context::default(), CoreConfig::default()).unwrap();
        let layer = image.layers().iter().next().unwrap();
        assert!(layer.has_alpha());
        assert_eq!(layer.buffer().get(0, 0), Some([0.0; 4]));
    }
    #[test]
    fn invalid_template_is_refused() {
        let template = Template {
            width: 0,
            ..Template::standard()
        };
        let err = template
            .create_image(&Context::default(), CoreConfig::default())
            .unwrap_err();
        assert!(err.is_contract_violation());
    }
}
