//! Batch scripts: a TOML list of editor operations run against one image.
//!
//! ```toml
//! [[step]]
//! do = "new_layer"
//! name = "Ink"
//! rect = [0, 0, 64, 64]
//! fill = [0.0, 0.0, 0.0, 1.0]
//!
//! [[step]]
//! do = "set_opacity"
//! layer = "Ink"
//! opacity = 0.5
//! ```
//!
//! Items are referred to by name.

use anyhow::Context as _;
use layercake_core::{
    blend::LayerMode,
    buffer::{BaseType, Precision},
    channel::ChannelOp,
    color::Color,
    context::Context,
    guide::Orientation,
    image::{AlignTarget, Alignment, MergeOptions, MergeType},
    item::{InsertParent, TreeItem},
    layer::MaskInit,
    util::Rect,
    Image, ItemId,
};

#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "do", rename_all = "snake_case")]
pub enum Step {
    NewLayer {
        name: String,
        /// `[x, y, width, height]`, the whole canvas when absent.
        rect: Option<[i32; 4]>,
        /// Straight RGBA.
        fill: Option<[f32; 4]>,
        /// Group to add into.
        parent: Option<String>,
    },
    NewGroup {
        name: String,
        parent: Option<String>,
    },
    Duplicate {
        layer: String,
    },
    Remove {
        layer: String,
    },
    Rename {
        layer: String,
        to: String,
    },
    Reorder {
        layer: String,
        parent: Option<String>,
        index: usize,
    },
    SetVisible {
        layer: String,
        visible: bool,
    },
    SetMode {
        layer: String,
        mode: LayerMode,
    },
    SetOpacity {
        layer: String,
        opacity: f32,
    },
    Translate {
        layer: String,
        dx: i32,
        dy: i32,
    },
    AddMask {
        layer: String,
        init: MaskInit,
    },
    ApplyMask {
        layer: String,
    },
    Select {
        op: ChannelOp,
        rect: [i32; 4],
    },
    SelectNone,
    AddGuide {
        orientation: Orientation,
        position: i32,
    },
    Align {
        layers: Vec<String>,
        alignment: Alignment,
        /// A layer name, the canvas when absent.
        reference: Option<String>,
        reference_alignment: Option<Alignment>,
        #[serde(default)]
        spacing: i32,
    },
    MergeDown {
        layer: String,
        #[serde(default)]
        merge_type: MergeType,
    },
    MergeVisible {
        #[serde(default)]
        merge_type: MergeType,
        #[serde(default)]
        discard_invisible: bool,
    },
    MergeGroup {
        group: String,
    },
    Flatten,
    ResizeCanvas {
        width: i32,
        height: i32,
        #[serde(default)]
        offset: [i32; 2],
    },
    ConvertBaseType {
        base_type: BaseType,
    },
    ConvertPrecision {
        precision: Precision,
    },
    Undo,
    Redo,
}

#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Script {
    #[serde(rename = "step")]
    pub steps: Vec<Step>,
}
impl Script {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
    }
}

fn layer_id(image: &Image, name: &str) -> anyhow::Result<ItemId> {
    image
        .layers()
        .get_by_name(name)
        .map(|l| l.item().id())
        .ok_or_else(|| anyhow::anyhow!("no layer named {name:?}"))
}
fn parent_of(image: &Image, name: Option<&str>) -> anyhow::Result<InsertParent> {
    Ok(match name {
        Some(name) => InsertParent::Group(layer_id(image, name)?),
        None => InsertParent::Toplevel,
    })
}
fn rect([x, y, width, height]: [i32; 4]) -> Rect {
    Rect::new(x, y, width, height)
}

/// Run every step in order, stopping at the first failure.
pub fn run(image: &mut Image, context: &Context, script: &Script) -> anyhow::Result<()> {
    for (number, step) in (1..).zip(&script.steps) {
        log::debug!("step {number}: {step:?}");
        run_step(image, context, step).with_context(|| format!("step {number} failed"))?;
    }
    Ok(())
}

fn run_step(image: &mut Image, context: &Context, step: &Step) -> anyhow::Result<()> {
    match step {
        Step::NewLayer {
            name,
            rect: area,
            fill,
            parent,
        } => {
            let parent = parent_of(image, parent.as_deref())?;
            let area = area.map_or_else(|| image.canvas(), rect);
            let layer = image.new_layer(name, area, true)?;
            let id = image.add_layer(layer, parent, None, true)?;
            if let Some(fill) = fill {
                image.fill_drawable(id, None, Color::from_straight(*fill)?, true)?;
            }
        }
        Step::NewGroup { name, parent } => {
            let parent = parent_of(image, parent.as_deref())?;
            let group = image.new_group_layer(Some(name.as_str()))?;
            image.add_layer(group, parent, None, true)?;
        }
        Step::Duplicate { layer } => {
            image.duplicate_layer(layer_id(image, layer)?, true)?;
        }
        Step::Remove { layer } => image.remove_layer(layer_id(image, layer)?, None, true)?,
        Step::Rename { layer, to } => {
            image.rename_item(layer_id(image, layer)?, to, true)?;
        }
        Step::Reorder {
            layer,
            parent,
            index,
        } => {
            let id = layer_id(image, layer)?;
            let parent = parent.as_deref().map(|p| layer_id(image, p)).transpose()?;
            image.reorder_item(id, parent, *index, true)?;
        }
        Step::SetVisible { layer, visible } => {
            image.set_item_visible(layer_id(image, layer)?, *visible, true)?;
        }
        Step::SetMode { layer, mode } => image.set_layer_mode(layer_id(image, layer)?, *mode, true)?,
        Step::SetOpacity { layer, opacity } => {
            image.set_layer_opacity(layer_id(image, layer)?, *opacity, true)?;
        }
        Step::Translate { layer, dx, dy } => {
            image.translate_item(layer_id(image, layer)?, *dx, *dy, true)?;
        }
        Step::AddMask { layer, init } => {
            image.add_layer_mask(layer_id(image, layer)?, *init, true)?;
        }
        Step::ApplyMask { layer } => image.apply_layer_mask(layer_id(image, layer)?, true, true)?,
        Step::Select { op, rect: area } => image.select_rect(*op, rect(*area), true)?,
        Step::SelectNone => image.select_none(true)?,
        Step::AddGuide {
            orientation,
            position,
        } => {
            image.add_guide(*orientation, *position, true)?;
        }
        Step::Align {
            layers,
            alignment,
            reference,
            reference_alignment,
            spacing,
        } => {
            let targets = layers
                .iter()
                .map(|name| layer_id(image, name).map(AlignTarget::Item))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let reference = match reference {
                Some(name) => AlignTarget::Item(layer_id(image, name)?),
                None => AlignTarget::Image,
            };
            image.arrange_objects(
                &targets,
                *alignment,
                reference,
                reference_alignment.unwrap_or(*alignment),
                *spacing,
            )?;
        }
        Step::MergeDown { layer, merge_type } => {
            image.merge_down(layer_id(image, layer)?, context, *merge_type)?;
        }
        Step::MergeVisible {
            merge_type,
            discard_invisible,
        } => {
            let options = MergeOptions {
                discard_invisible: *discard_invisible,
                ..MergeOptions::default()
            };
            image.merge_visible_layers(context, *merge_type, options)?;
        }
        Step::MergeGroup { group } => {
            image.merge_group_layer(layer_id(image, group)?)?;
        }
        Step::Flatten => {
            image.flatten(context)?;
        }
        Step::ResizeCanvas {
            width,
            height,
            offset,
        } => image.resize_canvas(*width, *height, *offset, true)?,
        Step::ConvertBaseType { base_type } => image.convert_base_type(*base_type, true)?,
        Step::ConvertPrecision { precision } => image.convert_precision(*precision, true)?,
        Step::Undo => {
            if !image.undo()? {
                log::warn!("nothing to undo");
            }
        }
        Step::Redo => {
            if !image.redo()? {
                log::warn!("nothing to redo");
            }
        }
    }
    Ok(())
}

/// The layer tree, one line per layer, children indented below their group.
#[must_use]
pub fn describe(image: &Image) -> String {
    fn walk(image: &Image, parent: Option<ItemId>, depth: usize, out: &mut String) {
        for id in image.layers().children(parent) {
            let Some(layer) = image.layer(id) else {
                continue;
            };
            let item = layer.item();
            let rect = item.rect();
            let mut line = format!(
                "{:indent$}{} [{}x{} at {},{}] {} {:.0}%",
                "",
                item.name(),
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                layer.mode().as_ref(),
                layer.opacity() * 100.0,
                indent = depth * 2,
            );
            if !item.is_visible() {
                line.push_str(" hidden");
            }
            if layer.mask().is_some() {
                line.push_str(" masked");
            }
            out.push_str(&line);
            out.push('\n');
            if layer.is_group() {
                walk(image, Some(id), depth + 1, out);
            }
        }
    }
    let mut out = format!(
        "{}x{} {} {}\n",
        image.width(),
        image.height(),
        image.base_type().as_ref(),
        image.precision().as_ref()
    );
    walk(image, None, 0, &mut out);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use layercake_core::config::CoreConfig;

    fn image() -> Image {
        Image::new(32, 32, BaseType::Rgb, Precision::Float, CoreConfig::default()).unwrap()
    }
    const SCRIPT: &str = r#"
[[step]]
do = "new_layer"
name = "Paper"
fill = [1.0, 1.0, 1.0, 1.0]

[[step]]
do = "new_group"
name = "Inks"

[[step]]
do = "new_layer"
name = "Line"
rect = [4, 4, 8, 8]
fill = [0.0, 0.0, 0.0, 1.0]
parent = "Inks"

[[step]]
do = "set_opacity"
layer = "Line"
opacity = 0.5

[[step]]
do = "set_mode"
layer = "Inks"
mode = "Multiply"
"#;

    #[test]
    fn runs_a_script() {
        let script: Script = toml::from_str(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 5);
        let mut image = image();
        run(&mut image, &Context::default(), &script).unwrap();
        let tree = describe(&image);
        assert_eq!(
            tree,
            "32x32 Rgb Float\nInks [8x8 at 4,4] Multiply 100%\n  Line [8x8 at 4,4] Normal 50%\nPaper [32x32 at 0,0] Normal 100%\n"
        );
    }
    #[test]
    fn undo_steps() {
        let script: Script = toml::from_str(
            "[[step]]\ndo = \"new_layer\"\nname = \"A\"\n\n[[step]]\ndo = \"undo\"\n",
        )
        .unwrap();
        let mut image = image();
        run(&mut image, &Context::default(), &script).unwrap();
        assert!(image.layers().is_empty());
    }
    #[test]
    fn unknown_layer_reports_step() {
        let script: Script =
            toml::from_str("[[step]]\ndo = \"remove\"\nlayer = \"Nope\"\n").unwrap();
        let err = run(&mut image(), &Context::default(), &script).unwrap_err();
        assert_eq!(err.to_string(), "step 1 failed");
        assert!(format!("{err:#}").contains("no layer named \"Nope\""));
    }
    #[test]
    fn unknown_operation_is_rejected() {
        assert!(toml::from_str::<Script>("[[step]]\ndo = \"explode\"\n").is_err());
    }
}
