//! Aligning and distributing items and guides against a reference.

use super::Image;
use crate::error::{ImageError, TreeError};
use crate::guide::Orientation;
use crate::id::{GuideId, ItemId};
use crate::undo::UndoType;
use crate::util::{round_i32, Rect};

/// Something that can be lined up.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AlignTarget {
    /// The canvas. Never moves.
    Image,
    /// A layer, channel, layer mask or path.
    Item(ItemId),
    /// The selection's bounds.
    Selection,
    Guide(GuideId),
}

#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Alignment {
    AlignLeft,
    AlignHCenter,
    AlignRight,
    AlignTop,
    AlignVCenter,
    AlignBottom,
    ArrangeLeft,
    ArrangeHCenter,
    ArrangeRight,
    ArrangeTop,
    ArrangeVCenter,
    ArrangeBottom,
}
impl Alignment {
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(
            self,
            Self::AlignLeft
                | Self::AlignHCenter
                | Self::AlignRight
                | Self::ArrangeLeft
                | Self::ArrangeHCenter
                | Self::ArrangeRight
        )
    }
    /// The coordinate of `rect` this alignment lines up.
    fn offset(self, rect: Rect) -> i32 {
        match self {
            Self::AlignLeft | Self::ArrangeLeft => rect.x,
            Self::AlignHCenter | Self::ArrangeHCenter => rect.x + rect.width / 2,
            Self::AlignRight | Self::ArrangeRight => rect.x + rect.width,
            Self::AlignTop | Self::ArrangeTop => rect.y,
            Self::AlignVCenter | Self::ArrangeVCenter => rect.y + rect.height / 2,
            Self::AlignBottom | Self::ArrangeBottom => rect.y + rect.height,
        }
    }
}

impl Image {
    /// The area a target occupies for alignment purposes. Guides have no extent.
    fn align_rect(&self, target: AlignTarget) -> Result<Rect, ImageError> {
        match target {
            AlignTarget::Image => Ok(self.canvas()),
            AlignTarget::Selection => Ok(self.selection_bounds().unwrap_or_else(|| self.canvas())),
            AlignTarget::Guide(id) => {
                let guide = self
                    .guide(id)
                    .ok_or_else(|| ImageError::contract(format!("no guide {id}")))?;
                Ok(match guide.orientation {
                    Orientation::Horizontal => Rect::new(0, guide.position, 0, 0),
                    Orientation::Vertical => Rect::new(guide.position, 0, 0, 0),
                })
            }
            AlignTarget::Item(id) => {
                let item = self.item(id).ok_or(TreeError::NotFound(id))?;
                if let Some(path) = self.path(id) {
                    if let Some([x1, y1, x2, y2]) = path.bounds() {
                        return Ok(Rect::from_corners(
                            round_i32(x1),
                            round_i32(y1),
                            round_i32(x2),
                            round_i32(y2),
                        ));
                    }
                } else if let Some(bounds) = self.channel(id).and_then(|c| c.bounds()) {
                    return Ok(bounds);
                }
                Ok(item.rect())
            }
        }
    }

    /// Line `targets` up with `reference`. Targets are handled in order of their own offset,
    /// the n-th one (counting from one) additionally shifted by `n * spacing`. Guides only
    /// move along their own axis, position-locked items are left alone.
    pub fn arrange_objects(
        &mut self,
        targets: &[AlignTarget],
        alignment: Alignment,
        reference: AlignTarget,
        reference_alignment: Alignment,
        spacing: i32,
    ) -> Result<(), ImageError> {
        let reference_offset = reference_alignment.offset(self.align_rect(reference)?);
        let horizontal = alignment.is_horizontal();
        let mut sorted = targets
            .iter()
            .filter(|t| **t != reference && **t != AlignTarget::Image)
            .map(|t| Ok((alignment.offset(self.align_rect(*t)?), *t)))
            .collect::<Result<Vec<_>, ImageError>>()?;
        sorted.sort_by_key(|(offset, _)| *offset);
        if sorted.is_empty() {
            return Ok(());
        }
        log::debug!("arranging {} objects ({})", sorted.len(), alignment.as_ref());
        self.undo_group(UndoType::GroupItemDisplace, Some("Arrange Objects"), |image| {
            for (n, (offset, target)) in (1..).zip(sorted) {
                let shift = reference_offset - offset + n * spacing;
                let (dx, dy) = if horizontal { (shift, 0) } else { (0, shift) };
                match target {
                    AlignTarget::Guide(id) => {
                        let Some(guide) = image.guide(id).copied() else {
                            continue;
                        };
                        let moves = match guide.orientation {
                            Orientation::Horizontal => dy,
                            Orientation::Vertical => dx,
                        };
                        if moves != 0 {
                            image.move_guide(id, guide.position + moves, true)?;
                        }
                    }
                    AlignTarget::Selection => {
                        let id = image.selection.item.id();
                        image.translate_item(id, dx, dy, true)?;
                    }
                    AlignTarget::Item(id) => {
                        if image.is_position_locked(id) {
                            log::debug!("{id} is position locked, not arranged");
                            continue;
                        }
                        image.translate_item(id, dx, dy, true)?;
                    }
                    AlignTarget::Image => (),
                }
            }
            Ok(())
        })
    }
}
