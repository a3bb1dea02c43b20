use super::Undo;

/// Undo records in push order, the most recent last.
#[derive(Debug, Default)]
pub struct UndoStack {
    undos: Vec<Undo>,
}
impl UndoStack {
    pub(crate) fn push(&mut self, undo: Undo) {
        self.undos.push(undo);
    }
    /// Take the most recent record.
    pub(crate) fn pop(&mut self) -> Option<Undo> {
        self.undos.pop()
    }
    /// Take the oldest record.
    pub(crate) fn free_bottom(&mut self) -> Option<Undo> {
        (!self.undos.is_empty()).then(|| self.undos.remove(0))
    }
    /// Take everything, oldest first.
    pub(crate) fn take_all(&mut self) -> Vec<Undo> {
        std::mem::take(&mut self.undos)
    }
    #[must_use]
    pub fn peek(&self) -> Option<&Undo> {
        self.undos.last()
    }
    pub(crate) fn peek_mut(&mut self) -> Option<&mut Undo> {
        self.undos.last_mut()
    }
    #[must_use]
    pub fn depth(&self) -> usize {
        self.undos.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undos.is_empty()
    }
    /// Oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Undo> {
        self.undos.iter()
    }
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Undo> {
        self.undos.iter_mut()
    }
}
impl<'a> IntoIterator for &'a UndoStack {
    type Item = &'a Undo;
    type IntoIter = std::slice::Iter<'a, Undo>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::undo::{UndoKind, UndoType};
    #[test]
    fn order() {
        let mut stack = UndoStack::default();
        for name in ["a", "b", "c"] {
            stack.push(Undo::new(UndoType::Cant, Some(name), UndoKind::Cant));
        }
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.peek().map(Undo::name), Some("c"));
        assert_eq!(stack.free_bottom().as_ref().map(Undo::name), Some("a"));
        assert_eq!(stack.pop().as_ref().map(Undo::name), Some("c"));
        let rest: Vec<_> = stack.iter().map(Undo::name).collect();
        assert_eq!(rest, vec!["b"]);
    }
}
