//! Parasites: named, opaque blobs that plug-ins and file formats hang off items and images.

bitflags::bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct ParasiteFlags: u32 {
        /// Saved along with the document.
        const PERSISTENT = 1 << 0;
        /// Changes to it are recorded in the undo history.
        const UNDOABLE = 1 << 1;
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Parasite {
    name: String,
    flags: ParasiteFlags,
    data: Vec<u8>,
}
impl Parasite {
    #[must_use]
    pub fn new(name: impl Into<String>, flags: ParasiteFlags, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            flags,
            data: data.into(),
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn flags(&self) -> ParasiteFlags {
        self.flags
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        self.flags.contains(ParasiteFlags::UNDOABLE)
    }
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.flags.contains(ParasiteFlags::PERSISTENT)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ParasiteList(hashbrown::HashMap<String, Parasite>);
impl ParasiteList {
    /// Attach, replacing and returning any parasite of the same name.
    pub fn attach(&mut self, parasite: Parasite) -> Option<Parasite> {
        self.0.insert(parasite.name.clone(), parasite)
    }
    pub fn detach(&mut self, name: &str) -> Option<Parasite> {
        self.0.remove(name)
    }
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Parasite> {
        self.0.get(name)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
    /// Estimated bytes held.
    #[must_use]
    pub fn memsize(&self) -> u64 {
        self.0
            .values()
            .map(|p| (p.name.len() + p.data.len()) as u64)
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn attach_replaces() {
        let mut list = ParasiteList::default();
        assert!(list
            .attach(Parasite::new("gamma", ParasiteFlags::PERSISTENT, [1u8]))
            .is_none());
        let old = list.attach(Parasite::new("gamma", ParasiteFlags::UNDOABLE, [2u8]));
        assert_eq!(old.map(|p| p.data().to_vec()), Some(vec![1]));
        assert_eq!(list.len(), 1);
        assert!(list.find("gamma").unwrap().is_undoable());
        assert_eq!(list.names(), vec!["gamma"]);
    }
}
