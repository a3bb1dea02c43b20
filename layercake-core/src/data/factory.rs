//! A registry of one kind of data record, loaded from and saved to a directory.

use std::path::{Path, PathBuf};

use super::{Data, DataError};
use crate::item::tree::split_number_suffix;

#[derive(Clone, Debug)]
pub struct Record<T> {
    data: T,
    /// Where it was loaded from or last saved to.
    path: Option<PathBuf>,
    /// Changed since it was loaded or saved.
    dirty: bool,
}
impl<T> Record<T> {
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Records with unique names, kept in load order, plus the standard record which is only
/// built when first asked for.
#[derive(Debug)]
pub struct DataFactory<T> {
    records: Vec<Record<T>>,
    standard: std::sync::OnceLock<T>,
}
impl<T> Default for DataFactory<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            standard: std::sync::OnceLock::new(),
        }
    }
}
impl<T: Data> DataFactory<T> {
    #[must_use]
    pub fn standard(&self) -> &T {
        self.standard.get_or_init(T::standard)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record<T>> {
        self.records.get(index)
    }
    /// Edit a record. It will be written by the next [`Self::save_dirty`].
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let record = self.records.get_mut(index)?;
        record.dirty = true;
        Some(&mut record.data)
    }
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.data.name() == name)
    }
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&T> {
        self.position(name).map(|i| &self.records[i].data)
    }
    /// Look up by name, falling back to the standard record.
    #[must_use]
    pub fn find_or_standard(&self, name: &str) -> &T {
        self.find(name).unwrap_or_else(|| self.standard())
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.records.iter().map(|r| &r.data)
    }

    fn unique_name(&self, name: &str) -> String {
        if self.position(name).is_none() {
            return name.to_owned();
        }
        let (base, mut number) = split_number_suffix(name);
        loop {
            number = number.saturating_add(1);
            let candidate = format!("{base} #{number}");
            if self.position(&candidate).is_none() {
                return candidate;
            }
        }
    }
    fn push(&mut self, mut data: T, path: Option<PathBuf>, dirty: bool) -> usize {
        let name = self.unique_name(data.name());
        data.set_name(name);
        self.records.push(Record { data, path, dirty });
        self.records.len() - 1
    }

    /// Add a new, unsaved record. Its name is made unique. Returns its index.
    pub fn insert(&mut self, data: T) -> usize {
        self.push(data, None, true)
    }
    /// A copy of the standard record under a new name.
    pub fn create(&mut self, name: &str) -> usize {
        let mut data = T::standard();
        data.set_name(name.to_owned());
        self.insert(data)
    }
    pub fn duplicate(&mut self, index: usize) -> Option<usize> {
        let mut data = self.records.get(index)?.data.clone();
        let name = format!("{} copy", data.name());
        data.set_name(name);
        Some(self.insert(data))
    }
    /// Forget a record, and with `delete_file` remove its file too.
    pub fn delete(&mut self, index: usize, delete_file: bool) -> Result<Option<T>, DataError> {
        if index >= self.records.len() {
            return Ok(None);
        }
        if delete_file {
            if let Some(path) = &self.records[index].path {
                std::fs::remove_file(path).map_err(|source| DataError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        Ok(Some(self.records.remove(index).data))
    }
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Load every `.toml` file of `dir`, in file name order. Files that fail to load are
    /// skipped with a warning, a missing directory loads nothing.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, DataError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no {} directory at {}", T::FOLDER, dir.display());
                return Ok(0);
            }
            Err(source) => {
                return Err(DataError::Io {
                    path: dir.to_owned(),
                    source,
                })
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "toml"))
            .collect();
        paths.sort();
        let mut loaded = 0;
        for path in paths {
            match super::load::<T>(&path) {
                Ok(data) => {
                    self.push(data, Some(path), false);
                    loaded += 1;
                }
                Err(err) => log::warn!("skipping {}: {err}", T::FOLDER),
            }
        }
        log::debug!("loaded {loaded} {} from {}", T::FOLDER, dir.display());
        Ok(loaded)
    }
    /// Drop everything that isn't modified and load `dir` again.
    pub fn refresh(&mut self, dir: &Path) -> Result<usize, DataError> {
        self.records.retain(|r| r.dirty);
        self.load_dir(dir)
    }

    /// Write every modified record into `dir` (or back to where it came from) and return how
    /// many were written. `dir` itself is created, but not its parents.
    pub fn save_dirty(&mut self, dir: &Path) -> Result<usize, DataError> {
        if !self.records.iter().any(|r| r.dirty) {
            return Ok(0);
        }
        // Already existing is fine, other failures surface when writing below.
        let _ = std::fs::DirBuilder::new().create(dir);
        let mut saved = 0;
        for index in 0..self.records.len() {
            if !self.records[index].dirty {
                continue;
            }
            let path = match &self.records[index].path {
                Some(path) => path.clone(),
                None => self.free_path(dir, self.records[index].data.name()),
            };
            super::save(&self.records[index].data, &path)?;
            let record = &mut self.records[index];
            record.path = Some(path);
            record.dirty = false;
            saved += 1;
        }
        Ok(saved)
    }
    /// A file name derived from `name` that neither exists nor belongs to another record.
    fn free_path(&self, dir: &Path, name: &str) -> PathBuf {
        let stem: String = name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let taken = |path: &Path| {
            path.exists() || self.records.iter().any(|r| r.path.as_deref() == Some(path))
        };
        let mut path = dir.join(format!("{stem}.toml"));
        let mut number = 1;
        while taken(&path) {
            number += 1;
            path = dir.join(format!("{stem}-{number}.toml"));
        }
        path
    }
}


#[cfg(test)]
mod test {
    use super::test_util::*;
    use super::*;
    use crate::data::palette::Palette;

    #[test]
    fn names_are_unique() {
        let mut factory = DataFactory::<Palette>::default();
        let a = factory.create("Warm");
        let b = factory.create("Warm");
        let c = factory.duplicate(a).unwrap();
        assert_eq!(factory.get(a).unwrap().data().name(), "Warm");
        assert_eq!(factory.get(b).unwrap().data().name(), "Warm #1");
        assert_eq!(factory.get(c).unwrap().data().name(), "Warm copy");
        assert_eq!(factory.position("Warm #1"), Some(b));
    }
    #[test]
    fn standard_is_lazy_fallback() {
        let factory = DataFactory::<Palette>::default();
        assert!(factory.is_empty());
        assert_eq!(factory.find_or_standard("missing").name(), "Standard");
    }
    #[test]
    fn save_and_reload() {
        let dir = scratch_dir("save_and_reload");
        let mut factory = DataFactory::<Palette>::default();
        factory.create("One");
        factory.create("Two/Slash");
        assert_eq!(factory.save_dirty(&dir).unwrap(), 2);
        assert!(dir.join("Two_Slash.toml").exists());
        // Nothing changed since.
        assert_eq!(factory.save_dirty(&dir).unwrap(), 0);
        std::fs::write(dir.join("broken.toml"), "name = [").unwrap();

        let mut reloaded = DataFactory::<Palette>::default();
        assert_eq!(reloaded.load_dir(&dir).unwrap(), 2);
        assert!(reloaded.find("One").is_some());
        assert!(!reloaded.get(0).unwrap().is_dirty());

        let index = reloaded.position("One").unwrap();
        reloaded.delete(index, true).unwrap();
        assert!(!dir.join("One.toml").exists());
        assert_eq!(reloaded.refresh(&dir).unwrap(), 1);
        std::fs::remove_dir_all(dir).unwrap();
    }
    #[test]
    fn missing_directory_loads_nothing() {
        let mut factory = DataFactory::<Palette>::default();
        let dir = std::env::temp_dir().join("layercake-does-not-exist");
        assert_eq!(factory.load_dir(&dir).unwrap(), 0);
    }
}
