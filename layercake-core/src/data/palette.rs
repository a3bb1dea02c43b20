use super::Data;
use crate::color::Color;

/// Colors closer than this (summed over RGB) are the same entry.
const MATCH_EPSILON: f32 = 1e-6;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Palette {
    name: String,
    /// Preferred number of columns when shown as a grid, 0 for automatic.
    columns: u32,
    entries: Vec<PaletteEntry>,
}
impl Default for Palette {
    fn default() -> Self {
        Self {
            name: "Untitled".to_owned(),
            columns: 0,
            entries: Vec::new(),
        }
    }
}
impl Data for Palette {
    const FOLDER: &'static str = "palettes";
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
}

fn distance(a: Color, b: Color) -> f32 {
    let [ar, ag, ab, _] = a.to_straight();
    let [br, bg, bb, _] = b.to_straight();
    (ar - br).abs() + (ag - bg).abs() + (ab - bb).abs()
}

impl Palette {
    #[must_use]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&PaletteEntry> {
        self.entries.get(index)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Insert at `position`, or append when that is absent or past the end. Returns the index.
    pub fn add_entry(&mut self, position: Option<usize>, name: Option<&str>, color: Color) -> usize {
        let entry = PaletteEntry {
            name: name.unwrap_or("Untitled").to_owned(),
            color,
        };
        match position {
            Some(position) if position < self.entries.len() => {
                self.entries.insert(position, entry);
                position
            }
            _ => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        }
    }
    pub fn delete_entry(&mut self, index: usize) -> Option<PaletteEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }
    /// Returns false if there is no such entry.
    pub fn set_entry(&mut self, index: usize, name: &str, color: Color) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        entry.name = name.to_owned();
        entry.color = color;
        true
    }
    pub fn set_entry_color(&mut self, index: usize, color: Color) -> bool {
        self.entries.get_mut(index).map(|e| e.color = color).is_some()
    }
    pub fn set_entry_name(&mut self, index: usize, name: &str) -> bool {
        self.entries
            .get_mut(index)
            .map(|e| e.name = name.to_owned())
            .is_some()
    }
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }
    /// Clamped to at most 64.
    pub fn set_columns(&mut self, columns: u32) {
        self.columns = columns.min(64);
    }
    /// The entry matching `color`. With `start_from`, that entry is checked first, then its
    /// neighbors alternating outward, so repeated colors resolve to the closest one.
    #[must_use]
    pub fn find_entry(&self, color: Color, start_from: Option<usize>) -> Option<usize> {
        let matches = |i: usize| distance(self.entries[i].color, color) < MATCH_EPSILON;
        let Some(start) = start_from.filter(|s| *s < self.entries.len()) else {
            return (0..self.entries.len()).find(|i| matches(*i));
        };
        if matches(start) {
            return Some(start);
        }
        let mut next = start + 1;
        let mut prev = start.checked_sub(1);
        while next < self.entries.len() || prev.is_some() {
            if next < self.entries.len() {
                if matches(next) {
                    return Some(next);
                }
                next += 1;
            }
            if let Some(p) = prev {
                if matches(p) {
                    return Some(p);
                }
                prev = p.checked_sub(1);
            }
        }
        None
    }
}
