use super::Data;
use crate::buffer::{Buffer, BufferError, Format};
use crate::color::Color;

/// A small tile of pixels, repeated to fill areas.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pattern {
    name: String,
    width: u32,
    height: u32,
    /// Row-major.
    pixels: Vec<Color>,
}
impl Data for Pattern {
    const FOLDER: &'static str = "patterns";
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    /// A gray and white checkerboard of 8px squares.
    fn standard() -> Self {
        const SIZE: u32 = 32;
        let light = Color::WHITE;
        let dark = Color::from_straight_lossy([0.5, 0.5, 0.5, 1.0]);
        let pixels = (0..SIZE)
            .flat_map(|y| (0..SIZE).map(move |x| (x, y)))
            .map(|(x, y)| if (x / 8 + y / 8) % 2 == 0 { light } else { dark })
            .collect();
        Self {
            name: "Standard".to_owned(),
            width: SIZE,
            height: SIZE,
            pixels,
        }
    }
    fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("pattern size {}x{} is empty", self.width, self.height));
        }
        let expected = u64::from(self.width) * u64::from(self.height);
        if self.pixels.len() as u64 != expected {
            return Err(format!(
                "pattern has {} pixels, {}x{} needs {expected}",
                self.pixels.len(),
                self.width,
                self.height
            ));
        }
        Ok(())
    }
}
impl Pattern {
    /// None unless `pixels` holds exactly `width * height` colors.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<Color>) -> Option<Self> {
        let pattern = Self {
            name: name.into(),
            width,
            height,
            pixels,
        };
        pattern.validate().is_ok().then_some(pattern)
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    /// The color at `(x, y)` of the endlessly repeated tile.
    #[must_use]
    pub fn sample(&self, x: i64, y: i64) -> Color {
        let x = x.rem_euclid(i64::from(self.width));
        let y = y.rem_euclid(i64::from(self.height));
        usize::try_from(y * i64::from(self.width) + x)
            .ok()
            .and_then(|i| self.pixels.get(i).copied())
            .unwrap_or(Color::TRANSPARENT)
    }
    /// Tile the pattern over a whole new buffer, starting at the buffer's origin.
    pub fn tile(&self, width: i32, height: i32, format: Format) -> Result<Buffer, BufferError> {
        let mut buffer = Buffer::new(width, height, format)?;
        for y in 0..height {
            for x in 0..width {
                let color = self.sample(i64::from(x), i64::from(y));
                buffer.put(x, y, color.as_array());
            }
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::{BaseType, Precision};

    #[test]
    fn standard_is_checkered() {
        let pattern = Pattern::standard();
        assert!(pattern.validate().is_ok());
        assert_eq!(pattern.sample(0, 0), Color::WHITE);
        assert_ne!(pattern.sample(8, 0), Color::WHITE);
        // Wraps in both directions.
        assert_eq!(pattern.sample(-1, 0), pattern.sample(31, 0));
        assert_eq!(pattern.sample(40, 40), pattern.sample(8, 8));
    }
    #[test]
    fn size_mismatch_rejected() {
        assert!(Pattern::new("bad", 2, 2, vec![Color::BLACK; 3]).is_none());
        assert!(Pattern::new("empty", 0, 2, Vec::new()).is_none());
        let text = "name = \"short\"\nwidth = 2\nheight = 1\npixels = [[0.0, 0.0, 0.0, 1.0]]\n";
        let parsed: Pattern = toml::from_str(text).unwrap();
        assert!(parsed.validate().is_err());
    }
    #[test]
    fn tiles_into_buffer() {
        let pattern = Pattern::new("stripes", 2, 1, vec![Color::BLACK, Color::WHITE]).unwrap();
        let format = Format::new(BaseType::Rgb, Precision::Float, true);
        let buffer = pattern.tile(5, 2, format).unwrap();
        assert_eq!(buffer.get(0, 1), Some(Color::BLACK.as_array()));
        assert_eq!(buffer.get(3, 0), Some(Color::WHITE.as_array()));
        assert_eq!(buffer.get(4, 0), Some(Color::BLACK.as_array()));
    }
}
