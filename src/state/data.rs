/// Shared data structures for the review workflow
///
/// These structs represent the data model that flows between
/// the catalog scanner, the review session and the selection store.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Image file extensions accepted by the scanner (compared lowercased, without the dot)
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"];

/// A single candidate image inside a product folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Filename only (e.g., "front_view.JPG")
    pub file_name: String,
    /// Full path to the image in the source tree
    pub path: PathBuf,
}

/// A directory of candidate images for one catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFolder {
    /// Directory name, unique within the source root
    pub name: String,
    /// Full path to the product directory
    pub path: PathBuf,
    /// Images in scanner order
    pub images: Vec<ImageRef>,
}

/// Color tag attached to a reference image
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColorOption {
    #[default]
    Unknown,
    Black,
    White,
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    Purple,
    Pink,
    Brown,
    Grey,
    Gray,
    Navy,
    Beige,
    Gold,
    Silver,
    Multicolor,
    Camo,
    Other,
}

impl ColorOption {
    /// Every option in palette order
    pub const ALL: [ColorOption; 20] = [
        ColorOption::Unknown,
        ColorOption::Black,
        ColorOption::White,
        ColorOption::Red,
        ColorOption::Blue,
        ColorOption::Green,
        ColorOption::Yellow,
        ColorOption::Orange,
        ColorOption::Purple,
        ColorOption::Pink,
        ColorOption::Brown,
        ColorOption::Grey,
        ColorOption::Gray,
        ColorOption::Navy,
        ColorOption::Beige,
        ColorOption::Gold,
        ColorOption::Silver,
        ColorOption::Multicolor,
        ColorOption::Camo,
        ColorOption::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorOption::Unknown => "unknown",
            ColorOption::Black => "black",
            ColorOption::White => "white",
            ColorOption::Red => "red",
            ColorOption::Blue => "blue",
            ColorOption::Green => "green",
            ColorOption::Yellow => "yellow",
            ColorOption::Orange => "orange",
            ColorOption::Purple => "purple",
            ColorOption::Pink => "pink",
            ColorOption::Brown => "brown",
            ColorOption::Grey => "grey",
            ColorOption::Gray => "gray",
            ColorOption::Navy => "navy",
            ColorOption::Beige => "beige",
            ColorOption::Gold => "gold",
            ColorOption::Silver => "silver",
            ColorOption::Multicolor => "multicolor",
            ColorOption::Camo => "camo",
            ColorOption::Other => "other",
        }
    }
}

impl fmt::Display for ColorOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColor(pub String);

impl fmt::Display for UnknownColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown color {:?}", self.0)
    }
}

impl std::error::Error for UnknownColor {}

impl FromStr for ColorOption {
    type Err = UnknownColor;

    /// Case-insensitive; an empty string means "unknown"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(ColorOption::Unknown);
        }
        ColorOption::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

/// Per-image working state while a product is active in a review session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionEntry {
    pub selected: bool,
    pub color: ColorOption,
}

/// One image handed to the store for saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub original_file: String,
    pub color: ColorOption,
}

impl SelectedImage {
    pub fn new(original_file: impl Into<String>, color: ColorOption) -> Self {
        Self {
            original_file: original_file.into(),
            color,
        }
    }
}

/// One copied image as listed in a selection record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub original_file: String,
    pub saved_file: String,
    pub color: ColorOption,
}

/// Persisted decision for one completed product (selection.json)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectionRecord {
    pub product_name: String,
    pub completed: bool,
    pub selected_by: String,
    /// Local wall-clock time, ISO-8601 without offset
    pub timestamp: NaiveDateTime,
    pub images: Vec<SavedImage>,
}

impl SelectionRecord {
    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Name of the copy written for the `index`-th (1-based) selected image
pub fn saved_file_name(index: usize, color: ColorOption, original_file: &str) -> String {
    format!("ref_{}_{}{}", index, color, lowercase_extension(original_file))
}

/// Lowercased extension including the leading dot, or "" when there is none
fn lowercase_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_default_is_unknown() {
        assert_eq!(ColorOption::default(), ColorOption::Unknown);
        assert_eq!(SelectionEntry::default().color, ColorOption::Unknown);
        assert!(!SelectionEntry::default().selected);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("Red".parse::<ColorOption>(), Ok(ColorOption::Red));
        assert_eq!("multicolor".parse::<ColorOption>(), Ok(ColorOption::Multicolor));
        assert_eq!("".parse::<ColorOption>(), Ok(ColorOption::Unknown));
        assert!("chartreuse".parse::<ColorOption>().is_err());

        // Palette round-trips through its display form
        for color in ColorOption::ALL {
            assert_eq!(color.to_string().parse::<ColorOption>(), Ok(color));
        }
    }

    #[test]
    fn test_saved_file_name_lowercases_extension() {
        assert_eq!(saved_file_name(1, ColorOption::Red, "Front.PNG"), "ref_1_red.png");
        assert_eq!(saved_file_name(3, ColorOption::Unknown, "side.jpeg"), "ref_3_unknown.jpeg");
        assert_eq!(saved_file_name(2, ColorOption::Navy, "noext"), "ref_2_navy");
    }

    #[test]
    fn test_record_json_shape() {
        let record = SelectionRecord {
            product_name: "Shoe".to_string(),
            completed: true,
            selected_by: "Dana".to_string(),
            timestamp: NaiveDateTime::parse_from_str("2025-01-14T10:23:45", "%Y-%m-%dT%H:%M:%S")
                .unwrap(),
            images: vec![SavedImage {
                original_file: "a.png".to_string(),
                saved_file: "ref_1_red.png".to_string(),
                color: ColorOption::Red,
            }],
        };

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(value["product_name"], "Shoe");
        assert_eq!(value["completed"], true);
        assert_eq!(value["selected_by"], "Dana");
        assert_eq!(value["timestamp"], "2025-01-14T10:23:45");
        assert_eq!(value["images"][0]["saved_file"], "ref_1_red.png");
        assert_eq!(value["images"][0]["color"], "red");
    }

    #[test]
    fn test_reads_records_with_microsecond_timestamps() {
        let json = r#"{
  "product_name": "shirt",
  "completed": true,
  "selected_by": "Sam",
  "timestamp": "2024-11-02T09:15:30.123456",
  "images": [
    {"original_file": "b.jpg", "saved_file": "ref_1_unknown.jpg", "color": "unknown"}
  ]
}"#;
        let record = SelectionRecord::from_json(json).unwrap();
        assert_eq!(record.product_name, "shirt");
        assert_eq!(record.images.len(), 1);
        assert_eq!(record.timestamp.format("%Y-%m-%d").to_string(), "2024-11-02");
    }
}
