//! Label placements: the request model and its validation.
//!
//! A request is a JSON array of objects such as
//!
//! ```json
//! [{ "image": "http://host/static/images/a.png", "row": 1, "position": 1,
//!    "width": 30, "caption": "A" }]
//! ```
//!
//! `row`, `position` and `width` arrive as numbers or numeric strings
//! depending on the client. [`parse_placements`] accepts both and rejects
//! anything else with [`LabelSheetError::Validation`] before storage or the
//! renderer is touched.

use crate::error::LabelSheetError;
use crate::pipeline::input::is_url;
use crate::pipeline::layout::{GRID_COLUMNS, GRID_ROWS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Keys every label object must carry.
const REQUIRED_KEYS: [&str; 3] = ["image", "caption", "width"];

/// One image placed in the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPlacement {
    /// URL or path of an uploaded image. Only the file name is used.
    pub image: String,
    /// 1-indexed grid row, 1..=3.
    pub row: usize,
    /// 1-indexed column within the row, 1..=13.
    pub position: usize,
    /// Column and box width in millimetres.
    pub width: f64,
    /// Text rendered under the image.
    pub caption: String,
}

impl LabelPlacement {
    /// File name component of [`Self::image`].
    pub fn filename(&self) -> String {
        image_filename(&self.image)
    }
}

/// Validate a JSON value and turn it into placements, in input order.
pub fn parse_placements(value: &Value) -> Result<Vec<LabelPlacement>, LabelSheetError> {
    let items = value.as_array().ok_or_else(|| {
        LabelSheetError::Validation("Invalid label data format. Expected a list.".into())
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_one(index, item))
        .collect()
}

fn parse_one(index: usize, item: &Value) -> Result<LabelPlacement, LabelSheetError> {
    let obj = item.as_object().ok_or_else(|| {
        LabelSheetError::Validation("Invalid label format. Expected a dictionary.".into())
    })?;

    if !REQUIRED_KEYS.iter().all(|k| obj.contains_key(*k)) {
        return Err(LabelSheetError::Validation(
            "Missing required keys in label data.".into(),
        ));
    }

    let image = string_field(obj, "image", index)?;
    let caption = string_field(obj, "caption", index)?;
    let row = integer_field(obj, "row", index)?;
    let position = integer_field(obj, "position", index)?;
    let width = number_field(obj, "width", index)?;

    if !(1..=GRID_ROWS as i64).contains(&row) {
        return Err(LabelSheetError::Validation(format!(
            "Label {}: row {} is out of range (1-{})",
            index + 1,
            row,
            GRID_ROWS
        )));
    }
    if !(1..=GRID_COLUMNS as i64).contains(&position) {
        return Err(LabelSheetError::Validation(format!(
            "Label {}: position {} is out of range (1-{})",
            index + 1,
            position,
            GRID_COLUMNS
        )));
    }
    if !width.is_finite() || width <= 0.0 {
        return Err(LabelSheetError::Validation(format!(
            "Label {}: width must be a positive number of millimetres, got {}",
            index + 1,
            width
        )));
    }

    let filename = image_filename(&image);
    if !is_safe_filename(&filename) {
        return Err(LabelSheetError::Validation(format!(
            "Label {}: image '{}' does not name a usable file",
            index + 1,
            image
        )));
    }

    Ok(LabelPlacement {
        image,
        row: row as usize,
        position: position as usize,
        width,
        caption,
    })
}

fn string_field(obj: &Map<String, Value>, key: &str, index: usize) -> Result<String, LabelSheetError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(LabelSheetError::Validation(format!(
            "Label {}: '{}' must be a string",
            index + 1,
            key
        ))),
        None => Err(missing(key, index)),
    }
}

fn integer_field(obj: &Map<String, Value>, key: &str, index: usize) -> Result<i64, LabelSheetError> {
    let invalid = || {
        LabelSheetError::Validation(format!(
            "Label {}: '{}' must be an integer",
            index + 1,
            key
        ))
    };
    match obj.get(key) {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => Ok(v),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
                .ok_or_else(invalid),
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
        None => Err(missing(key, index)),
    }
}

fn number_field(obj: &Map<String, Value>, key: &str, index: usize) -> Result<f64, LabelSheetError> {
    let invalid = || {
        LabelSheetError::Validation(format!(
            "Label {}: '{}' must be a number",
            index + 1,
            key
        ))
    };
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
        None => Err(missing(key, index)),
    }
}

fn missing(key: &str, index: usize) -> LabelSheetError {
    LabelSheetError::Validation(format!("Label {}: missing '{}'", index + 1, key))
}

/// Extract the file name from an image URL or path.
///
/// `http://localhost:5000/static/images/Blank.JPG` → `Blank.JPG`
pub fn image_filename(image: &str) -> String {
    let image = image.trim();
    if is_url(image) {
        if let Ok(parsed) = reqwest::Url::parse(image) {
            return parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string();
        }
    }
    Path::new(image)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A file name is safe when it is non-empty, not a relative path marker and
/// carries no path separator, whitespace or LaTeX-active character.
pub fn is_safe_filename(name: &str) -> bool {
    const FORBIDDEN: &[char] = &['/', '\\', '{', '}', '%', '#', '$', '&', '~', '^'];
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
}
