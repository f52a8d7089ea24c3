//! Grid layout: place labels into the fixed 3 × 13 sheet.
//!
//! The sheet is a sparse matrix rebuilt for every request. Placing two labels
//! at the same `(row, position)` keeps the later one.
//!
//! ## Gap truncation
//!
//! A row is read left to right and stops at the first empty cell. A row
//! holding positions 1 and 3 but not 2 therefore renders as position 1 only.
//! Existing label templates rely on this, so [`LabelSheet::row_cells`] keeps
//! it and the dropped cells are only reported through
//! [`LabelSheet::hidden_cells`].

use crate::placement::LabelPlacement;

/// Number of rows on a sheet.
pub const GRID_ROWS: usize = 3;

/// Number of label positions in each row.
pub const GRID_COLUMNS: usize = 13;

/// One occupied grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub filename: String,
    pub width: f64,
    pub caption: String,
}

/// The 3 × 13 sheet of optional cells.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSheet {
    rows: [[Option<Cell>; GRID_COLUMNS]; GRID_ROWS],
}

impl Default for LabelSheet {
    fn default() -> Self {
        Self {
            rows: std::array::from_fn(|_| std::array::from_fn(|_| None)),
        }
    }
}

impl LabelSheet {
    /// Lay out validated placements, later entries overwriting earlier ones.
    ///
    /// # Panics
    /// Placements must come from [`crate::placement::parse_placements`], which
    /// bounds `row` and `position`; an out-of-range value indexes past the grid.
    pub fn from_placements(placements: &[LabelPlacement]) -> Self {
        let mut sheet = Self::default();
        for p in placements {
            sheet.rows[p.row - 1][p.position - 1] = Some(Cell {
                filename: p.filename(),
                width: p.width,
                caption: p.caption.clone(),
            });
        }
        sheet
    }

    /// Cell at 1-indexed `(row, position)`, if any.
    pub fn cell(&self, row: usize, position: usize) -> Option<&Cell> {
        self.rows
            .get(row.checked_sub(1)?)?
            .get(position.checked_sub(1)?)?
            .as_ref()
    }

    /// Cells of a 1-indexed row up to (not including) the first empty cell.
    pub fn row_cells(&self, row: usize) -> Vec<&Cell> {
        let Some(cells) = row.checked_sub(1).and_then(|r| self.rows.get(r)) else {
            return Vec::new();
        };
        cells.iter().map_while(Option::as_ref).collect()
    }

    /// Number of cells that end up in the document.
    pub fn visible_count(&self) -> usize {
        (1..=GRID_ROWS).map(|r| self.row_cells(r).len()).sum()
    }

    /// Occupied cells that gap truncation leaves out, as `(row, position)`.
    pub fn hidden_cells(&self) -> Vec<(usize, usize)> {
        let mut hidden = Vec::new();
        for (r, cells) in self.rows.iter().enumerate() {
            let visible = cells.iter().take_while(|c| c.is_some()).count();
            for (c, cell) in cells.iter().enumerate().skip(visible) {
                if cell.is_some() {
                    hidden.push((r + 1, c + 1));
                }
            }
        }
        hidden
    }

    /// Every distinct file name referenced by an occupied cell, hidden cells
    /// included, in first-seen order.
    pub fn filenames(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for cell in self.rows.iter().flatten().flatten() {
            if !names.contains(&cell.filename) {
                names.push(cell.filename.clone());
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(image: &str, row: usize, position: usize, width: f64, caption: &str) -> LabelPlacement {
        LabelPlacement {
            image: image.to_string(),
            row,
            position,
            width,
            caption: caption.to_string(),
        }
    }

    #[test]
    fn contiguous_row_keeps_order_width_and_caption() {
        let sheet = LabelSheet::from_placements(&[
            label("c.png", 2, 3, 15.0, "C"),
            label("a.png", 2, 1, 30.0, "A"),
            label("b.png", 2, 2, 20.0, "B"),
        ]);
        let cells = sheet.row_cells(2);
        assert_eq!(cells.len(), 3);
        let captions: Vec<&str> = cells.iter().map(|c| c.caption.as_str()).collect();
        assert_eq!(captions, ["A", "B", "C"]);
        let widths: Vec<f64> = cells.iter().map(|c| c.width).collect();
        assert_eq!(widths, [30.0, 20.0, 15.0]);
        assert!(sheet.row_cells(1).is_empty());
        assert!(sheet.hidden_cells().is_empty());
    }

    #[test]
    fn last_duplicate_wins() {
        let sheet = LabelSheet::from_placements(&[
            label("a.png", 1, 1, 30.0, "first"),
            label("b.png", 1, 1, 25.0, "second"),
        ]);
        let cell = sheet.cell(1, 1).unwrap();
        assert_eq!(cell.caption, "second");
        assert_eq!(cell.filename, "b.png");
        assert_eq!(cell.width, 25.0);
        assert_eq!(sheet.visible_count(), 1);
    }

    #[test]
    fn gap_truncates_the_rest_of_the_row() {
        // Known sharp edge: position 3 is occupied but never rendered.
        let sheet = LabelSheet::from_placements(&[
            label("a.png", 1, 1, 30.0, "A"),
            label("c.png", 1, 3, 30.0, "C"),
        ]);
        let cells = sheet.row_cells(1);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].caption, "A");
        assert_eq!(sheet.hidden_cells(), vec![(1, 3)]);
    }

    #[test]
    fn row_starting_with_a_gap_is_empty() {
        let sheet = LabelSheet::from_placements(&[label("b.png", 3, 2, 30.0, "B")]);
        assert!(sheet.row_cells(3).is_empty());
        assert_eq!(sheet.hidden_cells(), vec![(3, 2)]);
        assert!(!sheet.is_empty());
    }

    #[test]
    fn visible_count_skips_gaps_and_overwrites() {
        let sheet = LabelSheet::from_placements(&[
            label("a.png", 1, 1, 30.0, "A"),
            label("b.png", 1, 1, 30.0, "B"),
            label("c.png", 1, 3, 30.0, "C"),
            label("d.png", 2, 1, 30.0, "D"),
            label("e.png", 2, 2, 30.0, "E"),
        ]);
        assert_eq!(sheet.visible_count(), 3);
        assert_eq!(sheet.hidden_cells(), vec![(1, 3)]);
    }

    #[test]
    fn full_row_is_thirteen_cells() {
        let labels: Vec<_> = (1..=GRID_COLUMNS)
            .map(|p| label("a.png", 1, p, 20.0, &p.to_string()))
            .collect();
        let sheet = LabelSheet::from_placements(&labels);
        assert_eq!(sheet.row_cells(1).len(), GRID_COLUMNS);
    }

    #[test]
    fn filenames_are_deduplicated_and_include_hidden_cells() {
        let sheet = LabelSheet::from_placements(&[
            label("http://host/static/images/a.png", 1, 1, 30.0, "A"),
            label("a.png", 1, 2, 30.0, "A again"),
            label("z.png", 1, 5, 30.0, "Z"),
        ]);
        assert_eq!(sheet.filenames(), vec!["a.png".to_string(), "z.png".to_string()]);
    }

    #[test]
    fn out_of_grid_lookups_are_none() {
        let sheet = LabelSheet::default();
        assert!(sheet.is_empty());
        assert!(sheet.cell(0, 1).is_none());
        assert!(sheet.cell(4, 1).is_none());
        assert!(sheet.row_cells(0).is_empty());
        assert!(sheet.row_cells(9).is_empty());
    }
}
