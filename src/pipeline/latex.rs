//! LaTeX emission: turn a [`LabelSheet`] into a complete document.
//!
//! Output is a landscape A4 `article` with one `tabular` per non-empty row.
//! Every label is a 30 mm high `\parbox` as wide as its column holding a
//! 10 mm thumbnail above the caption. The thumbnail size is fixed; `width`
//! only sizes the column.
//!
//! Emission is a pure function of the sheet, so identical input produces
//! byte-identical text and the whole stage is testable without a TeX install.

use crate::pipeline::layout::{Cell, LabelSheet, GRID_ROWS};

const PREAMBLE: &str = r"
\documentclass{article}
\usepackage[utf8]{inputenc}
\usepackage{graphicx}
\usepackage[a4paper,landscape,margin=10mm]{geometry}
\usepackage{array}
\newcolumntype{P}[1]{@{}>{\raggedright\arraybackslash}p{#1}@{}}
\renewcommand{\arraystretch}{1.0}

\begin{document}
\begin{figure}[ht!]
\centering
";

const TRAILER: &str = r"
\end{figure}
\end{document}
";

/// Spacing emitted after every row, empty or not.
const ROW_GAP: &str = "\n\n\\vspace{10mm}\n\n";

/// Build the full LaTeX document for a sheet.
pub fn generate_latex(sheet: &LabelSheet) -> String {
    let mut doc = String::from(PREAMBLE);
    for row in 1..=GRID_ROWS {
        let cells = sheet.row_cells(row);
        if cells.is_empty() {
            push_empty_row(&mut doc, row);
        } else {
            push_row(&mut doc, &cells);
        }
    }
    doc.push_str(TRAILER);
    doc
}

fn push_row(doc: &mut String, cells: &[&Cell]) {
    doc.push_str("\\begin{tabular}{|");
    for cell in cells {
        doc.push_str(&format!("P{{{}mm}}|", cell.width));
    }
    doc.push_str("}\n\\hline");

    let boxes: Vec<String> = cells.iter().map(|cell| label_box(cell)).collect();
    doc.push_str(&boxes.join("&"));

    doc.push_str("\\\\\n\\hline\n\\end{tabular}");
    doc.push_str(ROW_GAP);
}

/// A row with nothing to show still holds its vertical slot.
fn push_empty_row(doc: &mut String, row: usize) {
    doc.push_str(&format!("% row {row}: empty\n\\mbox{{}}"));
    doc.push_str(ROW_GAP);
}

fn label_box(cell: &Cell) -> String {
    format!(
        "\\parbox[c][30mm][c]{{{width}mm}}{{\\centering\n\
         \\vspace{{2mm}} \n\
         \\includegraphics[height=10mm,width=10mm,keepaspectratio]{{{file}}} \\\\\n\
         \\vspace{{2mm}} \n\
         \\small {caption}}}  ",
        width = cell.width,
        file = cell.filename,
        caption = escape_latex(&cell.caption),
    )
}

/// Escape characters that LaTeX treats as markup in running text.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\textbackslash{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '#' | '$' | '%' | '&' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '\r' | '\n' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::LabelPlacement;

    fn label(image: &str, row: usize, position: usize, width: f64, caption: &str) -> LabelPlacement {
        LabelPlacement {
            image: image.to_string(),
            row,
            position,
            width,
            caption: caption.to_string(),
        }
    }

    fn sheet(labels: &[LabelPlacement]) -> LabelSheet {
        LabelSheet::from_placements(labels)
    }

    #[test]
    fn preamble_and_trailer_wrap_the_body() {
        let doc = generate_latex(&sheet(&[label("a.png", 1, 1, 30.0, "A")]));
        assert!(doc.contains("\\documentclass{article}"));
        assert!(doc.contains("\\usepackage[a4paper,landscape,margin=10mm]{geometry}"));
        assert!(doc.contains("\\newcolumntype{P}[1]{@{}>{\\raggedright\\arraybackslash}p{#1}@{}}"));
        assert!(doc.contains("\\begin{figure}[ht!]\n\\centering\n"));
        assert!(doc.trim_end().ends_with("\\end{figure}\n\\end{document}"));
    }

    #[test]
    fn row_header_and_cells() {
        let doc = generate_latex(&sheet(&[
            label("http://host/static/images/a.png", 1, 1, 30.0, "A"),
            label("http://host/static/images/b.png", 1, 2, 20.0, "B"),
        ]));
        assert_eq!(doc.matches("\\begin{tabular}").count(), 1);
        assert!(doc.contains("\\begin{tabular}{|P{30mm}|P{20mm}|}\n\\hline\\parbox[c][30mm][c]{30mm}"));
        assert_eq!(doc.matches("\\parbox[c][30mm][c]").count(), 2);
        assert!(doc.contains("\\includegraphics[height=10mm,width=10mm,keepaspectratio]{a.png} \\\\"));
        assert!(doc.contains("\\small A}  &\\parbox[c][30mm][c]{20mm}"));
        assert!(doc.contains("\\small B}  \\\\\n\\hline\n\\end{tabular}\n\n\\vspace{10mm}"));

        let a = doc.find("{a.png}").unwrap();
        let b = doc.find("{b.png}").unwrap();
        assert!(a < b);
    }

    #[test]
    fn empty_rows_still_emit_a_row_construct() {
        let doc = generate_latex(&sheet(&[label("a.png", 2, 1, 30.0, "A")]));
        assert!(doc.contains("% row 1: empty\n\\mbox{}"));
        assert!(doc.contains("% row 3: empty\n\\mbox{}"));
        assert!(!doc.contains("% row 2: empty"));
        assert_eq!(doc.matches("\\vspace{10mm}").count(), GRID_ROWS);
    }

    #[test]
    fn gap_truncates_header_and_cells() {
        // Position 3 sits behind a gap and is dropped from the header.
        let doc = generate_latex(&sheet(&[
            label("a.png", 1, 1, 30.0, "A"),
            label("c.png", 1, 3, 25.0, "C"),
        ]));
        assert!(doc.contains("\\begin{tabular}{|P{30mm}|}"));
        assert!(!doc.contains("P{25mm}"));
        assert!(!doc.contains("{c.png}"));
    }

    #[test]
    fn fractional_width_is_kept() {
        let doc = generate_latex(&sheet(&[label("a.png", 1, 1, 22.5, "A")]));
        assert!(doc.contains("P{22.5mm}|"));
        assert!(doc.contains("\\parbox[c][30mm][c]{22.5mm}"));
    }

    #[test]
    fn output_is_deterministic() {
        let labels = [
            label("a.png", 1, 1, 30.0, "A"),
            label("b.png", 3, 1, 20.0, "B"),
        ];
        assert_eq!(generate_latex(&sheet(&labels)), generate_latex(&sheet(&labels)));
    }

    #[test]
    fn captions_are_escaped() {
        assert_eq!(escape_latex("50% off & more"), "50\\% off \\& more");
        assert_eq!(escape_latex("a_b{c}"), "a\\_b\\{c\\}");
        assert_eq!(escape_latex("\\input{x}"), "\\textbackslash{}input\\{x\\}");
        assert_eq!(escape_latex("~^"), "\\textasciitilde{}\\textasciicircum{}");
        assert_eq!(escape_latex("line\nbreak"), "line break");
        assert_eq!(escape_latex("Café 42"), "Café 42");
    }
}
