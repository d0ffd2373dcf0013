//! Single-page DSME summary PDF.
//!
//! Rendering happens in two steps: [`layout`] positions every line of text on
//! the page, [`render`] draws those lines with the built-in Helvetica faces
//! in WinAnsiEncoding. Anything that does not fit on the page is clipped.

use crate::models::report::{ISME_MAX_SCORE, PILLAR_MAX_SCORE, ReportPayload};
use crate::services::errors::{AppError, AppResult};
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, Pt, Rgb};

/// A4 in points.
pub const PAGE_WIDTH_PT: f64 = 595.28;
pub const PAGE_HEIGHT_PT: f64 = 841.89;

const MARGIN_X: f64 = 50.0;
const INDENT_X: f64 = 70.0;
const TOP_OFFSET: f64 = 50.0;
const FOOTER_Y: f64 = 50.0;

const BRAND_COLOR: (f64, f64, f64) = (0.0, 0.2, 0.4); // #003366
const FOOTER_COLOR: (f64, f64, f64) = (0.5, 0.5, 0.5);

pub const TITLE: &str = "Reporte Preliminar - Escala DSME";
pub const PILLAR_HEADER: &str = "Resultados de los Pilares:";
pub const GLOBAL_HEADER: &str = "Resultado Global (ISME):";
pub const FOOTER: &str =
    "Este es un reporte preliminar generado automáticamente por la Escala DSME.";

/// Display names indexed by pillar number; slot 0 is unused.
pub const PILLAR_NAMES: [&str; 6] = [
    "",
    "1. Resiliencia",
    "2. Vínculo Identitario",
    "3. Sostenibilidad",
    "4. Capital Social",
    "5. Psicología Financiera",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// One positioned run of text. `y` is measured from the bottom of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub weight: FontWeight,
    pub color: Option<(f64, f64, f64)>,
}

impl TextLine {
    fn new(text: impl Into<String>, x: f64, y: f64, size: f64, weight: FontWeight) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            size,
            weight,
            color: None,
        }
    }

    fn colored(mut self, color: (f64, f64, f64)) -> Self {
        self.color = Some(color);
        self
    }
}

// ====================================
// LAYOUT

/// Computes the fixed top-down layout for a report. Pillars appear in
/// ascending order; missing pillars and a missing aggregate are skipped.
pub fn layout(report: &ReportPayload) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut y = PAGE_HEIGHT_PT - TOP_OFFSET;

    lines.push(TextLine::new(TITLE, MARGIN_X, y, 22.0, FontWeight::Bold).colored(BRAND_COLOR));
    y -= 40.0;

    // Demographics
    let demographics = [
        (format!("Nombre: {}", report.participant_name()), 20.0),
        (format!("Email: {}", report.participant_email()), 20.0),
        (format!("Empresa: {}", report.company_name()), 30.0),
    ];
    for (text, advance) in demographics {
        lines.push(TextLine::new(text, MARGIN_X, y, 12.0, FontWeight::Regular));
        y -= advance;
    }

    lines.push(TextLine::new(PILLAR_HEADER, MARGIN_X, y, 16.0, FontWeight::Bold));
    y -= 25.0;

    for (index, score) in &report.pilar_scores {
        let Some(name) = PILLAR_NAMES.get(usize::from(*index)).filter(|n| !n.is_empty()) else {
            continue;
        };
        let text = format!("{}: {} / {}", name, format_score(*score), PILLAR_MAX_SCORE);
        lines.push(TextLine::new(text, INDENT_X, y, 12.0, FontWeight::Regular));
        y -= 20.0;
    }
    y -= 10.0;

    lines.push(TextLine::new(GLOBAL_HEADER, MARGIN_X, y, 16.0, FontWeight::Bold));
    y -= 25.0;

    if let Some(isme) = report.isme_score {
        let text = format!("{:.2} / {}", isme, ISME_MAX_SCORE);
        lines.push(TextLine::new(text, INDENT_X, y, 14.0, FontWeight::Bold).colored(BRAND_COLOR));
    }

    lines.push(
        TextLine::new(FOOTER, MARGIN_X, FOOTER_Y, 8.0, FontWeight::Regular)
            .colored(FOOTER_COLOR),
    );

    lines
}

/// `20` rather than `20.0`, `22.5` as is.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

// ====================================
// RENDERING

/// Renders the report to PDF bytes.
pub fn render(report: &ReportPayload) -> AppResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        TITLE,
        Mm::from(Pt(PAGE_WIDTH_PT)),
        Mm::from(Pt(PAGE_HEIGHT_PT)),
        "Layer 1",
    );

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Render(format!("Failed to embed Helvetica: {:?}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Render(format!("Failed to embed Helvetica-Bold: {:?}", e)))?;

    let canvas = doc.get_page(page).get_layer(layer);
    for line in layout(report) {
        let font: &IndirectFontRef = match line.weight {
            FontWeight::Regular => &regular,
            FontWeight::Bold => &bold,
        };
        let (r, g, b) = line.color.unwrap_or((0.0, 0.0, 0.0));
        canvas.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
        canvas.use_text(
            to_win_ansi(&line.text),
            line.size,
            Mm::from(Pt(line.x)),
            Mm::from(Pt(line.y)),
            font,
        );
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::Render(format!("Failed to serialize PDF: {:?}", e)))
}

/// The built-in fonts are written with WinAnsiEncoding, which covers Latin-1
/// plus a few typographic marks. Characters outside it become `?`.
fn to_win_ansi(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c,
            '€' | '‚' | '„' | '…' | '‘' | '’' | '“' | '”' | '•' | '–' | '—' | '™' => c,
            _ => '?',
        })
        .collect()
}
