use crate::calc::{ReportData, SubjectMark};
use crate::model::{SchoolInfo, Student, Term};
use anyhow::anyhow;
use chrono::{Duration, NaiveDate};
use printpdf::image_crate;
use printpdf::{
    BuiltinFont, Color, CustomPdfConformance, Image, ImageTransform, IndirectFontRef, Line, Mm,
    PdfConformance, PdfDocument, PdfDocumentReference, PdfLayerIndex, PdfLayerReference,
    PdfPageIndex, Point, Rgb,
};
use std::io::{BufWriter, Cursor};
use time::OffsetDateTime;

pub mod classic;
pub mod minimal;
pub mod modern;
pub mod professional;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKey {
    Classic,
    Modern,
    Professional,
    Minimal,
}

impl TemplateKey {
    /// Unknown keys fall back to Classic; a report is always produced.
    pub fn parse(s: &str) -> TemplateKey {
        match s.trim().to_ascii_lowercase().as_str() {
            "modern" => TemplateKey::Modern,
            "professional" => TemplateKey::Professional,
            "minimal" => TemplateKey::Minimal,
            _ => TemplateKey::Classic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKey::Classic => "classic",
            TemplateKey::Modern => "modern",
            TemplateKey::Professional => "professional",
            TemplateKey::Minimal => "minimal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateKey::Classic => "Classic",
            TemplateKey::Modern => "Modern",
            TemplateKey::Professional => "Professional",
            TemplateKey::Minimal => "Minimal",
        }
    }

    pub fn all() -> [TemplateKey; 4] {
        [
            TemplateKey::Classic,
            TemplateKey::Modern,
            TemplateKey::Professional,
            TemplateKey::Minimal,
        ]
    }
}

/// Everything a template needs, fully resolved by the caller. Image bytes are
/// already fetched and converted; the engine never waits on anything.
pub struct RenderInputs<'a> {
    pub report: &'a ReportData,
    pub student: &'a Student,
    pub term: &'a Term,
    pub school: &'a SchoolInfo,
    pub marks: &'a [SubjectMark],
    pub printed_on: NaiveDate,
    pub logo: Option<&'a [u8]>,
    pub photo: Option<&'a [u8]>,
}

pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

pub fn render(key: TemplateKey, inputs: &RenderInputs) -> anyhow::Result<RenderedDocument> {
    match key {
        TemplateKey::Classic => classic::render(inputs),
        TemplateKey::Modern => modern::render(inputs),
        TemplateKey::Professional => professional::render(inputs),
        TemplateKey::Minimal => minimal::render(inputs),
    }
}

// A4 portrait geometry, millimetres.
pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_LEFT: f32 = 14.0;
pub const MARGIN_RIGHT: f32 = 196.0;
pub const TOP_START: f32 = 283.0;
pub const BOTTOM_MARGIN: f32 = 16.0;

/// One document plus a downward y-cursor. All templates walk the page through
/// this; only the mark-row loops are pagination-aware.
pub struct Sheet {
    doc: PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    pub y: Mm,
    page_count: usize,
    pub regular: IndirectFontRef,
    pub bold: IndirectFontRef,
    pub italic: IndirectFontRef,
}

impl Sheet {
    pub fn new(title: &str) -> anyhow::Result<Sheet> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let doc = doc.with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            ..Default::default()
        }));
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("font load failed: {}", e))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("font load failed: {}", e))?;
        let italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| anyhow!("font load failed: {}", e))?;
        Ok(Sheet {
            doc,
            page,
            layer,
            y: Mm(TOP_START),
            page_count: 1,
            regular,
            bold,
            italic,
        })
    }

    pub fn layer(&self) -> PdfLayerReference {
        self.doc.get_page(self.page).get_layer(self.layer)
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.page = page;
        self.layer = layer;
        self.y = Mm(TOP_START);
        self.page_count += 1;
    }

    /// Starts a new page when fewer than `needed` millimetres remain.
    /// Returns true when a page break happened.
    pub fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y < Mm(BOTTOM_MARGIN + needed) {
            self.new_page();
            true
        } else {
            false
        }
    }

    pub fn advance(&mut self, mm: f32) {
        self.y -= Mm(mm);
    }

    pub fn set_fill(&self, color: Color) {
        self.layer().set_fill_color(color);
    }

    pub fn set_stroke(&self, color: Color) {
        self.layer().set_outline_color(color);
    }

    pub fn text(&self, s: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer().use_text(s.to_string(), size, Mm(x), self.y, font);
    }

    pub fn text_at(&self, s: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef) {
        self.layer().use_text(s.to_string(), size, Mm(x), Mm(y), font);
    }

    pub fn text_centered(&self, s: &str, size: f32, font: &IndirectFontRef) {
        let x = (PAGE_WIDTH - approx_text_width(s, size)) / 2.0;
        self.text(s, size, x, font);
    }

    pub fn text_right(&self, s: &str, size: f32, right_x: f32, font: &IndirectFontRef) {
        self.text(s, size, right_x - approx_text_width(s, size), font);
    }

    /// Horizontal rule at the cursor.
    pub fn rule(&self, x1: f32, x2: f32) {
        let line = Line {
            points: vec![
                (Point::new(Mm(x1), self.y), false),
                (Point::new(Mm(x2), self.y), false),
            ],
            is_closed: false,
        };
        self.layer().add_line(line);
    }

    pub fn fill_rect(&self, x1: f32, y_bottom: f32, x2: f32, y_top: f32, color: Color) {
        let layer = self.layer();
        layer.set_fill_color(color);
        layer.add_rect(printpdf::Rect::new(Mm(x1), Mm(y_bottom), Mm(x2), Mm(y_top)));
    }

    /// Stroked box drawn as a closed polyline.
    pub fn frame(&self, x1: f32, y_bottom: f32, x2: f32, y_top: f32) {
        let line = Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y_bottom)), false),
                (Point::new(Mm(x2), Mm(y_bottom)), false),
                (Point::new(Mm(x2), Mm(y_top)), false),
                (Point::new(Mm(x1), Mm(y_top)), false),
            ],
            is_closed: true,
        };
        self.layer().add_line(line);
    }

    /// Best-effort image placement, scaled to fit the box with the top edge at
    /// `y_top`. Undecodable bytes mean the region is simply left empty; a bad
    /// photo must never abort a report.
    pub fn place_image(&self, bytes: &[u8], x: f32, y_top: f32, max_w: f32, max_h: f32) {
        let Ok(decoded) = image_crate::load_from_memory(bytes) else {
            return;
        };
        let rgb = image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
        let px_w = rgb.width() as f32;
        let px_h = rgb.height() as f32;
        if px_w < 1.0 || px_h < 1.0 {
            return;
        }
        // printpdf places raster images at 300 dpi natural size.
        let natural_w = px_w * 25.4 / 300.0;
        let natural_h = px_h * 25.4 / 300.0;
        let scale = (max_w / natural_w).min(max_h / natural_h);
        let image = Image::from_dynamic_image(&rgb);
        image.add_to_layer(
            self.layer(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(y_top - natural_h * scale)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                ..Default::default()
            },
        );
    }

    /// Pins document metadata so identical inputs produce identical bytes.
    pub fn finish(self, document_id: &str) -> anyhow::Result<RenderedDocument> {
        let epoch = OffsetDateTime::UNIX_EPOCH;
        let page_count = self.page_count;
        let doc = self
            .doc
            .with_creation_date(epoch)
            .with_mod_date(epoch)
            .with_document_id(document_id.to_string());
        let mut buf = BufWriter::new(Cursor::new(Vec::new()));
        doc.save(&mut buf)
            .map_err(|e| anyhow!("pdf save failed: {}", e))?;
        let cursor = buf
            .into_inner()
            .map_err(|e| anyhow!("pdf buffer flush failed: {}", e))?;
        Ok(RenderedDocument {
            bytes: cursor.into_inner(),
            page_count,
        })
    }
}

// Shared section content. These live here so the four templates cannot drift
// on dates, fallback text, or the legend.

pub fn next_term_begins(end: NaiveDate) -> NaiveDate {
    end + Duration::days(30)
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%d %b %Y").to_string()
}

pub fn report_title(term: &Term) -> String {
    let mut title = term.name.to_uppercase();
    if !term.year.is_empty() {
        title.push(' ');
        title.push_str(&term.year);
    }
    title.push_str(" REPORT CARD");
    title
}

pub fn comment_or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() {
        "No comment provided."
    } else {
        text
    }
}

/// Presentational reference table; intentionally static text matching the
/// canonical fallback ladder, not the configured bands.
pub const GRADING_LEGEND: [(&str, &str); 5] = [
    ("A", "100 - 80"),
    ("B", "80 - 70"),
    ("C", "69 - 60"),
    ("D", "60 - 40"),
    ("E", "40 - 0"),
];

pub fn fmt_score(v: f64) -> String {
    format!("{:.1}", v)
}

pub fn fmt_opt_score(v: Option<f64>) -> String {
    match v {
        Some(v) => fmt_score(v),
        None => "-".to_string(),
    }
}

pub fn class_label(student: &Student) -> String {
    if student.section.is_empty() {
        student.class_name.clone()
    } else {
        format!("{} ({})", student.class_name, student.section)
    }
}

pub fn contact_line(school: &SchoolInfo) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(v) = school.address.as_deref() {
        parts.push(v);
    }
    if let Some(v) = school.phone.as_deref() {
        parts.push(v);
    }
    if let Some(v) = school.email.as_deref() {
        parts.push(v);
    }
    parts.join("  |  ")
}

pub fn footer_dates_line(term: &Term) -> String {
    match term.end_date {
        Some(end) => format!(
            "This term ended on {}. Next term begins on {}.",
            format_date(end),
            format_date(next_term_begins(end))
        ),
        None => String::new(),
    }
}

pub fn document_id(key: TemplateKey, student: &Student, term: &Term) -> String {
    format!(
        "{}:{}:{}:{}",
        key.as_str(),
        student.full_name,
        term.name,
        term.year
    )
}

/// Rough width of builtin Helvetica text, good enough for centering,
/// right-alignment and word wrap on an A4 sheet.
pub fn approx_text_width(s: &str, size: f32) -> f32 {
    s.chars().count() as f32 * size * 0.5 * 0.3528
}

pub fn truncate_to_width(s: &str, size: f32, max_w: f32) -> String {
    if approx_text_width(s, size) <= max_w {
        return s.to_string();
    }
    let mut out = String::new();
    for c in s.chars() {
        out.push(c);
        if approx_text_width(&out, size) > max_w - approx_text_width("...", size) {
            out.pop();
            out.push_str("...");
            return out;
        }
    }
    out
}

/// Greedy word wrap against the approximate width model.
pub fn wrap_text(s: &str, size: f32, max_w: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if approx_text_width(&candidate, size) <= max_w || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Grading-scale reference table used by Classic and Professional; the header
/// fill is the only per-template difference.
pub fn draw_legend(sheet: &mut Sheet, header_fill: Color) {
    sheet.ensure_space(36.0);
    sheet.set_fill(ink());
    sheet.text("GRADING SCALE", 9.0, MARGIN_LEFT, &sheet.bold);
    sheet.advance(5.5);
    let x2 = MARGIN_LEFT + 60.0;
    let top = sheet.y.0 + 3.5;
    sheet.fill_rect(MARGIN_LEFT, sheet.y.0 - 1.5, x2, top, header_fill);
    sheet.set_fill(white());
    sheet.text("Grade", 7.5, MARGIN_LEFT + 2.0, &sheet.bold);
    sheet.text("Score Band", 7.5, MARGIN_LEFT + 24.0, &sheet.bold);
    sheet.advance(5.0);
    sheet.set_fill(ink());
    for (grade, range) in GRADING_LEGEND {
        sheet.text(grade, 7.5, MARGIN_LEFT + 2.0, &sheet.regular);
        sheet.text(range, 7.5, MARGIN_LEFT + 24.0, &sheet.regular);
        sheet.advance(4.2);
    }
    sheet.set_stroke(dim_ink());
    sheet.frame(MARGIN_LEFT, sheet.y.0 + 2.2, x2, top);
    sheet.advance(4.0);
}

pub fn ink() -> Color {
    Color::Rgb(Rgb::new(0.10, 0.10, 0.10, None))
}

pub fn dim_ink() -> Color {
    Color::Rgb(Rgb::new(0.35, 0.35, 0.35, None))
}

pub fn white() -> Color {
    Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None))
}

pub fn row_shade() -> Color {
    Color::Rgb(Rgb::new(0.94, 0.94, 0.96, None))
}

/// Achievement banding shared by the templates that color-code levels.
pub fn achievement_color(level: &str) -> Color {
    match level {
        "Outstanding" => Color::Rgb(Rgb::new(0.13, 0.60, 0.33, None)),
        "Moderate" => Color::Rgb(Rgb::new(0.85, 0.55, 0.05, None)),
        _ => Color::Rgb(Rgb::new(0.80, 0.15, 0.15, None)),
    }
}

pub fn achievement_tint(level: &str) -> Color {
    match level {
        "Outstanding" => Color::Rgb(Rgb::new(0.90, 0.97, 0.92, None)),
        "Moderate" => Color::Rgb(Rgb::new(1.0, 0.97, 0.88, None)),
        _ => Color::Rgb(Rgb::new(0.99, 0.91, 0.91, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{aggregate, ManualOverrides, SubjectMark};
    use crate::model::{SchoolInfo, Student, Term};

    fn sample_student() -> Student {
        Student {
            full_name: "Ama Mensah".to_string(),
            gender: "F".to_string(),
            class_name: "Primary 5".to_string(),
            section: "Blue".to_string(),
            house: "Volta".to_string(),
            age: Some(11),
            photo_path: None,
            fees_balance: Some("120.00".to_string()),
        }
    }

    fn sample_term() -> Term {
        Term {
            name: "Term 1".to_string(),
            year: "2025".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            end_date: NaiveDate::from_ymd_opt(2025, 4, 10),
        }
    }

    fn sample_school() -> SchoolInfo {
        SchoolInfo {
            name: "Sunrise Academy".to_string(),
            motto: Some("Knowledge and Light".to_string()),
            address: Some("PO Box 12, Accra".to_string()),
            phone: Some("+233 20 000 0000".to_string()),
            email: Some("office@sunrise.example".to_string()),
            logo_path: None,
        }
    }

    fn sample_marks(count: usize) -> Vec<SubjectMark> {
        (0..count)
            .map(|i| {
                let score = 45.0 + (i as f64 % 50.0);
                SubjectMark {
                    subject_id: format!("sub-{}", i),
                    subject_code: format!("SUB{}", i),
                    subject_name: format!("Subject {}", i),
                    a1: Some(score),
                    a2: Some(score + 2.0),
                    a3: Some(score - 1.0),
                    average_score: score,
                    twenty_percent: score * 0.2,
                    eighty_percent: score * 0.8,
                    hundred_percent: score,
                    identifier: 1 + (i as i64 % 3),
                    final_grade: "B".to_string(),
                    achievement_level: "Moderate".to_string(),
                    teacher_initials: "JK".to_string(),
                }
            })
            .collect()
    }

    fn render_sample(key: TemplateKey, mark_count: usize) -> RenderedDocument {
        let student = sample_student();
        let term = sample_term();
        let school = sample_school();
        let marks = sample_marks(mark_count);
        let report = aggregate(&marks, &[], &[], &ManualOverrides::default());
        let inputs = RenderInputs {
            report: &report,
            student: &student,
            term: &term,
            school: &school,
            marks: &marks,
            printed_on: NaiveDate::from_ymd_opt(2025, 4, 12).expect("date"),
            logo: None,
            photo: None,
        };
        render(key, &inputs).expect("render")
    }

    #[test]
    fn unknown_template_key_falls_back_to_classic() {
        assert_eq!(TemplateKey::parse("holographic"), TemplateKey::Classic);
        assert_eq!(TemplateKey::parse("  MODERN "), TemplateKey::Modern);
        assert_eq!(TemplateKey::parse("minimal"), TemplateKey::Minimal);
    }

    #[test]
    fn next_term_is_thirty_calendar_days() {
        let end = NaiveDate::from_ymd_opt(2025, 4, 10).expect("date");
        assert_eq!(
            next_term_begins(end),
            NaiveDate::from_ymd_opt(2025, 5, 10).expect("date")
        );
    }

    #[test]
    fn comment_placeholder_applies_to_blank_text() {
        assert_eq!(comment_or_placeholder("  "), "No comment provided.");
        assert_eq!(comment_or_placeholder("Well done"), "Well done");
    }

    #[test]
    fn wrap_text_never_drops_words() {
        let text = "The quick brown fox jumps over the lazy dog again and again";
        let lines = wrap_text(text, 9.0, 40.0);
        assert!(lines.len() > 1);
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn every_template_renders_a_pdf() {
        for key in TemplateKey::all() {
            let doc = render_sample(key, 8);
            assert!(doc.bytes.len() > 4, "{} produced no bytes", key.as_str());
            assert_eq!(&doc.bytes[0..4], b"%PDF", "{} header", key.as_str());
            assert_eq!(doc.page_count, 1, "{} page count", key.as_str());
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        for key in TemplateKey::all() {
            let a = render_sample(key, 8);
            let b = render_sample(key, 8);
            assert_eq!(a.bytes, b.bytes, "{} bytes differ", key.as_str());
        }
    }

    #[test]
    fn long_mark_lists_paginate() {
        for key in TemplateKey::all() {
            let doc = render_sample(key, 60);
            assert!(
                doc.page_count >= 2,
                "{} should overflow one page, got {}",
                key.as_str(),
                doc.page_count
            );
        }
    }

    #[test]
    fn sheet_pagination_math_is_exact() {
        let mut sheet = Sheet::new("pagination").expect("sheet");
        let row_h = 10.0;
        let per_page = ((TOP_START - BOTTOM_MARGIN) / row_h).floor() as usize;
        let rows = per_page * 2 + 3;
        for _ in 0..rows {
            sheet.ensure_space(row_h);
            sheet.advance(row_h);
        }
        assert_eq!(sheet.page_count(), 3);
    }
}
