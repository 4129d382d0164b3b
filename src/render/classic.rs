use super::*;

const NAVY: (f32, f32, f32) = (0.12, 0.22, 0.49);
const ROW_H: f32 = 5.0;

fn navy() -> Color {
    Color::Rgb(Rgb::new(NAVY.0, NAVY.1, NAVY.2, None))
}

fn navy_tint() -> Color {
    Color::Rgb(Rgb::new(0.88, 0.91, 0.97, None))
}

fn table_header(sheet: &mut Sheet) {
    let top = sheet.y.0 + 3.5;
    sheet.fill_rect(MARGIN_LEFT, sheet.y.0 - 1.8, MARGIN_RIGHT, top, navy());
    sheet.set_fill(white());
    sheet.text("SUBJECT", 7.0, 16.0, &sheet.bold);
    sheet.text("A1", 7.0, 56.0, &sheet.bold);
    sheet.text("A2", 7.0, 68.0, &sheet.bold);
    sheet.text("A3", 7.0, 80.0, &sheet.bold);
    sheet.text("AVG", 7.0, 92.0, &sheet.bold);
    sheet.text("20%", 7.0, 105.0, &sheet.bold);
    sheet.text("80%", 7.0, 119.0, &sheet.bold);
    sheet.text("100%", 7.0, 133.0, &sheet.bold);
    sheet.text("GRADE", 7.0, 147.0, &sheet.bold);
    sheet.text("REMARK", 7.0, 160.0, &sheet.bold);
    sheet.text("INIT", 7.0, 185.0, &sheet.bold);
    sheet.advance(6.2);
}

pub fn render(inputs: &RenderInputs) -> anyhow::Result<RenderedDocument> {
    let report = inputs.report;
    let student = inputs.student;
    let term = inputs.term;
    let school = inputs.school;

    let mut sheet = Sheet::new(&format!("{} - {}", student.full_name, report_title(term)))?;

    // Header band: school identity centered, logo left, photo right. Either
    // image region is simply omitted when no embeddable data was supplied.
    if let Some(bytes) = inputs.logo {
        sheet.place_image(bytes, MARGIN_LEFT + 2.0, TOP_START + 2.0, 18.0, 18.0);
    }
    if let Some(bytes) = inputs.photo {
        sheet.place_image(bytes, MARGIN_RIGHT - 20.0, TOP_START + 2.0, 18.0, 18.0);
    }
    sheet.set_fill(ink());
    sheet.text_centered(&school.name.to_uppercase(), 16.0, &sheet.bold);
    sheet.advance(7.0);
    if let Some(motto) = school.motto.as_deref() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(motto, 9.0, &sheet.italic);
        sheet.advance(5.0);
    }
    let contact = contact_line(school);
    if !contact.is_empty() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(&contact, 8.0, &sheet.regular);
        sheet.advance(5.0);
    }
    // Keep the rule clear of the image regions when the text lines are short.
    if (inputs.logo.is_some() || inputs.photo.is_some()) && sheet.y.0 > TOP_START - 17.0 {
        sheet.y = Mm(TOP_START - 17.0);
    }
    sheet.set_stroke(ink());
    sheet.rule(MARGIN_LEFT, MARGIN_RIGHT);
    sheet.advance(8.0);

    // Title band, navy block with centered white text.
    let title = report_title(term);
    let band_top = sheet.y.0 + 4.5;
    sheet.fill_rect(MARGIN_LEFT, sheet.y.0 - 2.5, MARGIN_RIGHT, band_top, navy());
    sheet.set_fill(white());
    sheet.text_centered(&title, 11.0, &sheet.bold);
    sheet.advance(11.0);

    // Student identity block, bordered two-column table.
    let age = student
        .age
        .map(|a| a.to_string())
        .unwrap_or_default();
    let rows: [[(&str, String); 2]; 3] = [
        [
            ("Name", student.full_name.clone()),
            ("Gender", student.gender.clone()),
        ],
        [
            ("Class", class_label(student)),
            ("House", student.house.clone()),
        ],
        [
            ("Age", age),
            ("Printed on", format_date(inputs.printed_on)),
        ],
    ];
    let box_top = sheet.y.0 + 4.0;
    let box_bottom = sheet.y.0 - 13.0;
    sheet.set_stroke(dim_ink());
    sheet.frame(MARGIN_LEFT, box_bottom, MARGIN_RIGHT, box_top);
    for [left, right] in rows {
        sheet.set_fill(dim_ink());
        sheet.text(left.0, 8.0, MARGIN_LEFT + 3.0, &sheet.bold);
        sheet.text(right.0, 8.0, 108.0, &sheet.bold);
        sheet.set_fill(ink());
        sheet.text(&left.1, 8.0, MARGIN_LEFT + 26.0, &sheet.regular);
        sheet.text(&right.1, 8.0, 131.0, &sheet.regular);
        sheet.advance(6.0);
    }
    sheet.advance(6.0);

    // Performance table. Only this loop is pagination-aware; continuation
    // pages restart at the column captions, not the full header.
    table_header(&mut sheet);
    for (i, m) in inputs.marks.iter().enumerate() {
        if sheet.ensure_space(ROW_H + 2.0) {
            table_header(&mut sheet);
        }
        if i % 2 == 1 {
            sheet.fill_rect(
                MARGIN_LEFT,
                sheet.y.0 - 1.6,
                MARGIN_RIGHT,
                sheet.y.0 + 3.4,
                row_shade(),
            );
        }
        sheet.set_fill(ink());
        sheet.text(
            &truncate_to_width(&m.subject_name, 7.5, 38.0),
            7.5,
            16.0,
            &sheet.regular,
        );
        sheet.text(&fmt_opt_score(m.a1), 7.5, 56.0, &sheet.regular);
        sheet.text(&fmt_opt_score(m.a2), 7.5, 68.0, &sheet.regular);
        sheet.text(&fmt_opt_score(m.a3), 7.5, 80.0, &sheet.regular);
        sheet.text(&fmt_score(m.average_score), 7.5, 92.0, &sheet.regular);
        sheet.text(&fmt_score(m.twenty_percent), 7.5, 105.0, &sheet.regular);
        sheet.text(&fmt_score(m.eighty_percent), 7.5, 119.0, &sheet.regular);
        sheet.text(&fmt_score(m.hundred_percent), 7.5, 133.0, &sheet.bold);
        sheet.text(&m.final_grade, 7.5, 147.0, &sheet.bold);
        sheet.text(
            &truncate_to_width(&m.achievement_level, 7.5, 23.0),
            7.5,
            160.0,
            &sheet.regular,
        );
        sheet.text(&m.teacher_initials, 7.5, 185.0, &sheet.regular);
        sheet.advance(ROW_H);
    }
    sheet.advance(4.0);

    // Summary band.
    sheet.ensure_space(14.0);
    let strip_top = sheet.y.0 + 4.0;
    sheet.fill_rect(MARGIN_LEFT, sheet.y.0 - 2.2, MARGIN_RIGHT, strip_top, navy_tint());
    sheet.set_fill(ink());
    sheet.text(
        &format!("Overall Average: {}", fmt_score(report.overall_average)),
        9.0,
        17.0,
        &sheet.bold,
    );
    sheet.text(
        &format!("Overall Grade: {}", report.overall_grade),
        9.0,
        86.0,
        &sheet.bold,
    );
    sheet.text(
        &format!(
            "Achievement: {} ({})",
            report.achievement_level, report.overall_identifier
        ),
        9.0,
        132.0,
        &sheet.bold,
    );
    sheet.advance(12.0);

    draw_legend(&mut sheet, navy());

    // Comment blocks.
    for (label, text) in [
        ("Class Teacher's Comment", report.class_teacher_comment.as_str()),
        ("Head Teacher's Comment", report.headteacher_comment.as_str()),
    ] {
        let body = comment_or_placeholder(text);
        let lines = wrap_text(body, 8.5, MARGIN_RIGHT - MARGIN_LEFT - 8.0);
        let box_h = 9.0 + lines.len() as f32 * 4.4;
        sheet.ensure_space(box_h + 4.0);
        let top = sheet.y.0 + 4.0;
        sheet.set_stroke(dim_ink());
        sheet.frame(MARGIN_LEFT, top - box_h, MARGIN_RIGHT, top);
        sheet.set_fill(navy());
        sheet.text(label, 8.5, MARGIN_LEFT + 3.0, &sheet.bold);
        sheet.advance(5.5);
        sheet.set_fill(ink());
        for line in &lines {
            sheet.text(line, 8.5, MARGIN_LEFT + 3.0, &sheet.regular);
            sheet.advance(4.4);
        }
        sheet.advance(5.0);
    }

    // Footer: dates, fee cells, motto tagline.
    sheet.ensure_space(20.0);
    sheet.set_stroke(ink());
    sheet.rule(MARGIN_LEFT, MARGIN_RIGHT);
    sheet.advance(5.0);
    let dates = footer_dates_line(term);
    if !dates.is_empty() {
        sheet.set_fill(ink());
        sheet.text(&dates, 8.0, MARGIN_LEFT, &sheet.regular);
        sheet.advance(5.0);
    }
    let fees = student
        .fees_balance
        .clone()
        .unwrap_or_else(|| "____________".to_string());
    sheet.set_fill(dim_ink());
    sheet.text(&format!("Fees Balance: {}", fees), 8.0, MARGIN_LEFT, &sheet.regular);
    sheet.text("Next Term Fees: ____________", 8.0, 110.0, &sheet.regular);
    sheet.advance(6.0);
    if let Some(motto) = school.motto.as_deref() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(&format!("\"{}\"", motto), 8.0, &sheet.italic);
    }

    sheet.finish(&document_id(TemplateKey::Classic, student, term))
}
