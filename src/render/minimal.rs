use super::*;

const ROW_H: f32 = 4.6;

fn list_header(sheet: &mut Sheet) {
    sheet.set_fill(dim_ink());
    sheet.text("SUBJECT", 7.0, MARGIN_LEFT, &sheet.bold);
    sheet.text("SCORE", 7.0, 102.0, &sheet.bold);
    sheet.text("GRADE", 7.0, 124.0, &sheet.bold);
    sheet.text("ACHIEVEMENT", 7.0, 144.0, &sheet.bold);
    sheet.text("INIT", 7.0, 184.0, &sheet.bold);
    sheet.advance(2.0);
    sheet.set_stroke(dim_ink());
    sheet.rule(MARGIN_LEFT, MARGIN_RIGHT);
    sheet.advance(4.6);
}

/// Sparse variant: composite score, grade, achievement and initials only, no
/// raw assessment breakdown.
pub fn render(inputs: &RenderInputs) -> anyhow::Result<RenderedDocument> {
    let report = inputs.report;
    let student = inputs.student;
    let term = inputs.term;
    let school = inputs.school;

    let mut sheet = Sheet::new(&format!("{} - {}", student.full_name, report_title(term)))?;

    // Header: centered identity with small corner images when supplied.
    if let Some(bytes) = inputs.logo {
        sheet.place_image(bytes, MARGIN_LEFT, TOP_START + 2.0, 14.0, 14.0);
    }
    if let Some(bytes) = inputs.photo {
        sheet.place_image(bytes, MARGIN_RIGHT - 14.0, TOP_START + 2.0, 14.0, 14.0);
    }
    sheet.set_fill(ink());
    sheet.text_centered(&school.name, 13.0, &sheet.bold);
    sheet.advance(5.5);
    let contact = contact_line(school);
    if !contact.is_empty() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(&contact, 7.5, &sheet.regular);
        sheet.advance(5.0);
    }
    sheet.advance(3.0);

    // Title: plain centered text.
    sheet.set_fill(ink());
    sheet.text_centered(&report_title(term), 10.0, &sheet.regular);
    sheet.advance(2.5);
    sheet.set_stroke(dim_ink());
    sheet.rule(80.0, 130.0);
    sheet.advance(8.0);

    // Student info as plain lines.
    let age = student.age.map(|a| a.to_string()).unwrap_or_default();
    let pairs = [
        ("Name", student.full_name.clone()),
        ("Gender", student.gender.clone()),
        ("Class", class_label(student)),
        ("House", student.house.clone()),
        ("Age", age),
        ("Printed on", format_date(inputs.printed_on)),
    ];
    for (label, value) in pairs {
        sheet.set_fill(dim_ink());
        sheet.text(label, 7.5, MARGIN_LEFT, &sheet.regular);
        sheet.set_fill(ink());
        sheet.text(&value, 7.5, MARGIN_LEFT + 26.0, &sheet.regular);
        sheet.advance(4.6);
    }
    sheet.advance(5.0);

    list_header(&mut sheet);
    for m in inputs.marks {
        if sheet.ensure_space(ROW_H + 2.0) {
            list_header(&mut sheet);
        }
        sheet.set_fill(ink());
        sheet.text(
            &truncate_to_width(&m.subject_name, 8.0, 80.0),
            8.0,
            MARGIN_LEFT,
            &sheet.regular,
        );
        sheet.text_right(&fmt_score(m.hundred_percent), 8.0, 114.0, &sheet.regular);
        sheet.text(&m.final_grade, 8.0, 124.0, &sheet.bold);
        sheet.text(&m.achievement_level, 8.0, 144.0, &sheet.regular);
        sheet.set_fill(dim_ink());
        sheet.text(&m.teacher_initials, 8.0, 184.0, &sheet.regular);
        sheet.advance(ROW_H);
    }
    sheet.advance(2.0);

    // Summary line.
    sheet.ensure_space(14.0);
    sheet.set_stroke(dim_ink());
    sheet.rule(MARGIN_LEFT, MARGIN_RIGHT);
    sheet.advance(5.0);
    sheet.set_fill(ink());
    sheet.text(
        &format!(
            "Overall Average {}   Grade {}   {} ({})",
            fmt_score(report.overall_average),
            report.overall_grade,
            report.achievement_level,
            report.overall_identifier
        ),
        9.0,
        MARGIN_LEFT,
        &sheet.bold,
    );
    sheet.advance(9.0);

    // Comments as labelled paragraphs inside a hairline box.
    for (label, text) in [
        ("CLASS TEACHER", report.class_teacher_comment.as_str()),
        ("HEAD TEACHER", report.headteacher_comment.as_str()),
    ] {
        let body = comment_or_placeholder(text);
        let lines = wrap_text(body, 8.0, MARGIN_RIGHT - MARGIN_LEFT - 6.0);
        let box_h = 7.5 + lines.len() as f32 * 4.2;
        sheet.ensure_space(box_h + 4.0);
        let top = sheet.y.0 + 3.5;
        sheet.set_stroke(dim_ink());
        sheet.frame(MARGIN_LEFT, top - box_h, MARGIN_RIGHT, top);
        sheet.set_fill(dim_ink());
        sheet.text(label, 7.0, MARGIN_LEFT + 3.0, &sheet.bold);
        sheet.advance(4.4);
        sheet.set_fill(ink());
        for line in &lines {
            sheet.text(line, 8.0, MARGIN_LEFT + 3.0, &sheet.regular);
            sheet.advance(4.2);
        }
        sheet.advance(5.0);
    }

    // Footer.
    sheet.ensure_space(12.0);
    let dates = footer_dates_line(term);
    if !dates.is_empty() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(&dates, 7.5, &sheet.regular);
        sheet.advance(4.6);
    }
    if let Some(motto) = school.motto.as_deref() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(motto, 7.5, &sheet.italic);
    }

    sheet.finish(&document_id(TemplateKey::Minimal, student, term))
}
