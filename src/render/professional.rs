use super::*;

const ROW_H: f32 = 5.0;

fn charcoal() -> Color {
    Color::Rgb(Rgb::new(0.16, 0.17, 0.20, None))
}

fn label_shade() -> Color {
    Color::Rgb(Rgb::new(0.90, 0.90, 0.92, None))
}

fn table_header(sheet: &mut Sheet) {
    let top = sheet.y.0 + 3.5;
    sheet.fill_rect(MARGIN_LEFT, sheet.y.0 - 1.8, MARGIN_RIGHT, top, charcoal());
    sheet.set_fill(white());
    sheet.text("Subject", 7.0, 16.0, &sheet.bold);
    sheet.text("A1", 7.0, 56.0, &sheet.bold);
    sheet.text("A2", 7.0, 68.0, &sheet.bold);
    sheet.text("A3", 7.0, 80.0, &sheet.bold);
    sheet.text("Avg", 7.0, 92.0, &sheet.bold);
    sheet.text("20%", 7.0, 105.0, &sheet.bold);
    sheet.text("80%", 7.0, 119.0, &sheet.bold);
    sheet.text("100%", 7.0, 133.0, &sheet.bold);
    sheet.text("Grade", 7.0, 147.0, &sheet.bold);
    sheet.text("Remark", 7.0, 160.0, &sheet.bold);
    sheet.text("Init", 7.0, 185.0, &sheet.bold);
    sheet.advance(6.2);
}

pub fn render(inputs: &RenderInputs) -> anyhow::Result<RenderedDocument> {
    let report = inputs.report;
    let student = inputs.student;
    let term = inputs.term;
    let school = inputs.school;

    let mut sheet = Sheet::new(&format!("{} - {}", student.full_name, report_title(term)))?;

    // Full-bleed charcoal masthead.
    sheet.fill_rect(0.0, TOP_START - 14.0, PAGE_WIDTH, PAGE_HEIGHT, charcoal());
    if let Some(bytes) = inputs.logo {
        sheet.place_image(bytes, MARGIN_RIGHT - 18.0, TOP_START + 7.0, 18.0, 18.0);
    }
    if let Some(bytes) = inputs.photo {
        sheet.place_image(bytes, MARGIN_RIGHT - 40.0, TOP_START + 7.0, 18.0, 18.0);
    }
    sheet.set_fill(white());
    sheet.text_at(&school.name, 15.0, MARGIN_LEFT, TOP_START + 1.0, &sheet.bold);
    let contact = contact_line(school);
    if !contact.is_empty() {
        sheet.text_at(&contact, 7.5, MARGIN_LEFT, TOP_START - 5.0, &sheet.regular);
    }
    if let Some(motto) = school.motto.as_deref() {
        sheet.text_at(motto, 7.5, MARGIN_LEFT, TOP_START - 10.5, &sheet.italic);
    }
    sheet.y = Mm(TOP_START - 21.0);

    // Title: plain centered text between thin rules.
    let title = report_title(term);
    sheet.set_fill(ink());
    sheet.text_centered(&title, 11.5, &sheet.bold);
    sheet.advance(2.5);
    sheet.set_stroke(dim_ink());
    sheet.rule(60.0, 150.0);
    sheet.advance(8.0);

    // Student identity, bordered table with shaded label cells.
    let age = student.age.map(|a| a.to_string()).unwrap_or_default();
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
    sheet.fill_rect(MARGIN_LEFT, box_bottom, MARGIN_LEFT + 24.0, box_top, label_shade());
    sheet.fill_rect(105.0, box_bottom, 129.0, box_top, label_shade());
    sheet.set_stroke(charcoal());
    sheet.frame(MARGIN_LEFT, box_bottom, MARGIN_RIGHT, box_top);
    for [left, right] in rows {
        sheet.set_fill(charcoal());
        sheet.text(left.0, 8.0, MARGIN_LEFT + 2.5, &sheet.bold);
        sheet.text(right.0, 8.0, 107.5, &sheet.bold);
        sheet.set_fill(ink());
        sheet.text(&left.1, 8.0, MARGIN_LEFT + 27.0, &sheet.regular);
        sheet.text(&right.1, 8.0, 132.0, &sheet.regular);
        sheet.advance(6.0);
    }
    sheet.advance(6.0);

    // Performance table; pagination only happens inside the row loop.
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
        sheet.set_fill(achievement_color(&m.achievement_level));
        sheet.text(&m.final_grade, 7.5, 147.0, &sheet.bold);
        sheet.set_fill(ink());
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

    // Summary strip with a left accent bar.
    sheet.ensure_space(14.0);
    let strip_top = sheet.y.0 + 4.0;
    let strip_bottom = sheet.y.0 - 2.2;
    sheet.fill_rect(MARGIN_LEFT, strip_bottom, MARGIN_LEFT + 2.2, strip_top, charcoal());
    sheet.set_stroke(charcoal());
    sheet.frame(MARGIN_LEFT, strip_bottom, MARGIN_RIGHT, strip_top);
    sheet.set_fill(ink());
    sheet.text(
        &format!("Overall Average: {}", fmt_score(report.overall_average)),
        9.0,
        20.0,
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

    draw_legend(&mut sheet, charcoal());

    // Comments, headed by a shaded label bar.
    for (label, text) in [
        ("Class Teacher's Comment", report.class_teacher_comment.as_str()),
        ("Head Teacher's Comment", report.headteacher_comment.as_str()),
    ] {
        let body = comment_or_placeholder(text);
        let lines = wrap_text(body, 8.5, MARGIN_RIGHT - MARGIN_LEFT - 8.0);
        let box_h = 10.0 + lines.len() as f32 * 4.4;
        sheet.ensure_space(box_h + 4.0);
        let top = sheet.y.0 + 4.0;
        sheet.fill_rect(MARGIN_LEFT, top - 6.0, MARGIN_RIGHT, top, label_shade());
        sheet.set_stroke(charcoal());
        sheet.frame(MARGIN_LEFT, top - box_h, MARGIN_RIGHT, top);
        sheet.set_fill(charcoal());
        sheet.text(label, 8.5, MARGIN_LEFT + 3.0, &sheet.bold);
        sheet.advance(7.0);
        sheet.set_fill(ink());
        for line in &lines {
            sheet.text(line, 8.5, MARGIN_LEFT + 3.0, &sheet.regular);
            sheet.advance(4.4);
        }
        sheet.advance(5.0);
    }

    // Footer with fee cells.
    sheet.ensure_space(20.0);
    sheet.set_stroke(charcoal());
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

    sheet.finish(&document_id(TemplateKey::Professional, student, term))
}
