use super::*;

const CARD_H: f32 = 12.0;

fn teal() -> Color {
    Color::Rgb(Rgb::new(0.05, 0.46, 0.42, None))
}

fn card_fill() -> Color {
    Color::Rgb(Rgb::new(0.955, 0.96, 0.965, None))
}

/// Rounded-badge look approximated with a filled pill rectangle.
fn badge(sheet: &Sheet, x: f32, y_mid: f32, w: f32, text: &str, fill: Color) {
    sheet.fill_rect(x, y_mid - 2.6, x + w, y_mid + 2.8, fill);
    sheet.set_fill(white());
    let tx = x + (w - approx_text_width(text, 6.8)) / 2.0;
    sheet.text_at(text, 6.8, tx, y_mid - 1.1, &sheet.bold);
}

pub fn render(inputs: &RenderInputs) -> anyhow::Result<RenderedDocument> {
    let report = inputs.report;
    let student = inputs.student;
    let term = inputs.term;
    let school = inputs.school;

    let mut sheet = Sheet::new(&format!("{} - {}", student.full_name, report_title(term)))?;

    // Header: accent bar, left-aligned identity, images on the right.
    sheet.fill_rect(
        MARGIN_LEFT,
        sheet.y.0 - 16.0,
        MARGIN_LEFT + 2.2,
        sheet.y.0 + 4.0,
        teal(),
    );
    if let Some(bytes) = inputs.logo {
        sheet.place_image(bytes, MARGIN_RIGHT - 48.0, TOP_START + 3.0, 20.0, 20.0);
    }
    if let Some(bytes) = inputs.photo {
        sheet.place_image(bytes, MARGIN_RIGHT - 22.0, TOP_START + 3.0, 20.0, 20.0);
    }
    sheet.set_fill(ink());
    sheet.text(&school.name, 15.0, MARGIN_LEFT + 7.0, &sheet.bold);
    sheet.advance(6.5);
    if let Some(motto) = school.motto.as_deref() {
        sheet.set_fill(dim_ink());
        sheet.text(motto, 8.5, MARGIN_LEFT + 7.0, &sheet.italic);
        sheet.advance(4.8);
    }
    let contact = contact_line(school);
    if !contact.is_empty() {
        sheet.set_fill(dim_ink());
        sheet.text(&contact, 7.5, MARGIN_LEFT + 7.0, &sheet.regular);
        sheet.advance(4.8);
    }
    sheet.advance(6.0);

    // Title badge, horizontally centered.
    let title = report_title(term);
    let badge_w = approx_text_width(&title, 10.0) + 16.0;
    let bx = (PAGE_WIDTH - badge_w) / 2.0;
    sheet.fill_rect(bx, sheet.y.0 - 2.4, bx + badge_w, sheet.y.0 + 4.2, teal());
    sheet.set_fill(white());
    sheet.text_centered(&title, 10.0, &sheet.bold);
    sheet.advance(11.0);

    // Student info card, borderless.
    let card_top = sheet.y.0 + 3.5;
    sheet.fill_rect(MARGIN_LEFT, sheet.y.0 - 11.5, MARGIN_RIGHT, card_top, card_fill());
    let age = student.age.map(|a| a.to_string()).unwrap_or_default();
    let pairs = [
        ("Name", student.full_name.clone(), "Gender", student.gender.clone()),
        ("Class", class_label(student), "House", student.house.clone()),
        ("Age", age, "Printed on", format_date(inputs.printed_on)),
    ];
    for (l1, v1, l2, v2) in pairs {
        sheet.set_fill(dim_ink());
        sheet.text(l1, 7.5, MARGIN_LEFT + 4.0, &sheet.regular);
        sheet.text(l2, 7.5, 108.0, &sheet.regular);
        sheet.set_fill(ink());
        sheet.text(&v1, 7.5, MARGIN_LEFT + 26.0, &sheet.bold);
        sheet.text(&v2, 7.5, 131.0, &sheet.bold);
        sheet.advance(5.0);
    }
    sheet.advance(6.0);

    // One card per subject. The card stream is the only pagination-aware
    // section.
    for m in inputs.marks {
        sheet.ensure_space(CARD_H + 2.0);
        let top = sheet.y.0 + 3.0;
        sheet.fill_rect(MARGIN_LEFT, top - CARD_H, MARGIN_RIGHT, top, card_fill());
        sheet.set_fill(ink());
        sheet.text(
            &truncate_to_width(&m.subject_name, 9.0, 70.0),
            9.0,
            MARGIN_LEFT + 4.0,
            &sheet.bold,
        );
        sheet.set_fill(dim_ink());
        sheet.text_at(
            &format!(
                "A1 {}   A2 {}   A3 {}   Avg {}",
                fmt_opt_score(m.a1),
                fmt_opt_score(m.a2),
                fmt_opt_score(m.a3),
                fmt_score(m.average_score)
            ),
            7.0,
            MARGIN_LEFT + 4.0,
            sheet.y.0 - 5.2,
            &sheet.regular,
        );
        sheet.set_fill(ink());
        sheet.text(&format!("Grade {}", m.final_grade), 8.5, 118.0, &sheet.bold);
        badge(
            &sheet,
            138.0,
            sheet.y.0,
            28.0,
            &m.achievement_level,
            achievement_color(&m.achievement_level),
        );
        sheet.set_fill(ink());
        sheet.text_right(&fmt_score(m.hundred_percent), 11.0, MARGIN_RIGHT - 4.0, &sheet.bold);
        if !m.teacher_initials.is_empty() {
            sheet.set_fill(dim_ink());
            sheet.text_at(
                &m.teacher_initials,
                6.5,
                MARGIN_RIGHT - 12.0,
                sheet.y.0 - 5.2,
                &sheet.regular,
            );
        }
        sheet.advance(CARD_H + 2.0);
    }
    sheet.advance(3.0);

    // Summary card tinted by the overall achievement band.
    sheet.ensure_space(16.0);
    let top = sheet.y.0 + 3.5;
    sheet.fill_rect(
        MARGIN_LEFT,
        top - 13.0,
        MARGIN_RIGHT,
        top,
        achievement_tint(&report.achievement_level),
    );
    sheet.set_fill(achievement_color(&report.achievement_level));
    sheet.text("TERM SUMMARY", 8.0, MARGIN_LEFT + 4.0, &sheet.bold);
    sheet.advance(5.5);
    sheet.set_fill(ink());
    sheet.text(
        &format!(
            "Average {}   Grade {}   {} ({})",
            fmt_score(report.overall_average),
            report.overall_grade,
            report.achievement_level,
            report.overall_identifier
        ),
        9.5,
        MARGIN_LEFT + 4.0,
        &sheet.bold,
    );
    sheet.advance(11.0);

    // Comment cards.
    for (label, text) in [
        ("Class Teacher", report.class_teacher_comment.as_str()),
        ("Head Teacher", report.headteacher_comment.as_str()),
    ] {
        let body = comment_or_placeholder(text);
        let lines = wrap_text(body, 8.0, MARGIN_RIGHT - MARGIN_LEFT - 10.0);
        let box_h = 8.5 + lines.len() as f32 * 4.2;
        sheet.ensure_space(box_h + 4.0);
        let top = sheet.y.0 + 3.5;
        sheet.fill_rect(MARGIN_LEFT, top - box_h, MARGIN_RIGHT, top, card_fill());
        sheet.set_fill(teal());
        sheet.text(label, 7.5, MARGIN_LEFT + 4.0, &sheet.bold);
        sheet.advance(5.0);
        sheet.set_fill(ink());
        for line in &lines {
            sheet.text(line, 8.0, MARGIN_LEFT + 4.0, &sheet.regular);
            sheet.advance(4.2);
        }
        sheet.advance(5.0);
    }

    // Footer.
    sheet.ensure_space(14.0);
    let dates = footer_dates_line(term);
    if !dates.is_empty() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(&dates, 7.5, &sheet.regular);
        sheet.advance(4.8);
    }
    if let Some(motto) = school.motto.as_deref() {
        sheet.set_fill(dim_ink());
        sheet.text_centered(motto, 7.5, &sheet.italic);
    }

    sheet.finish(&document_id(TemplateKey::Modern, student, term))
}
