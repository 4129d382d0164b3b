use crate::calc;
use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model;
use crate::render::{RenderInputs, TemplateKey};
use chrono::NaiveDate;
use serde_json::json;
use std::path::{Path, PathBuf};

fn calc_err(req: &Request, e: calc::CalcError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}

fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    calc::coerce_f64(req.params.get(key))
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn out_dir<'a>(state: &'a AppState, req: &Request) -> Result<&'a PathBuf, serde_json::Value> {
    state
        .workspace
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// The image collaborator resolves references to local files before calling
/// the daemon; unreadable data degrades to an omitted image region.
fn load_image(path: Option<&Path>) -> Option<Vec<u8>> {
    path.and_then(|p| std::fs::read(p).ok())
}

fn handle_grading_resolve(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let percentage = match required_f64(req, "percentage") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bands = match calc::parse_grading_bands(req.params.get("gradingBands")) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    ok(
        &req.id,
        json!({ "grade": calc::resolve_grade(percentage, &bands) }),
    )
}

fn handle_comments_resolve(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(kind_raw) = calc::coerce_string(req.params.get("kind")) else {
        return err(&req.id, "bad_params", "missing kind", None);
    };
    let Some(kind) = calc::CommentKind::parse(&kind_raw) else {
        return err(
            &req.id,
            "bad_params",
            "kind must be class_teacher or headteacher",
            None,
        );
    };
    let average = match required_f64(req, "average") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let templates = match calc::parse_comment_templates(req.params.get("commentTemplates")) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    let manual = calc::coerce_string(req.params.get("manualOverride"));
    ok(
        &req.id,
        json!({
            "comment": calc::resolve_comment(kind, average, &templates, manual.as_deref())
        }),
    )
}

fn handle_templates_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let templates: Vec<serde_json::Value> = TemplateKey::all()
        .iter()
        .map(|k| json!({ "key": k.as_str(), "label": k.label() }))
        .collect();
    ok(&req.id, json!({ "templates": templates }))
}

fn handle_report_aggregate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let bands = match calc::parse_grading_bands(req.params.get("gradingBands")) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    let templates = match calc::parse_comment_templates(req.params.get("commentTemplates")) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    let marks = match calc::parse_subject_marks(req.params.get("marks"), &bands) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    let overrides = calc::parse_overrides(req.params.get("overrides"));
    let report = calc::aggregate(&marks, &bands, &templates, &overrides);
    ok(&req.id, json!(report))
}

/// Config shared across a generation request (and by every student in a
/// bundle request).
struct SharedConfig {
    template: TemplateKey,
    term: model::Term,
    school: model::SchoolInfo,
    bands: Vec<calc::GradingBand>,
    templates: Vec<calc::CommentTemplate>,
    printed_on: NaiveDate,
    logo: Option<Vec<u8>>,
}

fn parse_shared(req: &Request) -> Result<SharedConfig, serde_json::Value> {
    let template = TemplateKey::parse(
        &calc::coerce_string(req.params.get("template")).unwrap_or_default(),
    );
    let term = model::parse_term(req.params.get("term")).map_err(|e| calc_err(req, e))?;
    let school = model::parse_school(req.params.get("school")).map_err(|e| calc_err(req, e))?;
    let bands =
        calc::parse_grading_bands(req.params.get("gradingBands")).map_err(|e| calc_err(req, e))?;
    let templates = calc::parse_comment_templates(req.params.get("commentTemplates"))
        .map_err(|e| calc_err(req, e))?;
    let printed_on = model::parse_printed_on(req.params.get("printedOn"));
    let logo = load_image(school.logo_path.as_deref());
    Ok(SharedConfig {
        template,
        term,
        school,
        bands,
        templates,
        printed_on,
        logo,
    })
}

/// One student's fully aggregated render job.
struct StudentJob {
    student: model::Student,
    marks: Vec<calc::SubjectMark>,
    report: calc::ReportData,
    photo: Option<Vec<u8>>,
}

fn parse_student_job(
    req: &Request,
    shared: &SharedConfig,
    params: &serde_json::Value,
) -> Result<StudentJob, serde_json::Value> {
    let student = model::parse_student(params.get("student")).map_err(|e| calc_err(req, e))?;
    let marks = calc::parse_subject_marks(params.get("marks"), &shared.bands)
        .map_err(|e| calc_err(req, e))?;
    let overrides = calc::parse_overrides(params.get("overrides"));
    let report = calc::aggregate(&marks, &shared.bands, &shared.templates, &overrides);
    let photo = load_image(student.photo_path.as_deref());
    Ok(StudentJob {
        student,
        marks,
        report,
        photo,
    })
}

fn assemble_job(
    shared: &SharedConfig,
    job: &StudentJob,
) -> anyhow::Result<export::ExportedReport> {
    let inputs = RenderInputs {
        report: &job.report,
        student: &job.student,
        term: &shared.term,
        school: &shared.school,
        marks: &job.marks,
        printed_on: shared.printed_on,
        logo: shared.logo.as_deref(),
        photo: job.photo.as_deref(),
    };
    export::assemble(shared.template, &inputs)
}

fn handle_report_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dir = match out_dir(state, req) {
        Ok(v) => v.clone(),
        Err(e) => return e,
    };
    let shared = match parse_shared(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let job = match parse_student_job(req, &shared, &req.params) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exported = match assemble_job(&shared, &job) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "render_failed", e.to_string(), None),
    };
    let path = match export::write_report(&dir, &exported) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "fileName": exported.file_name,
            "path": path.to_string_lossy(),
            "byteCount": exported.bytes.len(),
            "pageCount": exported.page_count,
            "sha256": export::sha256_hex(&exported.bytes),
        }),
    )
}

fn handle_report_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dir = match out_dir(state, req) {
        Ok(v) => v.clone(),
        Err(e) => return e,
    };
    let shared = match parse_shared(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(students) = req.params.get("students").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing students array", None);
    };

    // Bulk generation is strictly sequential: one student finishes before the
    // next begins, and a single failure aborts the whole bundle.
    let mut reports: Vec<(String, export::ExportedReport)> = Vec::with_capacity(students.len());
    for entry in students {
        let job = match parse_student_job(req, &shared, entry) {
            Ok(v) => v,
            Err(e) => return e,
        };
        let exported = match assemble_job(&shared, &job) {
            Ok(v) => v,
            Err(e) => {
                return err(
                    &req.id,
                    "render_failed",
                    e.to_string(),
                    Some(json!({ "student": job.student.full_name })),
                )
            }
        };
        reports.push((job.student.full_name.clone(), exported));
    }

    let bundle_name = format!(
        "{}_{}_report_cards.zip",
        export::slug(&shared.term.name),
        export::slug(&shared.term.year)
    );
    let summary =
        match export::export_class_bundle(&dir, &bundle_name, shared.printed_on, &reports) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
        };

    ok(
        &req.id,
        json!({
            "bundlePath": summary.bundle_path.to_string_lossy(),
            "entryCount": summary.entry_count,
            "reports": summary.entries,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grading.resolve" => Some(handle_grading_resolve(state, req)),
        "comments.resolve" => Some(handle_comments_resolve(state, req)),
        "templates.list" => Some(handle_templates_list(state, req)),
        "report.aggregate" => Some(handle_report_aggregate(state, req)),
        "report.export" => Some(handle_report_export(state, req)),
        "report.exportBundle" => Some(handle_report_export_bundle(state, req)),
        _ => None,
    }
}
