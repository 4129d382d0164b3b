use serde::Serialize;
use serde_json::Value;

/// 1-decimal rounding applied at mark-entry time: `Int(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Half-up rounding for identifier means (2.5 rounds to 3).
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

pub const DEFAULT_IDENTIFIER: i64 = 2;

const GRADE_SENTINEL: &str = "E";
const DEFAULT_CLASS_TEACHER_COMMENT: &str = "Good work, keep it up!";
const DEFAULT_HEADTEACHER_COMMENT: &str = "Excellent progress this term.";

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    ClassTeacher,
    HeadTeacher,
}

impl CommentKind {
    pub fn parse(s: &str) -> Option<CommentKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class_teacher" | "classteacher" => Some(CommentKind::ClassTeacher),
            "headteacher" | "head_teacher" => Some(CommentKind::HeadTeacher),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradingBand {
    pub grade_name: String,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentTemplate {
    pub comment_type: CommentKind,
    pub min_average: f64,
    pub max_average: f64,
    pub comment_text: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub subject_id: String,
    pub subject_code: String,
    pub subject_name: String,
    pub a1: Option<f64>,
    pub a2: Option<f64>,
    pub a3: Option<f64>,
    pub average_score: f64,
    pub twenty_percent: f64,
    pub eighty_percent: f64,
    pub hundred_percent: f64,
    pub identifier: i64,
    pub final_grade: String,
    pub achievement_level: String,
    pub teacher_initials: String,
}

#[derive(Debug, Clone, Default)]
pub struct ManualOverrides {
    pub class_teacher: Option<String>,
    pub head_teacher: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub overall_average: f64,
    pub overall_grade: String,
    pub overall_identifier: i64,
    pub achievement_level: String,
    pub class_teacher_comment: String,
    pub headteacher_comment: String,
}

/// First band containing the percentage wins. Bands are checked in descending
/// min-bound order so a catch-all row never shadows a narrower one, whatever
/// order the data provider returned them in.
pub fn resolve_grade(percentage: f64, bands: &[GradingBand]) -> String {
    if bands.is_empty() {
        return fallback_grade(percentage).to_string();
    }

    let mut order: Vec<usize> = (0..bands.len()).collect();
    order.sort_by(|a, b| {
        bands[*b]
            .min_percentage
            .partial_cmp(&bands[*a].min_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for idx in order {
        let band = &bands[idx];
        if band.min_percentage <= percentage && percentage <= band.max_percentage {
            return band.grade_name.clone();
        }
    }
    GRADE_SENTINEL.to_string()
}

fn fallback_grade(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "A"
    } else if percentage >= 70.0 {
        "B"
    } else if percentage >= 60.0 {
        "C"
    } else if percentage >= 40.0 {
        "D"
    } else {
        "E"
    }
}

pub fn resolve_achievement_level(identifier: f64) -> &'static str {
    if identifier >= 2.5 {
        "Outstanding"
    } else if identifier >= 1.5 {
        "Moderate"
    } else {
        "Basic"
    }
}

/// Active templates of the matching kind are range-checked in descending
/// min-bound order; then the manual override; then the fixed default.
pub fn resolve_comment(
    kind: CommentKind,
    average: f64,
    templates: &[CommentTemplate],
    manual_override: Option<&str>,
) -> String {
    let mut candidates: Vec<&CommentTemplate> = templates
        .iter()
        .filter(|t| t.is_active && t.comment_type == kind)
        .collect();
    candidates.sort_by(|a, b| {
        b.min_average
            .partial_cmp(&a.min_average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for t in candidates {
        if t.min_average <= average && average <= t.max_average {
            return t.comment_text.clone();
        }
    }

    if let Some(text) = manual_override {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match kind {
        CommentKind::ClassTeacher => DEFAULT_CLASS_TEACHER_COMMENT.to_string(),
        CommentKind::HeadTeacher => DEFAULT_HEADTEACHER_COMMENT.to_string(),
    }
}

/// Pure transform from one student's term marks to the aggregate report row.
/// Missing data never fails: an empty mark set yields the neutral report.
pub fn aggregate(
    marks: &[SubjectMark],
    bands: &[GradingBand],
    templates: &[CommentTemplate],
    overrides: &ManualOverrides,
) -> ReportData {
    let (overall_average, overall_identifier) = if marks.is_empty() {
        (0.0, DEFAULT_IDENTIFIER)
    } else {
        let n = marks.len() as f64;
        let avg = marks.iter().map(|m| m.hundred_percent).sum::<f64>() / n;
        let ident_mean = marks.iter().map(|m| m.identifier as f64).sum::<f64>() / n;
        (avg, round_half_up(ident_mean))
    };

    ReportData {
        overall_average,
        overall_grade: resolve_grade(overall_average, bands),
        overall_identifier,
        achievement_level: resolve_achievement_level(overall_identifier as f64).to_string(),
        class_teacher_comment: resolve_comment(
            CommentKind::ClassTeacher,
            overall_average,
            templates,
            overrides.class_teacher.as_deref(),
        ),
        headteacher_comment: resolve_comment(
            CommentKind::HeadTeacher,
            overall_average,
            templates,
            overrides.head_teacher.as_deref(),
        ),
    }
}

// Boundary parsing. Params arrive as loose JSON; form inputs stringify
// numbers, so numeric fields accept either shape and fall back to defaults.

pub fn coerce_f64(v: Option<&Value>) -> Option<f64> {
    match v {
        None => None,
        Some(Value::Null) => None,
        Some(v) => {
            if let Some(n) = v.as_f64() {
                Some(n)
            } else {
                v.as_str().and_then(|s| s.trim().parse::<f64>().ok())
            }
        }
    }
}

pub fn coerce_i64(v: Option<&Value>) -> Option<i64> {
    match v {
        None => None,
        Some(Value::Null) => None,
        Some(v) => {
            if let Some(n) = v.as_i64() {
                Some(n)
            } else if let Some(n) = v.as_f64() {
                Some(round_half_up(n))
            } else {
                v.as_str().and_then(|s| s.trim().parse::<i64>().ok())
            }
        }
    }
}

/// Trimmed, non-empty string or nothing.
pub fn coerce_string(v: Option<&Value>) -> Option<String> {
    let s = v.and_then(|v| v.as_str())?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn rows_of<'a>(raw: Option<&'a Value>, field: &str) -> Result<Vec<&'a Value>, CalcError> {
    match raw {
        None => Ok(Vec::new()),
        Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) => Ok(rows.iter().collect()),
        Some(_) => Err(CalcError::new(
            "bad_params",
            format!("{} must be an array", field),
        )),
    }
}

pub fn parse_grading_bands(raw: Option<&Value>) -> Result<Vec<GradingBand>, CalcError> {
    let mut bands = Vec::new();
    for row in rows_of(raw, "gradingBands")? {
        let Some(obj) = row.as_object() else {
            return Err(CalcError::new(
                "bad_params",
                "gradingBands rows must be objects",
            ));
        };
        let Some(grade_name) = coerce_string(obj.get("gradeName")) else {
            return Err(CalcError::new(
                "bad_params",
                "gradingBands rows require gradeName",
            ));
        };
        bands.push(GradingBand {
            grade_name,
            min_percentage: coerce_f64(obj.get("minPercentage")).unwrap_or(0.0),
            max_percentage: coerce_f64(obj.get("maxPercentage")).unwrap_or(100.0),
            description: coerce_string(obj.get("description")),
        });
    }
    Ok(bands)
}

pub fn parse_comment_templates(raw: Option<&Value>) -> Result<Vec<CommentTemplate>, CalcError> {
    let mut templates = Vec::new();
    for row in rows_of(raw, "commentTemplates")? {
        let Some(obj) = row.as_object() else {
            return Err(CalcError::new(
                "bad_params",
                "commentTemplates rows must be objects",
            ));
        };
        let Some(kind_raw) = coerce_string(obj.get("commentType")) else {
            return Err(CalcError::new(
                "bad_params",
                "commentTemplates rows require commentType",
            ));
        };
        let Some(comment_type) = CommentKind::parse(&kind_raw) else {
            return Err(CalcError::new(
                "bad_params",
                "commentType must be class_teacher or headteacher",
            ));
        };
        templates.push(CommentTemplate {
            comment_type,
            min_average: coerce_f64(obj.get("minAverage")).unwrap_or(0.0),
            max_average: coerce_f64(obj.get("maxAverage")).unwrap_or(100.0),
            comment_text: coerce_string(obj.get("commentText")).unwrap_or_default(),
            is_active: obj.get("isActive").and_then(|v| v.as_bool()).unwrap_or(true),
        });
    }
    Ok(templates)
}

pub fn parse_overrides(raw: Option<&Value>) -> ManualOverrides {
    let Some(obj) = raw.and_then(|v| v.as_object()) else {
        return ManualOverrides::default();
    };
    ManualOverrides {
        class_teacher: coerce_string(obj.get("classTeacher")),
        head_teacher: coerce_string(obj.get("headTeacher")),
    }
}

/// Converts loose mark rows into the strict internal shape. Missing composite
/// fields are derived from the assessment average; missing grade and
/// achievement labels are resolved once here and then treated as
/// authoritative by the renderers.
pub fn parse_subject_marks(
    raw: Option<&Value>,
    bands: &[GradingBand],
) -> Result<Vec<SubjectMark>, CalcError> {
    let mut marks = Vec::new();
    for row in rows_of(raw, "marks")? {
        let Some(obj) = row.as_object() else {
            return Err(CalcError::new("bad_params", "marks rows must be objects"));
        };
        let Some(subject_code) = coerce_string(obj.get("subjectCode")) else {
            return Err(CalcError::new(
                "bad_params",
                "marks rows require subjectCode",
            ));
        };

        let a1 = coerce_f64(obj.get("a1"));
        let a2 = coerce_f64(obj.get("a2"));
        let a3 = coerce_f64(obj.get("a3"));

        let average_score = coerce_f64(obj.get("averageScore")).unwrap_or_else(|| {
            let sum = a1.unwrap_or(0.0) + a2.unwrap_or(0.0) + a3.unwrap_or(0.0);
            round_off_1_decimal(sum / 3.0)
        });

        let twenty_percent =
            coerce_f64(obj.get("twentyPercent")).unwrap_or_else(|| average_score * 0.2);
        let eighty_percent =
            coerce_f64(obj.get("eightyPercent")).unwrap_or_else(|| average_score * 0.8);
        let hundred_percent =
            coerce_f64(obj.get("hundredPercent")).unwrap_or(twenty_percent + eighty_percent);

        let identifier = coerce_i64(obj.get("identifier"))
            .unwrap_or(DEFAULT_IDENTIFIER)
            .clamp(1, 3);

        let final_grade = coerce_string(obj.get("finalGrade"))
            .unwrap_or_else(|| resolve_grade(hundred_percent, bands));
        let achievement_level = coerce_string(obj.get("achievementLevel"))
            .unwrap_or_else(|| resolve_achievement_level(identifier as f64).to_string());

        marks.push(SubjectMark {
            subject_id: coerce_string(obj.get("subjectId")).unwrap_or_else(|| subject_code.clone()),
            subject_name: coerce_string(obj.get("subjectName"))
                .unwrap_or_else(|| subject_code.clone()),
            subject_code,
            a1,
            a2,
            a3,
            average_score,
            twenty_percent,
            eighty_percent,
            hundred_percent,
            identifier,
            final_grade,
            achievement_level,
            teacher_initials: coerce_string(obj.get("teacherInitials")).unwrap_or_default(),
        });
    }
    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn band(name: &str, min: f64, max: f64) -> GradingBand {
        GradingBand {
            grade_name: name.to_string(),
            min_percentage: min,
            max_percentage: max,
            description: None,
        }
    }

    #[test]
    fn round_off_matches_entry_rounding() {
        assert_eq!(round_off_1_decimal(0.0), 0.0);
        assert_eq!(round_off_1_decimal(3.54), 3.5);
        assert_eq!(round_off_1_decimal(3.55), 3.6);
        assert_eq!(round_off_1_decimal(81.6666), 81.7);
    }

    #[test]
    fn fallback_ladder_holds() {
        assert_eq!(resolve_grade(85.0, &[]), "A");
        assert_eq!(resolve_grade(75.0, &[]), "B");
        assert_eq!(resolve_grade(65.0, &[]), "C");
        assert_eq!(resolve_grade(45.0, &[]), "D");
        assert_eq!(resolve_grade(10.0, &[]), "E");
        assert_eq!(resolve_grade(80.0, &[]), "A");
    }

    #[test]
    fn configured_bands_win_and_miss_is_sentinel() {
        let bands = vec![band("Distinction", 75.0, 100.0), band("Pass", 50.0, 74.9)];
        assert_eq!(resolve_grade(80.0, &bands), "Distinction");
        assert_eq!(resolve_grade(60.0, &bands), "Pass");
        assert_eq!(resolve_grade(10.0, &bands), "E");
    }

    #[test]
    fn overlapping_bands_prefer_highest_min_bound() {
        // A catch-all listed first must not shadow the narrow top band.
        let bands = vec![band("Pass", 0.0, 100.0), band("Distinction", 80.0, 100.0)];
        assert_eq!(resolve_grade(92.0, &bands), "Distinction");
        assert_eq!(resolve_grade(40.0, &bands), "Pass");
    }

    #[test]
    fn achievement_level_boundaries_are_inclusive() {
        assert_eq!(resolve_achievement_level(3.0), "Outstanding");
        assert_eq!(resolve_achievement_level(2.5), "Outstanding");
        assert_eq!(resolve_achievement_level(2.0), "Moderate");
        assert_eq!(resolve_achievement_level(1.5), "Moderate");
        assert_eq!(resolve_achievement_level(1.0), "Basic");
    }

    #[test]
    fn comment_resolution_order() {
        let templates = vec![
            CommentTemplate {
                comment_type: CommentKind::ClassTeacher,
                min_average: 0.0,
                max_average: 49.0,
                comment_text: "Needs improvement".to_string(),
                is_active: true,
            },
            CommentTemplate {
                comment_type: CommentKind::ClassTeacher,
                min_average: 50.0,
                max_average: 100.0,
                comment_text: "Good job".to_string(),
                is_active: true,
            },
        ];
        assert_eq!(
            resolve_comment(CommentKind::ClassTeacher, 55.0, &templates, None),
            "Good job"
        );
        assert_eq!(
            resolve_comment(CommentKind::ClassTeacher, 55.0, &[], Some("  Great term ")),
            "Great term"
        );
        assert_eq!(
            resolve_comment(CommentKind::ClassTeacher, 55.0, &[], None),
            "Good work, keep it up!"
        );
        assert_eq!(
            resolve_comment(CommentKind::HeadTeacher, 55.0, &[], Some("   ")),
            "Excellent progress this term."
        );
    }

    #[test]
    fn inactive_and_wrong_kind_templates_are_skipped() {
        let templates = vec![
            CommentTemplate {
                comment_type: CommentKind::ClassTeacher,
                min_average: 0.0,
                max_average: 100.0,
                comment_text: "inactive".to_string(),
                is_active: false,
            },
            CommentTemplate {
                comment_type: CommentKind::HeadTeacher,
                min_average: 0.0,
                max_average: 100.0,
                comment_text: "head only".to_string(),
                is_active: true,
            },
        ];
        assert_eq!(
            resolve_comment(CommentKind::ClassTeacher, 70.0, &templates, None),
            "Good work, keep it up!"
        );
        assert_eq!(
            resolve_comment(CommentKind::HeadTeacher, 70.0, &templates, None),
            "head only"
        );
    }

    fn mark(hundred: f64, identifier: i64) -> SubjectMark {
        SubjectMark {
            subject_id: "s".to_string(),
            subject_code: "SUB".to_string(),
            subject_name: "Subject".to_string(),
            a1: None,
            a2: None,
            a3: None,
            average_score: hundred,
            twenty_percent: hundred * 0.2,
            eighty_percent: hundred * 0.8,
            hundred_percent: hundred,
            identifier,
            final_grade: "A".to_string(),
            achievement_level: "Outstanding".to_string(),
            teacher_initials: String::new(),
        }
    }

    #[test]
    fn aggregate_empty_marks_is_neutral() {
        let report = aggregate(&[], &[], &[], &ManualOverrides::default());
        assert_eq!(report.overall_average, 0.0);
        assert_eq!(report.overall_identifier, 2);
        assert_eq!(report.achievement_level, "Moderate");
        assert_eq!(report.overall_grade, "E");
    }

    #[test]
    fn aggregate_known_values_lock() {
        let marks = vec![mark(90.0, 3), mark(70.0, 2)];
        let report = aggregate(&marks, &[], &[], &ManualOverrides::default());
        assert_eq!(report.overall_average, 80.0);
        // Mean identifier 2.5 rounds half-up.
        assert_eq!(report.overall_identifier, 3);
        assert_eq!(report.overall_grade, "A");
        assert_eq!(report.achievement_level, "Outstanding");
    }

    #[test]
    fn aggregate_is_idempotent() {
        let marks = vec![mark(62.0, 2), mark(48.5, 1), mark(91.0, 3)];
        let overrides = ManualOverrides {
            class_teacher: Some("Keep pushing".to_string()),
            head_teacher: None,
        };
        let a = aggregate(&marks, &[], &[], &overrides);
        let b = aggregate(&marks, &[], &[], &overrides);
        assert_eq!(a, b);
    }

    #[test]
    fn parse_marks_coerces_stringified_numbers() {
        let raw = json!([{
            "subjectCode": "MATH",
            "a1": "80",
            "a2": 75,
            "a3": "90.5",
            "identifier": "3",
            "teacherInitials": "JK"
        }]);
        let marks = parse_subject_marks(Some(&raw), &[]).expect("parse marks");
        assert_eq!(marks.len(), 1);
        let m = &marks[0];
        assert_eq!(m.a1, Some(80.0));
        assert_eq!(m.a3, Some(90.5));
        assert_eq!(m.identifier, 3);
        assert_eq!(
            m.average_score,
            round_off_1_decimal((80.0 + 75.0 + 90.5) / 3.0)
        );
        assert!((m.hundred_percent - m.average_score).abs() < 1e-9);
        assert_eq!(m.final_grade, "A");
        assert_eq!(m.achievement_level, "Outstanding");
    }

    #[test]
    fn parse_marks_defaults_and_clamps() {
        let raw = json!([{ "subjectCode": "ENG", "identifier": 9 }]);
        let marks = parse_subject_marks(Some(&raw), &[]).expect("parse marks");
        let m = &marks[0];
        assert_eq!(m.identifier, 3);
        assert_eq!(m.average_score, 0.0);
        assert_eq!(m.hundred_percent, 0.0);
        assert_eq!(m.final_grade, "E");
        assert_eq!(m.teacher_initials, "");
    }

    #[test]
    fn parse_marks_rejects_non_array() {
        let raw = json!({ "subjectCode": "ENG" });
        let err = parse_subject_marks(Some(&raw), &[]).unwrap_err();
        assert_eq!(err.code, "bad_params");
    }

    #[test]
    fn parse_templates_rejects_unknown_kind() {
        let raw = json!([{ "commentType": "janitor", "commentText": "x" }]);
        let err = parse_comment_templates(Some(&raw)).unwrap_err();
        assert_eq!(err.code, "bad_params");
    }

    #[test]
    fn cached_row_labels_are_authoritative() {
        let raw = json!([{
            "subjectCode": "SCI",
            "hundredPercent": 30,
            "finalGrade": "B",
            "achievementLevel": "Moderate"
        }]);
        let marks = parse_subject_marks(Some(&raw), &[]).expect("parse marks");
        assert_eq!(marks[0].final_grade, "B");
        assert_eq!(marks[0].achievement_level, "Moderate");
    }
}
