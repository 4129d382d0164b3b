#[path = "../src/calc.rs"]
mod calc;

use calc::{
    aggregate, resolve_achievement_level, resolve_comment, resolve_grade, CommentKind,
    ManualOverrides,
};
use serde_json::json;

#[test]
fn fallback_ladder_behavior_locks() {
    let expectations = [
        (100.0, "A"),
        (85.0, "A"),
        (80.0, "A"),
        (79.9, "B"),
        (75.0, "B"),
        (70.0, "B"),
        (65.0, "C"),
        (60.0, "C"),
        (59.9, "D"),
        (45.0, "D"),
        (40.0, "D"),
        (39.9, "E"),
        (10.0, "E"),
        (0.0, "E"),
    ];
    for (pct, grade) in expectations {
        assert_eq!(resolve_grade(pct, &[]), grade, "pct {}", pct);
    }
}

#[test]
fn grade_desirability_never_improves_as_percentage_drops() {
    let order = ["A", "B", "C", "D", "E"];
    let rank = |g: &str| order.iter().position(|o| *o == g).expect("known grade");
    let mut previous = rank(&resolve_grade(100.0, &[]));
    let mut pct = 100.0;
    while pct >= 0.0 {
        let r = rank(&resolve_grade(pct, &[]));
        assert!(r >= previous, "grade improved as percentage dropped at {}", pct);
        previous = r;
        pct -= 0.5;
    }
}

#[test]
fn achievement_level_locks() {
    assert_eq!(resolve_achievement_level(3.0), "Outstanding");
    assert_eq!(resolve_achievement_level(2.5), "Outstanding");
    assert_eq!(resolve_achievement_level(2.49), "Moderate");
    assert_eq!(resolve_achievement_level(1.5), "Moderate");
    assert_eq!(resolve_achievement_level(1.49), "Basic");
    assert_eq!(resolve_achievement_level(1.0), "Basic");
    assert_eq!(resolve_achievement_level(0.0), "Basic");
}

#[test]
fn aggregation_locks_from_parsed_rows() {
    let raw = json!([
        { "subjectCode": "MATH", "hundredPercent": 90, "identifier": 3 },
        { "subjectCode": "ENG", "hundredPercent": 70, "identifier": 2 }
    ]);
    let marks = calc::parse_subject_marks(Some(&raw), &[]).expect("parse marks");
    let report = aggregate(&marks, &[], &[], &ManualOverrides::default());
    assert_eq!(report.overall_average, 80.0);
    assert_eq!(report.overall_identifier, 3);
    assert_eq!(report.overall_grade, "A");
    assert_eq!(report.achievement_level, "Outstanding");
    assert_eq!(report.class_teacher_comment, "Good work, keep it up!");
    assert_eq!(report.headteacher_comment, "Excellent progress this term.");
}

#[test]
fn missing_composite_counts_as_zero_for_the_term() {
    let raw = json!([
        { "subjectCode": "MATH", "hundredPercent": 80, "identifier": 3 },
        { "subjectCode": "ENG" }
    ]);
    let marks = calc::parse_subject_marks(Some(&raw), &[]).expect("parse marks");
    let report = aggregate(&marks, &[], &[], &ManualOverrides::default());
    assert_eq!(report.overall_average, 40.0);
}

#[test]
fn comment_resolution_locks() {
    let raw = json!([
        { "commentType": "class_teacher", "minAverage": 0, "maxAverage": 49, "commentText": "Needs improvement" },
        { "commentType": "class_teacher", "minAverage": 50, "maxAverage": 100, "commentText": "Good job" }
    ]);
    let templates = calc::parse_comment_templates(Some(&raw)).expect("parse templates");
    assert_eq!(
        resolve_comment(CommentKind::ClassTeacher, 55.0, &templates, None),
        "Good job"
    );
    assert_eq!(
        resolve_comment(CommentKind::ClassTeacher, 55.0, &[], Some("Great term")),
        "Great term"
    );
    assert_eq!(
        resolve_comment(CommentKind::ClassTeacher, 55.0, &[], None),
        "Good work, keep it up!"
    );
}
