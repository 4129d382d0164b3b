use crate::calc::{coerce_i64, coerce_string, CalcError};
use chrono::NaiveDate;
use serde_json::Value;
use std::path::PathBuf;

/// Read-only display records supplied by the data provider, already joined.
/// The core never mutates these and never fetches them itself.

#[derive(Debug, Clone)]
pub struct Student {
    pub full_name: String,
    pub gender: String,
    pub class_name: String,
    pub section: String,
    pub house: String,
    pub age: Option<i64>,
    pub photo_path: Option<PathBuf>,
    pub fees_balance: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Term {
    pub name: String,
    pub year: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct SchoolInfo {
    pub name: String,
    pub motto: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo_path: Option<PathBuf>,
}

pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn obj_of<'a>(
    raw: Option<&'a Value>,
    field: &str,
) -> Result<&'a serde_json::Map<String, Value>, CalcError> {
    raw.and_then(|v| v.as_object())
        .ok_or_else(|| CalcError::new("bad_params", format!("missing {}", field)))
}

pub fn parse_student(raw: Option<&Value>) -> Result<Student, CalcError> {
    let obj = obj_of(raw, "student")?;
    let Some(full_name) = coerce_string(obj.get("fullName")) else {
        return Err(CalcError::new("bad_params", "student requires fullName"));
    };
    Ok(Student {
        full_name,
        gender: coerce_string(obj.get("gender")).unwrap_or_default(),
        class_name: coerce_string(obj.get("className")).unwrap_or_default(),
        section: coerce_string(obj.get("section")).unwrap_or_default(),
        house: coerce_string(obj.get("house")).unwrap_or_default(),
        age: coerce_i64(obj.get("age")),
        photo_path: coerce_string(obj.get("photoPath")).map(PathBuf::from),
        fees_balance: coerce_string(obj.get("feesBalance")),
    })
}

pub fn parse_term(raw: Option<&Value>) -> Result<Term, CalcError> {
    let obj = obj_of(raw, "term")?;
    let Some(name) = coerce_string(obj.get("name")) else {
        return Err(CalcError::new("bad_params", "term requires name"));
    };
    let year = coerce_string(obj.get("year"))
        .or_else(|| coerce_i64(obj.get("year")).map(|y| y.to_string()))
        .unwrap_or_default();
    Ok(Term {
        name,
        year,
        start_date: coerce_string(obj.get("startDate")).and_then(|s| parse_iso_date(&s)),
        end_date: coerce_string(obj.get("endDate")).and_then(|s| parse_iso_date(&s)),
    })
}

pub fn parse_school(raw: Option<&Value>) -> Result<SchoolInfo, CalcError> {
    let obj = obj_of(raw, "school")?;
    let Some(name) = coerce_string(obj.get("name")) else {
        return Err(CalcError::new("bad_params", "school requires name"));
    };
    Ok(SchoolInfo {
        name,
        motto: coerce_string(obj.get("motto")),
        address: coerce_string(obj.get("address")),
        phone: coerce_string(obj.get("phone")),
        email: coerce_string(obj.get("email")),
        logo_path: coerce_string(obj.get("logoPath")).map(PathBuf::from),
    })
}

/// The "printed on" stamp is always an explicit input to the renderers; the
/// daemon only falls back to the local date when the caller omits it.
pub fn parse_printed_on(raw: Option<&Value>) -> NaiveDate {
    raw.and_then(|v| v.as_str())
        .and_then(parse_iso_date)
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}
