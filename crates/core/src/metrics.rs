//! Derived patient metrics computed at render time.

use crate::constants::{PLACEHOLDER, READING_NORMAL_MAX_MG_DL};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Body mass index from height in centimetres and weight in kilograms, to one decimal.
///
/// Returns `None` unless both values are present and positive.
pub fn bmi(height_cm: Option<f64>, weight_kg: Option<f64>) -> Option<f64> {
    let (height, weight) = (height_cm?, weight_kg?);
    if height <= 0.0 || weight <= 0.0 || !height.is_finite() || !weight.is_finite() {
        return None;
    }
    let meters = height / 100.0;
    Some((weight / (meters * meters) * 10.0).round() / 10.0)
}

pub fn format_bmi(bmi: Option<f64>) -> String {
    bmi.map(|b| format!("{b:.1}"))
        .unwrap_or_else(|| PLACEHOLDER.to_owned())
}

/// Completed years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    if today < birth {
        return 0;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

pub fn age(birth: NaiveDate) -> u32 {
    age_on(birth, Local::now().date_naive())
}

pub fn format_birth_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_owned())
}

pub fn format_creatinine(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2} mg/dL"),
        _ => PLACEHOLDER.to_owned(),
    }
}

pub fn format_flag(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Normal,
    Abnormal,
}

impl ReadingStatus {
    pub fn caption(self) -> &'static str {
        match self {
            ReadingStatus::Normal => "in the norm",
            ReadingStatus::Abnormal => "Above the norm",
        }
    }
}

/// Classifies a pre-meal glucose value. A missing value counts as normal.
pub fn reading_status(mg_dl: Option<f64>) -> ReadingStatus {
    match mg_dl {
        Some(v) if v > READING_NORMAL_MAX_MG_DL => ReadingStatus::Abnormal,
        _ => ReadingStatus::Normal,
    }
}
