//! Patient form validation.
//!
//! Validation never stops at the first problem: every violation is collected and the form shows
//! them together as one comma-separated message.

use crate::constants::{HBA1C_MAX_PERCENT, HBA1C_MIN_PERCENT};
use crate::form::{FormReading, PatientDraft};

/// Validates a patient draft and its pending readings.
///
/// Checks, in order:
/// - name and birth date are present,
/// - weight and height are not negative,
/// - HbA1c, when given, lies within the plausible percentage range,
/// - every entered reading value is a non-negative number.
///
/// # Returns
///
/// One message per violation; empty when the draft is valid.
pub fn validate_draft(draft: &PatientDraft, readings: &[FormReading]) -> Vec<String> {
    let mut errors = Vec::new();

    if draft.name.trim().is_empty() {
        errors.push("Name is required".to_owned());
    }
    if draft.birth_date.is_none() {
        errors.push("Birth date is required".to_owned());
    }
    if draft.weight.is_some_and(|w| !measurement_is_valid(w)) {
        errors.push("Invalid weight".to_owned());
    }
    if draft.height.is_some_and(|h| !measurement_is_valid(h)) {
        errors.push("Invalid height".to_owned());
    }
    if draft
        .hba1c
        .is_some_and(|v| !(HBA1C_MIN_PERCENT..=HBA1C_MAX_PERCENT).contains(&v))
    {
        errors.push(format!(
            "HbA1c must be between {HBA1C_MIN_PERCENT}-{HBA1C_MAX_PERCENT}%"
        ));
    }

    for reading in readings {
        let value = reading.value.trim();
        if value.is_empty() {
            continue;
        }
        if !value.parse::<f64>().is_ok_and(reading_value_is_valid) {
            errors.push(format!("Invalid {} reading", reading.slot.label()));
        }
    }

    errors
}

fn measurement_is_valid(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// A glucose value is acceptable when it is a finite, non-negative number of mg/dL.
pub fn reading_value_is_valid(value: f64) -> bool {
    measurement_is_valid(value)
}

/// Joins violations into the single message the form displays.
pub fn combined_message(errors: &[String]) -> String {
    errors.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeSlot;
    use chrono::NaiveDate;

    fn valid_draft() -> PatientDraft {
        PatientDraft {
            name: "Ada Lovelace".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            ..PatientDraft::default()
        }
    }

    #[test]
    fn empty_name_and_birth_date_accumulate_both_messages() {
        let errors = validate_draft(&PatientDraft::default(), &[]);
        assert_eq!(
            combined_message(&errors),
            "Name is required, Birth date is required"
        );
    }

    #[test]
    fn negative_weight_is_invalid() {
        let draft = PatientDraft {
            weight: Some(-5.0),
            ..valid_draft()
        };
        assert_eq!(validate_draft(&draft, &[]), vec!["Invalid weight"]);
    }

    #[test]
    fn negative_height_is_invalid() {
        let draft = PatientDraft {
            height: Some(-1.0),
            ..valid_draft()
        };
        assert_eq!(validate_draft(&draft, &[]), vec!["Invalid height"]);
    }

    #[test]
    fn non_finite_measurements_are_invalid() {
        let draft = PatientDraft {
            weight: Some(f64::NAN),
            height: Some(f64::INFINITY),
            ..valid_draft()
        };
        assert_eq!(
            validate_draft(&draft, &[]),
            vec!["Invalid weight", "Invalid height"]
        );
    }

    #[test]
    fn violations_keep_field_order() {
        let draft = PatientDraft {
            weight: Some(-5.0),
            height: Some(-1.0),
            hba1c: Some(25.0),
            ..PatientDraft::default()
        };
        let readings = vec![FormReading::new(TimeSlot::Breakfast, "x")];
        assert_eq!(
            combined_message(&validate_draft(&draft, &readings)),
            "Name is required, Birth date is required, Invalid weight, Invalid height, \
             HbA1c must be between 4-20%, Invalid Before Breakfast reading"
        );
    }

    #[test]
    fn hba1c_must_be_clinically_plausible() {
        let low = PatientDraft {
            hba1c: Some(3.9),
            ..valid_draft()
        };
        assert_eq!(validate_draft(&low, &[]), vec!["HbA1c must be between 4-20%"]);

        let high = PatientDraft {
            hba1c: Some(21.0),
            ..valid_draft()
        };
        assert_eq!(validate_draft(&high, &[]), vec!["HbA1c must be between 4-20%"]);

        let edge = PatientDraft {
            hba1c: Some(4.0),
            ..valid_draft()
        };
        assert!(validate_draft(&edge, &[]).is_empty());
    }

    #[test]
    fn reading_values_must_be_numbers() {
        let readings = vec![
            FormReading::new(TimeSlot::Lunch, "abc"),
            FormReading::new(TimeSlot::Dinner, ""),
            FormReading::new(TimeSlot::Bedtime, "-3"),
        ];
        assert_eq!(
            validate_draft(&valid_draft(), &readings),
            vec!["Invalid Before Lunch reading", "Invalid Before Bedtime reading"]
        );
    }
}
