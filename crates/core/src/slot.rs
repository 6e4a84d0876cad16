//! Time-of-day slots.
//!
//! Every glucose reading and every dosage belongs to exactly one of four windows. The order of
//! [`TimeSlot::ALL`] is the display order of every table column.

use crate::{GlucoError, GlucoResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Breakfast,
    Lunch,
    Dinner,
    Bedtime,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Breakfast,
        TimeSlot::Lunch,
        TimeSlot::Dinner,
        TimeSlot::Bedtime,
    ];

    /// Meal slots only; general medications are not dosed at bedtime.
    pub const MEALS: [TimeSlot; 3] = [TimeSlot::Breakfast, TimeSlot::Lunch, TimeSlot::Dinner];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Breakfast => "breakfast",
            TimeSlot::Lunch => "lunch",
            TimeSlot::Dinner => "dinner",
            TimeSlot::Bedtime => "bedtime",
        }
    }

    /// Column heading, e.g. `"Breakfast"`.
    pub fn title(self) -> &'static str {
        match self {
            TimeSlot::Breakfast => "Breakfast",
            TimeSlot::Lunch => "Lunch",
            TimeSlot::Dinner => "Dinner",
            TimeSlot::Bedtime => "Bedtime",
        }
    }

    /// Vital card label, e.g. `"Before Breakfast"`.
    pub fn label(self) -> String {
        format!("Before {}", self.title())
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = GlucoError;

    fn from_str(s: &str) -> GlucoResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(TimeSlot::Breakfast),
            "lunch" => Ok(TimeSlot::Lunch),
            "dinner" => Ok(TimeSlot::Dinner),
            "bedtime" => Ok(TimeSlot::Bedtime),
            other => Err(GlucoError::InvalidInput(format!(
                "unknown time of day '{other}' (expected breakfast, lunch, dinner or bedtime)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_four_slots_case_insensitively() {
        assert_eq!("Breakfast".parse::<TimeSlot>().unwrap(), TimeSlot::Breakfast);
        assert_eq!(" bedtime ".parse::<TimeSlot>().unwrap(), TimeSlot::Bedtime);
        assert!("brunch".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn serialises_as_lowercase_wire_value() {
        assert_eq!(serde_json::to_string(&TimeSlot::Dinner).unwrap(), "\"dinner\"");
        assert!(serde_json::from_str::<TimeSlot>("\"supper\"").is_err());
        assert_eq!(TimeSlot::Lunch.label(), "Before Lunch");
    }
}
