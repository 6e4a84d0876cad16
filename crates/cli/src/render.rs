//! Plain-text rendering of the patient views.

use gluco_core::{DetailState, DosageRow, PatientOption, TableKind};
use std::fmt::Write;

const DRUG_WIDTH: usize = 18;
const CELL_WIDTH: usize = 12;

pub fn patient_list(options: &[PatientOption]) -> String {
    if options.is_empty() {
        return "No patients found.\n".to_owned();
    }
    let mut out = String::new();
    for option in options {
        let _ = writeln!(out, "ID: {}, Name: {}", option.value, option.label);
    }
    out
}

pub fn dosage_table(kind: TableKind, rows: &[DosageRow]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        let _ = writeln!(out, "{}", kind.empty_message());
        return out;
    }

    let _ = write!(out, "{:<DRUG_WIDTH$}", kind.heading());
    for slot in kind.columns() {
        let _ = write!(out, "{:<CELL_WIDTH$}", slot.title());
    }
    out.push('\n');
    for row in rows {
        let _ = write!(out, "{:<DRUG_WIDTH$}", row.drug);
        for &slot in kind.columns() {
            let _ = write!(out, "{:<CELL_WIDTH$}", row.slots.get(slot));
        }
        out.push('\n');
    }
    out
}

pub fn patient_detail(state: &DetailState) -> String {
    let mut out = String::new();
    if let Some(summary) = &state.summary {
        for item in &summary.items {
            let _ = writeln!(out, "{:<12}{}", format!("{}:", item.label), item.value);
        }
        out.push('\n');
    }

    for card in &state.vitals {
        let _ = writeln!(
            out,
            "{}: {} {} ({})",
            card.label, card.value, card.unit, card.caption
        );
    }

    out.push_str("\nMedications\n");
    out.push_str(&dosage_table(TableKind::Medication, &state.medications));
    out.push_str("\nInsulin\n");
    out.push_str(&dosage_table(TableKind::Insulin, &state.insulin));
    out
}
