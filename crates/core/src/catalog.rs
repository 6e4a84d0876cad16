//! Drug lookup.
//!
//! Recommendations reference drugs by id. The catalog turns the drug-type rows served by the
//! record API into an explicit id → name map, checked once when it is built.

use crate::constants::{INSULIN_DRUG_NAMES, STANDARD_DRUG_NAMES};
use crate::model::{DrugId, DrugType};
use crate::{GlucoError, GlucoResult};
use gluco_types::NonEmptyText;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrugCatalog {
    names: BTreeMap<DrugId, NonEmptyText>,
}

impl DrugCatalog {
    /// Builds a catalog from drug-type rows.
    ///
    /// # Errors
    ///
    /// Returns [`GlucoError::Catalog`] if two rows share an id or a row has a blank name.
    pub fn from_drug_types(rows: impl IntoIterator<Item = DrugType>) -> GlucoResult<Self> {
        let mut names = BTreeMap::new();
        for row in rows {
            let name = NonEmptyText::new(&row.drug_name)
                .map_err(|_| GlucoError::Catalog(format!("drug {} has a blank name", row.id)))?;
            if names.insert(row.id, name).is_some() {
                return Err(GlucoError::Catalog(format!("duplicate drug id {}", row.id)));
            }
        }
        tracing::debug!(drugs = names.len(), "drug catalog loaded");
        Ok(Self { names })
    }

    /// The formulary the form offers when no lookup table has been fetched.
    pub fn standard() -> Self {
        let names = STANDARD_DRUG_NAMES
            .iter()
            .zip(1..)
            .filter_map(|(name, id)| NonEmptyText::new(name).ok().map(|n| (id, n)))
            .collect();
        Self { names }
    }

    pub fn resolve(&self, id: DrugId) -> Option<&str> {
        self.names.get(&id).map(NonEmptyText::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<DrugId> {
        let name = name.trim();
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    /// Drug names in id order.
    pub fn options(&self) -> Vec<&str> {
        self.names.values().map(NonEmptyText::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether a drug name belongs in the insulin table.
pub fn is_insulin(name: &str) -> bool {
    INSULIN_DRUG_NAMES.contains(&name.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: DrugId, name: &str) -> DrugType {
        DrugType {
            id,
            drug_name: name.into(),
        }
    }

    #[test]
    fn resolves_ids_by_explicit_mapping_not_position() {
        let catalog =
            DrugCatalog::from_drug_types(vec![row(10, "Metformin"), row(3, "Lispro")]).unwrap();
        assert_eq!(catalog.resolve(3), Some("Lispro"));
        assert_eq!(catalog.resolve(10), Some("Metformin"));
        assert_eq!(catalog.resolve(1), None);
        assert_eq!(catalog.id_of(" Metformin "), Some(10));
        assert_eq!(catalog.options(), vec!["Lispro", "Metformin"]);
    }

    #[test]
    fn rejects_duplicate_ids_and_blank_names() {
        let dup = DrugCatalog::from_drug_types(vec![row(1, "Metformin"), row(1, "Ozempic")]);
        assert!(matches!(dup, Err(GlucoError::Catalog(msg)) if msg.contains("duplicate drug id 1")));

        let blank = DrugCatalog::from_drug_types(vec![row(2, "  ")]);
        assert!(matches!(blank, Err(GlucoError::Catalog(_))));
    }

    #[test]
    fn standard_formulary_matches_legacy_ids() {
        let catalog = DrugCatalog::standard();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.resolve(1), Some("Metformin"));
        assert_eq!(catalog.resolve(4), Some("Glargine"));
        assert_eq!(catalog.resolve(7), Some("Ozempic"));
    }

    #[test]
    fn only_glargine_and_lispro_are_insulin() {
        assert!(is_insulin("Glargine"));
        assert!(is_insulin("Lispro"));
        assert!(!is_insulin("Metformin"));
        assert!(!is_insulin("lispro"));
    }
}
