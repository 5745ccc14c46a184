//! Named location presets used to populate source/destination choices.
//!
//! Presets are configuration only. Removing a preset never touches a bucket of
//! the same name on any item, and a bucket may exist without a preset.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult};

use crate::kind::Kind;
use crate::ledger;
use crate::settings::Settings;

/// Which list a preset belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetType {
    Source,
    Dest,
}

impl FromStr for PresetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "sources" => Ok(PresetType::Source),
            "dest" | "dests" | "destination" => Ok(PresetType::Dest),
            other => Err(DomainError::validation(format!("unknown preset type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindPresets {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub dests: Vec<String>,
}

impl KindPresets {
    fn list(&self, ty: PresetType) -> &Vec<String> {
        match ty {
            PresetType::Source => &self.sources,
            PresetType::Dest => &self.dests,
        }
    }

    fn list_mut(&mut self, ty: PresetType) -> &mut Vec<String> {
        match ty {
            PresetType::Source => &mut self.sources,
            PresetType::Dest => &mut self.dests,
        }
    }

    /// Collapse case-insensitive duplicates, keeping the first spelling.
    fn dedup(&mut self) {
        for list in [&mut self.sources, &mut self.dests] {
            let mut seen: Vec<String> = Vec::with_capacity(list.len());
            list.retain(|name| {
                let folded = name.to_lowercase();
                if seen.contains(&folded) {
                    false
                } else {
                    seen.push(folded);
                    true
                }
            });
        }
    }
}

fn contains_folded(list: &[String], name: &str) -> bool {
    let folded = name.to_lowercase();
    list.iter().any(|n| n.to_lowercase() == folded)
}

/// Presets document: one [`KindPresets`] per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRegistry {
    #[serde(default)]
    pub edible: KindPresets,
    #[serde(default)]
    pub inedible: KindPresets,
}

impl PresetRegistry {
    /// Registry holding only each kind's default source.
    pub fn with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::default();
        registry.reconcile(settings);
        registry
    }

    fn presets(&self, kind: Kind) -> &KindPresets {
        match kind {
            Kind::Edible => &self.edible,
            Kind::Inedible => &self.inedible,
        }
    }

    fn presets_mut(&mut self, kind: Kind) -> &mut KindPresets {
        match kind {
            Kind::Edible => &mut self.edible,
            Kind::Inedible => &mut self.inedible,
        }
    }

    pub fn list(&self, kind: Kind, ty: PresetType) -> &[String] {
        self.presets(kind).list(ty)
    }

    /// Add a preset. Returns `false` when an entry differing only in case
    /// already exists.
    pub fn add(&mut self, kind: Kind, ty: PresetType, name: &str) -> DomainResult<bool> {
        let name = ledger::validate_location(name)?;
        let list = self.presets_mut(kind).list_mut(ty);
        if contains_folded(list, name) {
            return Ok(false);
        }
        list.push(name.to_string());
        Ok(true)
    }

    /// Remove a preset (case-insensitive match). The configured default source
    /// cannot be removed from `sources`; that call reports `false`.
    pub fn remove(
        &mut self,
        kind: Kind,
        ty: PresetType,
        name: &str,
        default_source: &str,
    ) -> DomainResult<bool> {
        let name = ledger::validate_location(name)?;
        let folded = name.to_lowercase();
        if ty == PresetType::Source && folded == default_source.to_lowercase() {
            return Ok(false);
        }
        let list = self.presets_mut(kind).list_mut(ty);
        let before = list.len();
        list.retain(|n| n.to_lowercase() != folded);
        Ok(list.len() != before)
    }

    /// Make sure the default source of `kind` is listed.
    pub fn ensure_default_source(&mut self, kind: Kind, name: &str) {
        let sources = &mut self.presets_mut(kind).sources;
        if !contains_folded(sources, name) {
            sources.insert(0, name.to_string());
        }
    }

    /// Restore the registry invariants after loading or importing: dedup every
    /// list and list each kind's default source.
    pub fn reconcile(&mut self, settings: &Settings) {
        for kind in Kind::ALL {
            self.presets_mut(kind).dedup();
            self.ensure_default_source(kind, settings.default_bucket(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PresetRegistry {
        PresetRegistry::with_defaults(&Settings::default())
    }

    #[test]
    fn default_source_is_always_listed() {
        let reg = registry();
        assert_eq!(reg.list(Kind::Edible, PresetType::Source), ["On hand"]);
        assert!(reg.list(Kind::Inedible, PresetType::Dest).is_empty());
    }

    #[test]
    fn add_dedups_case_insensitively_per_kind() {
        let mut reg = registry();
        assert!(reg.add(Kind::Edible, PresetType::Dest, "Freezer").unwrap());
        assert!(!reg.add(Kind::Edible, PresetType::Dest, "FREEZER").unwrap());
        assert!(reg.add(Kind::Inedible, PresetType::Dest, "freezer").unwrap());
        assert_eq!(reg.list(Kind::Edible, PresetType::Dest), ["Freezer"]);
    }

    #[test]
    fn default_source_cannot_be_removed() {
        let mut reg = registry();
        assert!(!reg.remove(Kind::Edible, PresetType::Source, "on hand", "On hand").unwrap());
        assert_eq!(reg.list(Kind::Edible, PresetType::Source), ["On hand"]);
    }

    #[test]
    fn remove_matches_case_insensitively() {
        let mut reg = registry();
        reg.add(Kind::Edible, PresetType::Dest, "Truck").unwrap();
        assert!(reg.remove(Kind::Edible, PresetType::Dest, "truck", "On hand").unwrap());
        assert!(!reg.remove(Kind::Edible, PresetType::Dest, "truck", "On hand").unwrap());
    }

    #[test]
    fn reconcile_repairs_imported_lists() {
        let mut reg = PresetRegistry {
            edible: KindPresets {
                sources: vec!["Shelf".into(), "shelf".into()],
                dests: vec![],
            },
            inedible: KindPresets::default(),
        };
        reg.reconcile(&Settings::default());
        assert_eq!(reg.list(Kind::Edible, PresetType::Source), ["On hand", "Shelf"]);
        assert_eq!(reg.list(Kind::Inedible, PresetType::Source), ["On hand"]);
    }
}
