//! Per-kind ledger defaults.

use serde::{Deserialize, Serialize};

use kennel_core::{DomainError, DomainResult};

use crate::item::validate_threshold;
use crate::kind::Kind;
use crate::ledger;

/// Bucket every new item starts with unless settings say otherwise.
pub const DEFAULT_SOURCE_BUCKET: &str = "On hand";

/// Defaults applied to items of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSettings {
    /// Threshold for items without their own `minOnHand`. 0 disables alerts.
    pub default_min_on_hand: f64,
    pub enable_low_alerts: bool,
    /// Bucket treated as "on hand" and seeded on create.
    pub default_source_bucket_name: String,
}

impl Default for KindSettings {
    fn default() -> Self {
        Self {
            default_min_on_hand: 0.0,
            enable_low_alerts: true,
            default_source_bucket_name: DEFAULT_SOURCE_BUCKET.to_string(),
        }
    }
}

/// Partial update for [`KindSettings`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub default_min_on_hand: Option<f64>,
    pub enable_low_alerts: Option<bool>,
    pub default_source_bucket_name: Option<String>,
}

impl KindSettings {
    pub fn validate(&self) -> DomainResult<()> {
        validate_threshold(self.default_min_on_hand)?;
        ledger::validate_location(&self.default_source_bucket_name)?;
        Ok(())
    }

    /// Apply `patch`; nothing changes unless every field is valid.
    pub fn apply(&mut self, patch: SettingsPatch) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(min) = patch.default_min_on_hand {
            next.default_min_on_hand = min;
        }
        if let Some(enabled) = patch.enable_low_alerts {
            next.enable_low_alerts = enabled;
        }
        if let Some(name) = patch.default_source_bucket_name {
            next.default_source_bucket_name = ledger::validate_location(&name)?.to_string();
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Settings document: one [`KindSettings`] per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub edible: KindSettings,
    #[serde(default)]
    pub inedible: KindSettings,
}

impl Settings {
    pub fn for_kind(&self, kind: Kind) -> &KindSettings {
        match kind {
            Kind::Edible => &self.edible,
            Kind::Inedible => &self.inedible,
        }
    }

    pub fn for_kind_mut(&mut self, kind: Kind) -> &mut KindSettings {
        match kind {
            Kind::Edible => &mut self.edible,
            Kind::Inedible => &mut self.inedible,
        }
    }

    pub fn default_bucket(&self, kind: Kind) -> &str {
        &self.for_kind(kind).default_source_bucket_name
    }

    pub fn validate(&self) -> DomainResult<()> {
        for kind in Kind::ALL {
            self.for_kind(kind)
                .validate()
                .map_err(|e| DomainError::validation(format!("{kind} settings: {e}")))?;
        }
        Ok(())
    }
}
