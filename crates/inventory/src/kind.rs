use core::str::FromStr;

use serde::{Deserialize, Serialize};

use kennel_core::DomainError;

/// Top-level inventory partition.
///
/// Each kind carries its own settings, presets and activity history; an item
/// never changes kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Edible,
    Inedible,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Edible, Kind::Inedible];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Edible => "edible",
            Kind::Inedible => "inedible",
        }
    }
}

impl core::fmt::Display for Kind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edible" => Ok(Kind::Edible),
            "inedible" => Ok(Kind::Inedible),
            other => Err(DomainError::validation(format!("unknown kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Edible".parse::<Kind>().unwrap(), Kind::Edible);
        assert_eq!(" INEDIBLE ".parse::<Kind>().unwrap(), Kind::Inedible);
        assert!("treats".parse::<Kind>().is_err());
    }
}
