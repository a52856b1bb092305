use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Customer,
    Manufacturer,
    FilamentColour,
    FilamentType,
    Filament,
    ModelDesign,
    PrintingProject,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::Customer,
        Self::Manufacturer,
        Self::FilamentColour,
        Self::FilamentType,
        Self::Filament,
        Self::ModelDesign,
        Self::PrintingProject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Manufacturer => "manufacturer",
            Self::FilamentColour => "filament_colour",
            Self::FilamentType => "filament_type",
            Self::Filament => "filament",
            Self::ModelDesign => "model_design",
            Self::PrintingProject => "printing_project",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Manufacturer => "Manufacturer",
            Self::FilamentColour => "Filament Colour",
            Self::FilamentType => "Filament Type",
            Self::Filament => "Filament",
            Self::ModelDesign => "Model Design",
            Self::PrintingProject => "Printing Project",
        }
    }

    /// Kinds whose rows may hold a reference to a row of this kind.
    pub fn dependents(&self) -> &'static [EntityKind] {
        match self {
            Self::Manufacturer | Self::FilamentColour | Self::FilamentType => &[Self::Filament],
            Self::Customer | Self::ModelDesign | Self::Filament => &[Self::PrintingProject],
            Self::PrintingProject => &[],
        }
    }

    /// Lookup kinds are resolved by natural key; composites are built from them.
    pub fn is_lookup(&self) -> bool {
        !matches!(self, Self::Filament | Self::PrintingProject)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(EntityKind::parse("spool").is_err());
    }

    #[test]
    fn only_projects_have_no_dependents() {
        for kind in EntityKind::ALL {
            assert_eq!(
                kind.dependents().is_empty(),
                kind == EntityKind::PrintingProject,
                "{kind}"
            );
        }
    }
}
