use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{
    Customer, Filament, FilamentColour, FilamentType, Manufacturer, ModelDesign, PrintingProject,
};

/// A filament together with the reference rows it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilamentView {
    pub filament: Filament,
    pub manufacturer: Manufacturer,
    pub colour: FilamentColour,
    pub filament_type: FilamentType,
}

impl FilamentView {
    /// Sort key: manufacturer, then type, then colour.
    fn display_order(&self) -> (String, String, String) {
        (
            self.manufacturer.name.to_lowercase(),
            self.filament_type.description.to_lowercase(),
            self.colour.description.to_lowercase(),
        )
    }
}

impl fmt::Display for FilamentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.manufacturer, self.filament_type, self.colour)
    }
}

/// A printing project with its customer, design and filaments resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub project: PrintingProject,
    pub customer: Customer,
    pub model_design: ModelDesign,
    pub filaments: Vec<FilamentView>,
}

impl fmt::Display for ProjectView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filaments: Vec<&FilamentView> = self.filaments.iter().collect();
        filaments.sort_by_key(|view| view.display_order());
        let filaments: Vec<String> = filaments.iter().map(|view| view.to_string()).collect();
        write!(f, "{} for {} {}", self.model_design, self.customer, filaments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RowId;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn view(manufacturer: &str, kind: &str, colour: &str) -> FilamentView {
        FilamentView {
            filament: Filament {
                id: RowId::new(1),
                cost_per_weight: Decimal::new(1995, 2),
                product_id: None,
                reorder_link: None,
                manufacturer_id: RowId::new(1),
                filament_colour_id: RowId::new(1),
                filament_type_id: RowId::new(1),
            },
            manufacturer: Manufacturer { id: RowId::new(1), name: manufacturer.into() },
            colour: FilamentColour { id: RowId::new(1), description: colour.into() },
            filament_type: FilamentType { id: RowId::new(1), description: kind.into() },
        }
    }

    #[test]
    fn filament_display() {
        assert_eq!(view("Elegoo", "PLA", "White").to_string(), "Elegoo PLA (White)");
    }

    #[test]
    fn project_display_orders_filaments() {
        let project = ProjectView {
            project: PrintingProject {
                id: RowId::new(1),
                cost: Decimal::new(12, 0),
                submitted: NaiveDate::from_ymd_opt(2025, 10, 19)
                    .unwrap()
                    .and_hms_opt(8, 0, 0)
                    .unwrap(),
                completed: None,
                customer_id: RowId::new(1),
                model_design_id: RowId::new(1),
                filament_ids: vec![RowId::new(1), RowId::new(2)],
            },
            customer: Customer { id: RowId::new(1), name: "Ada".into() },
            model_design: ModelDesign {
                id: RowId::new(1),
                description: "Benchy".into(),
                length: Decimal::new(60, 0),
                summary: "Boat".into(),
                url: None,
            },
            filaments: vec![view("Sunlu", "PETG", "Red"), view("Elegoo", "PLA", "Black")],
        };
        assert_eq!(project.to_string(), "Benchy for Ada Elegoo PLA (Black)/Sunlu PETG (Red)");
    }
}
