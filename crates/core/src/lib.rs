pub mod candidates;
pub mod entities;
pub mod error;
pub mod ids;
pub mod kind;
pub mod validation;
pub mod views;

pub use candidates::*;
pub use entities::*;
pub use error::CoreError;
pub use ids::{RowId, UnitOfWorkId};
pub use kind::EntityKind;
pub use validation::{FieldProblem, Validation, ValidationFailure};
pub use views::{FilamentView, ProjectView};
