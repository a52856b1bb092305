pub mod failing;
pub mod journal;

pub use failing::FailingStorage;
pub use journal::*;
