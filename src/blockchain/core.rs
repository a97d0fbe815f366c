// core.rs splits responsibilities into submodules for easier maintenance.
pub mod chain;
pub mod records;
pub mod validation;

pub use chain::*;
pub use records::*;
pub use validation::*;
