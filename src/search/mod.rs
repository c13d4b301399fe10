pub mod coordinator;
pub mod rate_shaper;
pub mod validate;

pub use coordinator::{SearchCoordinator, SearchOutcome};
pub use rate_shaper::RateShaper;
pub use validate::{validate, ValidatedSearch};
