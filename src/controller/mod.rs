mod context;
pub mod error;
pub mod state_machine;
pub mod status;
pub mod validation;

pub use context::Context;
pub use error::{Error, Result};
