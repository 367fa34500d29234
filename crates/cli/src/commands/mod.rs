//! Command implementations.

mod calibrate;
mod info;
mod run;
mod validate;

pub use calibrate::run_calibrate;
pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;
