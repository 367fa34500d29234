//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Device messages carry either GPS week + time-of-week or device-boot-relative seconds
//! - Published telemetry carries an absolute [`Timestamp`] resolved by the timebase crate

mod blueprint;
mod command;
mod error;
mod flash;
mod link;
mod record;
mod sink;
mod telemetry;

pub use blueprint::*;
pub use command::*;
pub use error::*;
pub use flash::*;
pub use link::{DeviceLink, ProtocolCodec, RecordIngest};
pub use record::*;
pub use sink::*;
pub use telemetry::*;
