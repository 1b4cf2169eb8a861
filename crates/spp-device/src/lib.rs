//! SPI Periodic Sampler Device
//!
//! Control and data endpoint over the acquisition engine: raw control-code
//! decoding, record-oriented reads, readiness polling and teardown, plus
//! configuration loading and logging setup for the runner binary.

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub mod command;
mod device;
mod error;
mod record;
mod settings;

pub use command::{ControlCommand, PeriodSpec};
pub use device::{ReadFlags, Readiness, SppDevice};
pub use error::DeviceError;
pub use record::FrameRecord;
pub use settings::{DeviceConfig, ENV_PREFIX};

/// Initialize logging on stderr, leaving stdout for sample output
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
