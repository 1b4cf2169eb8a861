//! Control Commands
//!
//! Raw control codes follow the Linux `_IO`/`_IOW` layout:
//! direction in bits 30-31, argument size in bits 16-29, magic in bits 8-15
//! and the command number in bits 0-7.

use crate::DeviceError;
use acquisition::period_from_parts;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Magic byte shared by all sampler control codes
pub const SPP_MAGIC: u8 = b'\\';

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;

const fn ioc(dir: u32, magic: u8, nr: u8, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | ((magic as u32) << 8) | nr as u32
}

/// Arm the sampling timer
pub const SPPIOC_START: u32 = ioc(IOC_NONE, SPP_MAGIC, 1, 0);

/// Disarm the sampling timer
pub const SPPIOC_STOP: u32 = ioc(IOC_NONE, SPP_MAGIC, 2, 0);

/// Set the sampling period from a [`PeriodSpec`]
pub const SPPIOC_SPARAMS: u32 = ioc(IOC_WRITE, SPP_MAGIC, 3, PeriodSpec::WIRE_SIZE);

/// Sampling period as seconds plus nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpec {
    pub secs: i64,
    pub nsecs: u64,
}

impl PeriodSpec {
    /// Size of the argument: `i64` secs then `u64` nsecs, native byte order
    pub const WIRE_SIZE: usize = 16;

    /// Parse the control argument
    pub fn from_bytes(arg: &[u8]) -> Result<Self, DeviceError> {
        if arg.len() != Self::WIRE_SIZE {
            return Err(DeviceError::InvalidArgument(format!(
                "period argument is {} bytes, expected {}",
                arg.len(),
                Self::WIRE_SIZE
            )));
        }
        let mut secs = [0u8; 8];
        let mut nsecs = [0u8; 8];
        secs.copy_from_slice(&arg[..8]);
        nsecs.copy_from_slice(&arg[8..]);
        Ok(Self {
            secs: i64::from_ne_bytes(secs),
            nsecs: u64::from_ne_bytes(nsecs),
        })
    }

    /// Encode as a control argument
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut raw = [0u8; Self::WIRE_SIZE];
        raw[..8].copy_from_slice(&self.secs.to_ne_bytes());
        raw[8..].copy_from_slice(&self.nsecs.to_ne_bytes());
        raw
    }

    /// Normalized period; zero or negative totals are rejected
    pub fn period(&self) -> Result<Duration, DeviceError> {
        Ok(period_from_parts(self.secs, self.nsecs)?)
    }
}

/// A decoded control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    SetPeriod(PeriodSpec),
}

impl ControlCommand {
    /// Decode a raw control code and its argument bytes
    pub fn decode(code: u32, arg: &[u8]) -> Result<Self, DeviceError> {
        match code {
            SPPIOC_START => Ok(ControlCommand::Start),
            SPPIOC_STOP => Ok(ControlCommand::Stop),
            SPPIOC_SPARAMS => Ok(ControlCommand::SetPeriod(PeriodSpec::from_bytes(arg)?)),
            other => Err(DeviceError::InvalidArgument(format!(
                "unknown control code {:#010x}",
                other
            ))),
        }
    }

    /// Raw control code for this command
    pub fn code(&self) -> u32 {
        match self {
            ControlCommand::Start => SPPIOC_START,
            ControlCommand::Stop => SPPIOC_STOP,
            ControlCommand::SetPeriod(_) => SPPIOC_SPARAMS,
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlCommand::Start => write!(f, "START"),
            ControlCommand::Stop => write!(f, "STOP"),
            ControlCommand::SetPeriod(spec) => {
                write!(f, "SET_PERIOD({}s {}ns)", spec.secs, spec.nsecs)
            }
        }
    }
}
