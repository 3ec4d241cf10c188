//! Controller state shown on the status pages.
//!
//! The growbox controller owns clock, thermometer, pins, log and storage; the
//! web interface only reads them through [`StatusSource`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Startup bookkeeping and logger state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootRecord {
    pub last_startup: String,
    pub first_startup: String,
    pub logger_enabled: bool,
    pub log_records: u16,
    pub log_capacity: u16,
    pub log_overflow: bool,
}

/// Day/night schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockStatus {
    pub is_day: bool,
    pub time: String,
    pub up_hour: u8,
    pub down_hour: u8,
}

impl Default for ClockStatus {
    fn default() -> Self {
        Self {
            is_day: true,
            time: String::new(),
            up_hour: 1,
            down_hour: 17,
        }
    }
}

/// Thermometer statistics and thresholds, in degrees Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureStats {
    /// Temperature the controller currently acts on.
    pub current: f32,
    /// Running average that becomes `current` at the next period.
    pub next: f32,
    /// Samples in `next`.
    pub count: u16,
    pub day: f32,
    pub night: f32,
    /// Allowed deviation by day; the night band is twice as wide.
    pub delta: f32,
    pub critical: f32,
}

impl Default for TemperatureStats {
    fn default() -> Self {
        Self {
            current: 0.0,
            next: 0.0,
            count: 0,
            day: 24.0,
            night: 18.0,
            delta: 3.0,
            critical: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    Output,
    #[default]
    Input,
}

/// One row of the pin table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinStatus {
    /// Board label, e.g. `02` or `A1`.
    pub label: String,
    pub mode: PinMode,
    /// Output latch for outputs, sampled level for inputs.
    pub high: bool,
    pub description: String,
}

/// One entry of the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRecord {
    pub timestamp: String,
    pub code: u8,
    pub description: String,
}

/// Read access to controller state.
pub trait StatusSource {
    fn free_memory(&self) -> usize;
    fn boot_record(&self) -> BootRecord;
    fn clock(&self) -> ClockStatus;
    fn temperature(&self) -> TemperatureStats;
    fn pins(&self) -> Vec<PinStatus>;
    /// Log records, oldest first.
    fn log_records(&self) -> Box<dyn Iterator<Item = LogRecord> + '_>;
    /// Raw content of the persistent storage.
    fn storage(&self) -> Bytes;
}

/// A fixed snapshot of controller state.
///
/// Used when the host side has no live controller to ask, e.g. when replaying
/// captures; loaded from the `status` section of the CLI config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticStatus {
    pub free_memory: usize,
    pub boot: BootRecord,
    pub clock: ClockStatus,
    pub temperature: TemperatureStats,
    pub pins: Vec<PinStatus>,
    pub log: Vec<LogRecord>,
    pub storage: Vec<u8>,
}

impl StatusSource for StaticStatus {
    fn free_memory(&self) -> usize {
        self.free_memory
    }

    fn boot_record(&self) -> BootRecord {
        self.boot.clone()
    }

    fn clock(&self) -> ClockStatus {
        self.clock.clone()
    }

    fn temperature(&self) -> TemperatureStats {
        self.temperature.clone()
    }

    fn pins(&self) -> Vec<PinStatus> {
        self.pins.clone()
    }

    fn log_records(&self) -> Box<dyn Iterator<Item = LogRecord> + '_> {
        Box::new(self.log.iter().cloned())
    }

    fn storage(&self) -> Bytes {
        Bytes::copy_from_slice(&self.storage)
    }
}

impl<S: StatusSource + ?Sized> StatusSource for &S {
    fn free_memory(&self) -> usize {
        (**self).free_memory()
    }

    fn boot_record(&self) -> BootRecord {
        (**self).boot_record()
    }

    fn clock(&self) -> ClockStatus {
        (**self).clock()
    }

    fn temperature(&self) -> TemperatureStats {
        (**self).temperature()
    }

    fn pins(&self) -> Vec<PinStatus> {
        (**self).pins()
    }

    fn log_records(&self) -> Box<dyn Iterator<Item = LogRecord> + '_> {
        (**self).log_records()
    }

    fn storage(&self) -> Bytes {
        (**self).storage()
    }
}
