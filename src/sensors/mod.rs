pub mod debug;
#[cfg(target_os = "linux")]
pub mod powercap_rapl;
pub mod units;
use crate::errors::SensorError;
use std::fmt;

// !!!!!!!!!!!!!!!!! Lifecycle !!!!!!!!!!!!!!!!!!!!!!!
/// Where a sensor stands between init() and finish().
///
/// Initializing only exists while init() runs: a failing init()
/// always falls back to Uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
    Finished,
}

impl Lifecycle {
    /// init() is accepted from those states. A finished sensor may be initialized again.
    pub fn can_init(&self) -> bool {
        matches!(self, Lifecycle::Uninitialized | Lifecycle::Finished)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "uninitialized"),
            Lifecycle::Initializing => write!(f, "initializing"),
            Lifecycle::Ready => write!(f, "ready"),
            Lifecycle::Finished => write!(f, "finished"),
        }
    }
}

// !!!!!!!!!!!!!!!!! EnergySource !!!!!!!!!!!!!!!!!!!!!!!
/// EnergySource trait, the Sensor API.
///
/// A host calls `init`, then `read_total_energy_uj` any number of times,
/// then `finish`. The value returned by a read is the cumulative energy
/// of all the zones of the sensor, in microjoules. Callers derive energy
/// consumption by subtracting two successive readings.
pub trait EnergySource {
    /// Discovers and opens everything the sensor needs. Either every
    /// resource is acquired, or none is and the sensor stays uninitialized.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Total energy consumed, in microjoules.
    fn read_total_energy_uj(&mut self) -> Result<u64, SensorError>;

    /// Releases every resource acquired by `init`.
    fn finish(&mut self) -> Result<(), SensorError>;

    /// Human readable name of the energy source.
    fn get_source_label(&self) -> &'static str;

    /// Recommended sampling interval, in microseconds.
    fn get_recommended_interval_us(&self) -> u64;

    fn lifecycle(&self) -> Lifecycle;

    /// Legacy reading mode: any failure is reported as a 0 reading.
    fn read_total_energy_uj_or_zero(&mut self) -> u64 {
        match self.read_total_energy_uj() {
            Ok(total) => total,
            Err(e) => {
                debug!("{} reading failed, reporting 0: {e}", self.get_source_label());
                0
            }
        }
    }
}

impl<S: EnergySource + ?Sized> EnergySource for Box<S> {
    fn init(&mut self) -> Result<(), SensorError> {
        (**self).init()
    }

    fn read_total_energy_uj(&mut self) -> Result<u64, SensorError> {
        (**self).read_total_energy_uj()
    }

    fn finish(&mut self) -> Result<(), SensorError> {
        (**self).finish()
    }

    fn get_source_label(&self) -> &'static str {
        (**self).get_source_label()
    }

    fn get_recommended_interval_us(&self) -> u64 {
        (**self).get_recommended_interval_us()
    }

    fn lifecycle(&self) -> Lifecycle {
        (**self).lifecycle()
    }
}
