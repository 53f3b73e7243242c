use crate::errors::SensorError;
use crate::sensors::{EnergySource, Lifecycle};

const DEBUG_INITIAL_UJ: u64 = 7081760374;

/// Fake energy source, for running exporters on hosts without RAPL.
///
/// Each reading adds `step_uj` to the previous one.
#[derive(Debug)]
pub struct DebugSensor {
    step_uj: u64,
    counter_uj: Option<u64>,
    lifecycle: Lifecycle,
}

impl DebugSensor {
    pub fn new(step_uj: u64) -> DebugSensor {
        DebugSensor {
            step_uj,
            counter_uj: None,
            lifecycle: Lifecycle::Uninitialized,
        }
    }
}

impl EnergySource for DebugSensor {
    fn init(&mut self) -> Result<(), SensorError> {
        if !self.lifecycle.can_init() {
            return Err(SensorError::AlreadyInitialized);
        }
        self.counter_uj = Some(DEBUG_INITIAL_UJ);
        self.lifecycle = Lifecycle::Ready;
        Ok(())
    }

    fn read_total_energy_uj(&mut self) -> Result<u64, SensorError> {
        if self.lifecycle != Lifecycle::Ready {
            return Err(SensorError::NotInitialized);
        }
        let counter = self
            .counter_uj
            .map_or(DEBUG_INITIAL_UJ, |c| c.wrapping_add(self.step_uj));
        self.counter_uj = Some(counter);
        Ok(counter)
    }

    fn finish(&mut self) -> Result<(), SensorError> {
        if self.lifecycle != Lifecycle::Ready {
            return Err(SensorError::NotInitialized);
        }
        self.counter_uj = None;
        self.lifecycle = Lifecycle::Finished;
        Ok(())
    }

    fn get_source_label(&self) -> &'static str {
        "Debug"
    }

    fn get_recommended_interval_us(&self) -> u64 {
        1000
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}
