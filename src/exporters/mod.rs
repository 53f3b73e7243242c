#[cfg(feature = "json")]
pub mod json;
pub mod stdout;
pub mod utils;
use crate::current_system_time_since_epoch;
use crate::sensors::EnergySource;
use std::time::Duration;

/// An Exporter is what tells raplmon when to sample the sensor and how to
/// export or expose the readings.
/// It owns the sensor for the whole run: it initializes it, decides at what
/// pace readings are taken, and finishes the sensor when the run ends.
pub trait Exporter {
    fn run(&mut self);
    fn kind(&self) -> &str;
}

/// One reading of a sensor, with the energy consumed since the previous reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: Duration,
    pub total_energy_uj: u64,
    /// None on the first reading, or when the total went backwards (a counter wrapped).
    pub delta_uj: Option<u64>,
}

/// Drives an EnergySource and keeps the last reading to compute deltas.
pub struct EnergyMeter {
    sensor: Box<dyn EnergySource>,
    last_total_uj: Option<u64>,
}

impl EnergyMeter {
    pub fn new(sensor: Box<dyn EnergySource>) -> EnergyMeter {
        EnergyMeter {
            sensor,
            last_total_uj: None,
        }
    }

    pub fn source_label(&self) -> &'static str {
        self.sensor.get_source_label()
    }

    pub fn start(&mut self) -> bool {
        match self.sensor.init() {
            Ok(()) => true,
            Err(e) => {
                error!("Couldn't initialize {} sensor: {e}", self.source_label());
                false
            }
        }
    }

    /// Takes one reading. A failed reading is logged and skipped: it does not
    /// reset the previous total.
    pub fn sample(&mut self) -> Option<Sample> {
        let total = match self.sensor.read_total_energy_uj() {
            Ok(total) => total,
            Err(e) => {
                warn!("Skipping sample: {e}");
                return None;
            }
        };
        let delta_uj = match self.last_total_uj {
            Some(last) => {
                let delta = total.checked_sub(last);
                if delta.is_none() {
                    warn!("Energy counter went from {last} to {total} uJ, a counter wrapped");
                }
                delta
            }
            None => None,
        };
        self.last_total_uj = Some(total);
        Some(Sample {
            timestamp: current_system_time_since_epoch(),
            total_energy_uj: total,
            delta_uj,
        })
    }

    pub fn stop(&mut self) {
        self.last_total_uj = None;
        if let Err(e) = self.sensor.finish() {
            error!("Couldn't finish {} sensor: {e}", self.source_label());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::debug::DebugSensor;

    #[test]
    fn meter_reports_delta_from_second_sample() {
        let mut meter = EnergyMeter::new(Box::new(DebugSensor::new(25)));
        assert!(meter.sample().is_none());
        assert!(meter.start());
        let first = meter.sample().unwrap();
        assert_eq!(first.delta_uj, None);
        let second = meter.sample().unwrap();
        assert_eq!(second.delta_uj, Some(25));
        assert_eq!(second.total_energy_uj, first.total_energy_uj + 25);
        meter.stop();
        assert!(meter.sample().is_none());
    }
}

//  Copyright 2020 The raplmon authors.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
