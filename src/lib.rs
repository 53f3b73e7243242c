//! Total energy consumption sensors, reading cumulative energy counters
//! exposed by the platform.
#[macro_use]
extern crate log;
pub mod errors;
pub mod exporters;
pub mod sensors;

use errors::SensorError;
use sensors::{debug::DebugSensor, EnergySource};
use std::time::{Duration, SystemTime};

#[cfg(target_os = "linux")]
use sensors::powercap_rapl::PowercapRAPLSensor;

/// Energy added to the debug sensor counter on each reading, in microjoules.
pub const DEBUG_SENSOR_STEP_UJ: u64 = 1_000_000;

/// Returns the default sensor of the platform, not initialized yet.
#[cfg(target_os = "linux")]
pub fn get_default_sensor() -> Box<dyn EnergySource> {
    Box::new(PowercapRAPLSensor::new())
}

/// Returns the sensor registered under `name`, not initialized yet.
/// `None` falls back to [`get_default_sensor`].
pub fn get_sensor(name: Option<&str>) -> Result<Box<dyn EnergySource>, SensorError> {
    match name {
        #[cfg(target_os = "linux")]
        Some("powercap_rapl") | None => Ok(get_default_sensor()),
        Some("debug") => Ok(Box::new(DebugSensor::new(DEBUG_SENSOR_STEP_UJ))),
        Some(s) => Err(SensorError::UnknownSensor(String::from(s))),
        #[cfg(not(target_os = "linux"))]
        None => Err(SensorError::UnknownSensor(String::from("default"))),
    }
}

pub fn current_system_time_since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
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
