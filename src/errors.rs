use std::convert;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::{error::Error, fmt};

/// Why a single raw counter read did not produce a value.
#[derive(Debug)]
pub enum ReadFailure {
    /// The read call itself failed.
    IoError(io::Error),
    /// The read call returned no bytes.
    Empty,
    /// The counter file content is not an unsigned integer.
    Parse(String, ParseIntError),
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadFailure::IoError(e) => write!(f, "{e}"),
            ReadFailure::Empty => write!(f, "counter file returned no data"),
            ReadFailure::Parse(content, e) => write!(f, "can't parse '{content}': {e}"),
        }
    }
}

impl Error for ReadFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadFailure::IoError(e) => Some(e),
            ReadFailure::Parse(_, e) => Some(e),
            ReadFailure::Empty => None,
        }
    }
}

impl convert::From<io::Error> for ReadFailure {
    fn from(error: io::Error) -> Self {
        ReadFailure::IoError(error)
    }
}

/// Errors returned by energy sensors through their lifecycle.
#[derive(Debug)]
pub enum SensorError {
    /// Discovery found no zone under the powercap registry.
    NoZones { base_path: PathBuf },
    /// The live energy counter of a zone could not be opened.
    Acquisition {
        zone: u32,
        path: PathBuf,
        source: io::Error,
    },
    /// A raw counter read failed for one zone.
    Read { zone: u32, source: ReadFailure },
    /// read() or finish() called on a sensor that is not Ready.
    NotInitialized,
    /// init() called on a sensor that is already Ready.
    AlreadyInitialized,
    /// Some zone handles could not be closed. All of them were released anyway.
    Finish { failures: Vec<(u32, io::Error)> },
    /// No sensor is registered under that name.
    UnknownSensor(String),
}

impl Error for SensorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SensorError::Acquisition { source, .. } => Some(source),
            SensorError::Read { source, .. } => Some(source),
            SensorError::Finish { failures } => failures.first().map(|(_, e)| e as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorError::NoZones { base_path } => {
                write!(f, "No RAPL zones found in {} !", base_path.display())
            }
            SensorError::Acquisition { zone, path, source } => write!(
                f,
                "Couldn't open energy counter of zone {zone} ({}): {source}",
                path.display()
            ),
            SensorError::Read { zone, source } => {
                write!(f, "Couldn't read energy counter of zone {zone}: {source}")
            }
            SensorError::NotInitialized => write!(f, "Sensor is not initialized"),
            SensorError::AlreadyInitialized => write!(f, "Sensor is already initialized"),
            SensorError::Finish { failures } => {
                write!(f, "Couldn't close {} zone handle(s):", failures.len())?;
                for (zone, e) in failures {
                    write!(f, " [zone {zone}: {e}]")?;
                }
                Ok(())
            }
            SensorError::UnknownSensor(name) => write!(f, "Unknown sensor type {name}"),
        }
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
