//! Total energy sensor backed by the Linux powercap interface to Intel RAPL.
//!
//! Only top level zones (`intel-rapl:<N>`) are accounted. Subzones
//! (`intel-rapl:<N>:<M>`) measure a part of their parent zone and are ignored.
use crate::errors::{ReadFailure, SensorError};
use crate::sensors::{EnergySource, Lifecycle};
use regex::Regex;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::mem;
use std::os::unix::fs::FileExt;
use std::os::unix::io::IntoRawFd;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_PATH: &str = "/sys/class/powercap";
pub const ENERGY_FILE: &str = "energy_uj";
pub const MAX_ENERGY_FILE: &str = "max_energy_range_uj";
pub const SOURCE_LABEL: &str = "Intel RAPL";
pub const RECOMMENDED_INTERVAL_US: u64 = 1000;

/// Counter files hold at most 20 digits and a newline.
const COUNTER_READ_BUFFER_SIZE: usize = 30;

/// Counts the top level zones found in `base_path`.
///
/// Zones are numbered from 0 and the count stops at the first missing index.
/// A missing or unreadable registry means no zone at all.
pub fn count_zones(base_path: &Path) -> u32 {
    let re_zone = Regex::new(r"^intel-rapl:(0|[1-9]\d*)$").expect("zone pattern should be valid");
    let entries = match fs::read_dir(base_path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Can't scan {}: {e}", base_path.display());
            return 0;
        }
    };
    let mut found = HashSet::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        if let Some(caps) = file_name.to_str().and_then(|name| re_zone.captures(name)) {
            if let Ok(index) = caps[1].parse::<u32>() {
                found.insert(index);
            }
        }
    }
    let mut count = 0;
    while found.contains(&count) {
        count += 1;
    }
    if found.len() as u32 > count {
        debug!(
            "Ignoring {} zone(s) after missing intel-rapl:{count}",
            found.len() as u32 - count
        );
    }
    count
}

pub fn zone_path(base_path: &Path, index: u32) -> PathBuf {
    base_path.join(format!("intel-rapl:{index}"))
}

/// Parses a counter file the way `strtoull(s, NULL, 0)` reads it:
/// decimal, `0x` prefixed hexadecimal or `0` prefixed octal.
pub fn parse_counter(raw: &str) -> Result<u64, std::num::ParseIntError> {
    let text = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let text = text.strip_prefix('+').unwrap_or(text);
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8)
    } else {
        text.parse()
    }
}

/// Reads the counter from offset 0 without moving the file cursor.
/// sysfs regenerates the content on each read, so the handle is never reopened.
fn read_counter(file: &File) -> Result<u64, ReadFailure> {
    let mut buf = [0u8; COUNTER_READ_BUFFER_SIZE];
    let n = file.read_at(&mut buf, 0)?;
    if n == 0 {
        return Err(ReadFailure::Empty);
    }
    let content = String::from_utf8_lossy(&buf[..n]);
    parse_counter(&content).map_err(|e| ReadFailure::Parse(content.trim().to_string(), e))
}

/// Best effort: 0 means the capacity is unknown.
fn read_max_energy(path: &Path) -> u64 {
    let result = File::open(path)
        .map_err(ReadFailure::from)
        .and_then(|file| read_counter(&file));
    match result {
        Ok(max) => max,
        Err(e) => {
            warn!("Couldn't read {}: {e}. Capacity set to 0.", path.display());
            0
        }
    }
}

// !!!!!!!!!!!!!!!!! Zone !!!!!!!!!!!!!!!!!!!!!!!
/// An acquired top level zone: its open energy counter and its capacity.
#[derive(Debug)]
pub struct Zone {
    index: u32,
    /// Maximum counter value before wraparound, in microjoules. 0 if unknown.
    max_energy_range_uj: u64,
    file: File,
}

impl Zone {
    /// Opens the energy counter of zone `index` under `base_path`.
    pub fn acquire(base_path: &Path, index: u32) -> Result<Zone, SensorError> {
        let path = zone_path(base_path, index);
        let max_energy_range_uj = read_max_energy(&path.join(MAX_ENERGY_FILE));
        let energy_path = path.join(ENERGY_FILE);
        let file = File::open(&energy_path).map_err(|source| {
            error!("Couldn't open {}: {source}", energy_path.display());
            SensorError::Acquisition {
                zone: index,
                path: energy_path.clone(),
                source,
            }
        })?;
        Ok(Zone {
            index,
            max_energy_range_uj,
            file,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn max_energy_range_uj(&self) -> u64 {
        self.max_energy_range_uj
    }

    /// Current raw value of the counter, in microjoules. Wraparound is not corrected.
    pub fn read_raw(&self) -> Result<u64, SensorError> {
        read_counter(&self.file).map_err(|source| SensorError::Read {
            zone: self.index,
            source,
        })
    }

    /// Closes the counter and reports what close(2) returned.
    pub fn close(self) -> io::Result<()> {
        let fd = self.file.into_raw_fd();
        // SAFETY: fd was just released by its File, nothing else owns it.
        if unsafe { libc::close(fd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Sums one reading per zone, in zone order.
/// One failing zone fails the whole reading: a partial sum is never returned.
pub fn total_energy(zones: &[Zone]) -> Result<u64, SensorError> {
    zones
        .iter()
        .try_fold(0u64, |total, zone| Ok(total.wrapping_add(zone.read_raw()?)))
}

/// Closes every zone, even after a failure, and returns the failures.
fn release(zones: Vec<Zone>) -> Vec<(u32, io::Error)> {
    let mut failures = vec![];
    for zone in zones {
        let index = zone.index;
        if let Err(e) = zone.close() {
            warn!("Couldn't close energy counter of zone {index}: {e}");
            failures.push((index, e));
        }
    }
    failures
}

// !!!!!!!!!!!!!!!!! PowercapRAPLSensor !!!!!!!!!!!!!!!!!!!!!!!
#[derive(Debug)]
enum State {
    Uninitialized,
    Initializing,
    Ready(Vec<Zone>),
    Finished,
}

/// Energy source summing the counters of every top level RAPL zone.
#[derive(Debug)]
pub struct PowercapRAPLSensor {
    base_path: PathBuf,
    state: State,
}

impl Default for PowercapRAPLSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl PowercapRAPLSensor {
    pub fn new() -> PowercapRAPLSensor {
        PowercapRAPLSensor::with_base_path(DEFAULT_BASE_PATH)
    }

    /// Reads zones from another powercap root than `/sys/class/powercap`.
    pub fn with_base_path<P: Into<PathBuf>>(base_path: P) -> PowercapRAPLSensor {
        PowercapRAPLSensor {
            base_path: base_path.into(),
            state: State::Uninitialized,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Zones acquired by init(), None unless the sensor is ready.
    pub fn zones(&self) -> Option<&[Zone]> {
        match &self.state {
            State::Ready(zones) => Some(zones),
            _ => None,
        }
    }

    fn acquire_all(&self) -> Result<Vec<Zone>, SensorError> {
        let count = count_zones(&self.base_path);
        if count == 0 {
            error!("No RAPL zones found in {} !", self.base_path.display());
            return Err(SensorError::NoZones {
                base_path: self.base_path.clone(),
            });
        }
        let mut zones = Vec::with_capacity(count as usize);
        for index in 0..count {
            match Zone::acquire(&self.base_path, index) {
                Ok(zone) => zones.push(zone),
                Err(e) => {
                    debug!("Rolling back {} acquired zone(s)", zones.len());
                    release(zones);
                    return Err(e);
                }
            }
        }
        Ok(zones)
    }
}

impl EnergySource for PowercapRAPLSensor {
    fn init(&mut self) -> Result<(), SensorError> {
        if !self.lifecycle().can_init() {
            debug!("init() refused, sensor is {}", self.lifecycle());
            return Err(SensorError::AlreadyInitialized);
        }
        self.state = State::Initializing;
        match self.acquire_all() {
            Ok(zones) => {
                info!(
                    "{} zone(s) opened in {}",
                    zones.len(),
                    self.base_path.display()
                );
                self.state = State::Ready(zones);
                Ok(())
            }
            Err(e) => {
                self.state = State::Uninitialized;
                Err(e)
            }
        }
    }

    fn read_total_energy_uj(&mut self) -> Result<u64, SensorError> {
        match &self.state {
            State::Ready(zones) => total_energy(zones),
            _ => Err(SensorError::NotInitialized),
        }
    }

    fn finish(&mut self) -> Result<(), SensorError> {
        match mem::replace(&mut self.state, State::Finished) {
            State::Ready(zones) => {
                let failures = release(zones);
                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(SensorError::Finish { failures })
                }
            }
            previous => {
                self.state = previous;
                Err(SensorError::NotInitialized)
            }
        }
    }

    fn get_source_label(&self) -> &'static str {
        SOURCE_LABEL
    }

    fn get_recommended_interval_us(&self) -> u64 {
        RECOMMENDED_INTERVAL_US
    }

    fn lifecycle(&self) -> Lifecycle {
        match self.state {
            State::Uninitialized => Lifecycle::Uninitialized,
            State::Initializing => Lifecycle::Initializing,
            State::Ready(_) => Lifecycle::Ready,
            State::Finished => Lifecycle::Finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    /// Builds a powercap tree with one directory per (energy_uj, max_energy_range_uj) pair.
    /// A None energy leaves the counter file out.
    fn fake_powercap(zones: &[(Option<&str>, Option<&str>)]) -> TempDir {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("intel-rapl")).unwrap();
        for (i, (energy, max)) in zones.iter().enumerate() {
            let dir = zone_path(tmp.path(), i as u32);
            fs::create_dir(&dir).unwrap();
            if let Some(energy) = energy {
                fs::write(dir.join(ENERGY_FILE), energy).unwrap();
            }
            if let Some(max) = max {
                fs::write(dir.join(MAX_ENERGY_FILE), max).unwrap();
            }
        }
        tmp
    }

    #[test]
    fn count_zones_ignores_subzones_and_other_control_types() {
        let tmp = fake_powercap(&[(Some("1\n"), None), (Some("2\n"), None)]);
        fs::create_dir(tmp.path().join("intel-rapl:0:0")).unwrap();
        fs::create_dir(tmp.path().join("intel-rapl:1:0")).unwrap();
        fs::create_dir(tmp.path().join("intel-rapl-mmio:0")).unwrap();
        fs::create_dir(tmp.path().join("intel-rapl:01")).unwrap();
        assert_eq!(count_zones(tmp.path()), 2);
    }

    #[test]
    fn count_zones_stops_at_first_gap() {
        let tmp = tempdir().unwrap();
        for name in ["intel-rapl:0", "intel-rapl:1", "intel-rapl:3"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        assert_eq!(count_zones(tmp.path()), 2);

        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("intel-rapl:1")).unwrap();
        assert_eq!(count_zones(tmp.path()), 0);
    }

    #[test]
    fn count_zones_without_registry_is_zero() {
        let tmp = tempdir().unwrap();
        assert_eq!(count_zones(&tmp.path().join("missing")), 0);
    }

    #[test]
    fn parse_counter_accepts_strtoull_prefixes() {
        assert_eq!(parse_counter("500000\n").unwrap(), 500000);
        assert_eq!(parse_counter("0x10").unwrap(), 16);
        assert_eq!(parse_counter("010").unwrap(), 8);
        assert_eq!(parse_counter("0").unwrap(), 0);
        assert!(parse_counter("").is_err());
        assert!(parse_counter("-5").is_err());
        assert!(parse_counter("power").is_err());
    }

    #[test]
    fn acquire_reads_capacity_once() {
        let tmp = fake_powercap(&[(Some("42\n"), Some("262143328850\n"))]);
        let zone = Zone::acquire(tmp.path(), 0).unwrap();
        assert_eq!(zone.index(), 0);
        assert_eq!(zone.max_energy_range_uj(), 262143328850);
        assert_eq!(zone.read_raw().unwrap(), 42);
        zone.close().unwrap();
    }

    #[test]
    fn acquire_without_capacity_file_stores_zero() {
        let tmp = fake_powercap(&[(Some("42\n"), None)]);
        let zone = Zone::acquire(tmp.path(), 0).unwrap();
        assert_eq!(zone.max_energy_range_uj(), 0);
    }

    #[test]
    fn acquire_without_counter_fails() {
        let tmp = fake_powercap(&[(None, Some("100\n"))]);
        match Zone::acquire(tmp.path(), 0) {
            Err(SensorError::Acquisition { zone, path, .. }) => {
                assert_eq!(zone, 0);
                assert!(path.ends_with("intel-rapl:0/energy_uj"));
            }
            other => panic!("expected an acquisition error, got {other:?}"),
        }
    }

    #[test]
    fn read_raw_sees_new_values_without_reopening() {
        let tmp = fake_powercap(&[(Some("100\n"), None)]);
        let zone = Zone::acquire(tmp.path(), 0).unwrap();
        assert_eq!(zone.read_raw().unwrap(), 100);
        fs::write(zone_path(tmp.path(), 0).join(ENERGY_FILE), "250\n").unwrap();
        assert_eq!(zone.read_raw().unwrap(), 250);
    }

    #[test]
    fn read_raw_on_empty_counter_fails() {
        let tmp = fake_powercap(&[(Some(""), None)]);
        let zone = Zone::acquire(tmp.path(), 0).unwrap();
        assert!(matches!(
            zone.read_raw(),
            Err(SensorError::Read {
                zone: 0,
                source: ReadFailure::Empty
            })
        ));
    }

    #[test]
    fn total_energy_is_all_or_nothing() {
        let tmp = fake_powercap(&[(Some("500000\n"), None), (Some("nope\n"), None)]);
        let zones = vec![
            Zone::acquire(tmp.path(), 0).unwrap(),
            Zone::acquire(tmp.path(), 1).unwrap(),
        ];
        assert!(matches!(
            total_energy(&zones),
            Err(SensorError::Read { zone: 1, .. })
        ));
        assert_eq!(total_energy(&zones[..1]).unwrap(), 500000);
    }

    #[test]
    fn total_energy_wraps_instead_of_panicking() {
        let tmp = fake_powercap(&[
            (Some("18446744073709551615\n"), None),
            (Some("2\n"), None),
        ]);
        let zones = vec![
            Zone::acquire(tmp.path(), 0).unwrap(),
            Zone::acquire(tmp.path(), 1).unwrap(),
        ];
        assert_eq!(total_energy(&zones).unwrap(), 1);
    }

    #[test]
    fn sensor_lifecycle() {
        let tmp = fake_powercap(&[(Some("500000\n"), Some("1000000\n")), (Some("300000\n"), None)]);
        let mut sensor = PowercapRAPLSensor::with_base_path(tmp.path());
        assert_eq!(sensor.lifecycle(), Lifecycle::Uninitialized);
        assert!(sensor.zones().is_none());

        sensor.init().unwrap();
        assert_eq!(sensor.lifecycle(), Lifecycle::Ready);
        let zones = sensor.zones().unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].max_energy_range_uj(), 1000000);
        assert_eq!(zones[1].max_energy_range_uj(), 0);
        assert!(matches!(
            sensor.init(),
            Err(SensorError::AlreadyInitialized)
        ));

        assert_eq!(sensor.read_total_energy_uj().unwrap(), 800000);
        sensor.finish().unwrap();
        assert_eq!(sensor.lifecycle(), Lifecycle::Finished);
        assert!(matches!(
            sensor.read_total_energy_uj(),
            Err(SensorError::NotInitialized)
        ));
        assert_eq!(sensor.read_total_energy_uj_or_zero(), 0);
    }

    #[test]
    fn failed_init_leaves_nothing_behind() {
        let tmp = fake_powercap(&[(Some("1\n"), None), (Some("2\n"), None), (None, None)]);
        let mut sensor = PowercapRAPLSensor::with_base_path(tmp.path());
        assert!(matches!(
            sensor.init(),
            Err(SensorError::Acquisition { zone: 2, .. })
        ));
        assert_eq!(sensor.lifecycle(), Lifecycle::Uninitialized);
        assert!(sensor.zones().is_none());
        assert!(matches!(sensor.finish(), Err(SensorError::NotInitialized)));
    }

    #[test]
    fn init_without_zones_fails() {
        let tmp = tempdir().unwrap();
        let mut sensor = PowercapRAPLSensor::with_base_path(tmp.path());
        assert!(matches!(sensor.init(), Err(SensorError::NoZones { .. })));
        assert_eq!(sensor.lifecycle(), Lifecycle::Uninitialized);
    }

    #[test]
    fn finished_sensor_can_be_initialized_again() {
        let tmp = fake_powercap(&[(Some("7\n"), None)]);
        let mut sensor = PowercapRAPLSensor::with_base_path(tmp.path());
        sensor.init().unwrap();
        sensor.finish().unwrap();
        sensor.init().unwrap();
        assert_eq!(sensor.read_total_energy_uj().unwrap(), 7);
        sensor.finish().unwrap();
    }

    #[test]
    fn label_and_interval_are_fixed() {
        let sensor = PowercapRAPLSensor::new();
        assert_eq!(sensor.get_source_label(), "Intel RAPL");
        assert_eq!(sensor.get_recommended_interval_us(), 1000);
        assert_eq!(sensor.base_path(), Path::new("/sys/class/powercap"));
    }
}
