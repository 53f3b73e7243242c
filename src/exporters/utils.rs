//! # utils
//!
//! The utils module provides common functions used by the exporters.
use clap::crate_version;
use std::thread;
use std::time::{Duration, Instant};

/// Returns raplmon version.
pub fn get_raplmon_version() -> String {
    String::from(crate_version!())
}

/// Returns the hostname of the system running raplmon.
pub fn get_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Fail to get system hostname: {e}");
            String::from("unknown")
        }
    }
}

/// Builds the step duration from whole seconds and extra nanoseconds.
pub fn step_duration(step: u64, step_nano: u32) -> Duration {
    Duration::new(step, step_nano)
}

/// Converts a timeout in seconds to a time limit. 0 or nothing means no limit.
pub fn time_limit(timeout: Option<u64>) -> Option<Duration> {
    match timeout {
        Some(0) | None => None,
        Some(t) => Some(Duration::from_secs(t)),
    }
}

/// Calls `iteration` every `step` until `limit` is reached, or forever.
pub fn run_every<F: FnMut()>(step: Duration, limit: Option<Duration>, mut iteration: F) {
    match limit {
        Some(timeout) => {
            let t0 = Instant::now();
            while t0.elapsed() <= timeout {
                iteration();
                thread::sleep(step);
            }
        }
        None => loop {
            iteration();
            thread::sleep(step);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_means_forever() {
        assert_eq!(time_limit(Some(0)), None);
        assert_eq!(time_limit(None), None);
        assert_eq!(time_limit(Some(3)), Some(Duration::from_secs(3)));
    }

    #[test]
    fn bounded_run_stops() {
        let mut calls = 0;
        run_every(
            Duration::from_millis(5),
            Some(Duration::from_millis(20)),
            || calls += 1,
        );
        assert!(calls >= 1);
    }

    #[test]
    fn version_is_the_crate_version() {
        assert_eq!(get_raplmon_version(), env!("CARGO_PKG_VERSION"));
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
