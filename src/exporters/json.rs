use crate::exporters::*;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

/// An Exporter that writes the total energy consumption of the host
/// in the JSON format, either in a file or to the standard output.
/// Each sample is one JSON object on its own line.
pub struct JsonExporter {
    meter: EnergyMeter,
    hostname: String,
    time_step: Duration,
    time_limit: Option<Duration>,
    out_writer: BufWriter<Box<dyn Write>>,
}

// Note: clap::Args automatically generate Args for the fields of this struct,
// using the field's name as the argument's name, and the doc comment
// above the field as the argument's description.

/// Holds the arguments for a JsonExporter.
#[derive(clap::Args, Debug)]
pub struct ExporterArgs {
    /// Maximum time spent measuring, in seconds.
    /// If unspecified, runs forever.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Interval between two measurements, in seconds
    #[arg(short, long, value_name = "SECONDS", default_value_t = 2)]
    pub step: u64,

    /// Additional step duration in _nano_ seconds.
    /// This is added to `step` to get the final duration.
    #[arg(long, value_name = "NANOSECS", default_value_t = 0)]
    pub step_nano: u32,

    /// Destination file for the report (if absent, print the report to stdout)
    #[arg(short, long)]
    pub file: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Report {
    host: String,
    source: String,
    timestamp: f64,
    total_energy_uj: u64,
    delta_uj: Option<u64>,
}

impl Report {
    fn new(host: &str, source: &str, sample: &Sample) -> Report {
        Report {
            host: String::from(host),
            source: String::from(source),
            timestamp: sample.timestamp.as_secs_f64(),
            total_energy_uj: sample.total_energy_uj,
            delta_uj: sample.delta_uj,
        }
    }
}

impl Exporter for JsonExporter {
    /// Initializes the sensor, samples it with [`utils::run_every`] every `step`
    /// until `timeout`, then finishes the sensor.
    fn run(&mut self) {
        if !self.meter.start() {
            return;
        }
        let step = self.time_step;
        info!("Measurement step is: {step:?}");
        let limit = self.time_limit;
        utils::run_every(step, limit, || self.iterate());
        self.meter.stop();
    }

    fn kind(&self) -> &str {
        "json"
    }
}

impl JsonExporter {
    /// Instantiates and returns a new JsonExporter.
    pub fn new(sensor: Box<dyn EnergySource>, args: ExporterArgs) -> io::Result<JsonExporter> {
        // Prepare the output (either stdout or a file)
        let output: Box<dyn Write> = match args.file {
            Some(f) => Box::new(File::create(&f)?),
            None => Box::new(io::stdout()),
        };
        Ok(JsonExporter {
            meter: EnergyMeter::new(sensor),
            hostname: utils::get_hostname(),
            time_step: utils::step_duration(args.step, args.step_nano),
            time_limit: utils::time_limit(args.timeout),
            out_writer: BufWriter::new(output),
        })
    }

    fn iterate(&mut self) {
        match self.meter.sample() {
            Some(sample) => {
                let report = Report::new(&self.hostname, self.meter.source_label(), &sample);
                if let Err(e) = write_report(&mut self.out_writer, &report) {
                    error!("Couldn't write JSON report: {e}");
                }
            }
            None => {
                info!("No data yet, didn't write report.");
            }
        }
    }
}

fn write_report<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    serde_json::to_writer(&mut *out, report)?;
    writeln!(out)?;
    out.flush()
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
