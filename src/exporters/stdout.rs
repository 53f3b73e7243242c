use crate::exporters::*;
use crate::sensors::units::Unit;
use colored::*;

/// An Exporter that displays the total energy consumption of the host
/// on the standard output of the terminal.
pub struct StdoutExporter {
    meter: EnergyMeter,
    time_step: Duration,
    time_limit: Option<Duration>,
}

/// Holds the arguments for a StdoutExporter.
///
/// When using raplmon as a command-line application, such a struct will be
/// automatically populated by the clap library. If you're using raplmon as
/// a library, you should populate the arguments yourself.
#[derive(clap::Args, Debug)]
pub struct ExporterArgs {
    /// Maximum time spent measuring, in seconds.
    /// 0 means continuous measurement.
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Interval between two measurements, in seconds
    #[arg(short, long, value_name = "SECONDS", default_value_t = 2)]
    pub step: u64,

    /// Additional step duration in _nano_ seconds.
    /// This is added to `step` to get the final duration.
    #[arg(long, value_name = "NANOSECS", default_value_t = 0)]
    pub step_nano: u32,
}

impl Exporter for StdoutExporter {
    /// Initializes the sensor, samples it with [`utils::run_every`] every `step`
    /// until `timeout`, then finishes the sensor.
    fn run(&mut self) {
        if !self.meter.start() {
            return;
        }
        println!("Measurement step is: {:?}", self.time_step);
        let time_step = self.time_step;
        let time_limit = self.time_limit;
        let meter = &mut self.meter;
        utils::run_every(time_step, time_limit, || {
            if let Some(sample) = meter.sample() {
                println!("{}", format_sample(meter.source_label(), &sample));
            }
        });
        self.meter.stop();
    }

    fn kind(&self) -> &str {
        "stdout"
    }
}

impl StdoutExporter {
    /// Instantiates and returns a new StdoutExporter
    pub fn new(sensor: Box<dyn EnergySource>, args: ExporterArgs) -> StdoutExporter {
        StdoutExporter {
            meter: EnergyMeter::new(sensor),
            time_step: utils::step_duration(args.step, args.step_nano),
            time_limit: utils::time_limit(Some(args.timeout)),
        }
    }
}

/// One line per sample: cumulative total, then the energy consumed since the previous sample.
fn format_sample(source: &str, sample: &Sample) -> String {
    let joules = Unit::to(
        sample.total_energy_uj as f64,
        &Unit::MicroJoule,
        &Unit::Joule,
    );
    let delta = match sample.delta_uj {
        Some(d) => format!("{d} {}", Unit::MicroJoule),
        None => String::from("----"),
    };
    format!(
        "{}\t{} {} ({:.6} {})\t+{}",
        source.bold(),
        sample.total_energy_uj,
        Unit::MicroJoule,
        joules,
        Unit::Joule,
        delta
    )
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
