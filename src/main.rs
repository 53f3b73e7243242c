//! Samples the total energy consumed by the host and prints it.

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use raplmon::{exporters, sensors::EnergySource};
use std::process;

/// Total energy consumption of the host, read from hardware energy counters.
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// The exporter module to use to output the energy readings
    #[command(subcommand)]
    exporter: ExporterChoice,

    /// Increase the verbosity level
    #[arg(short, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Don't print the header to the standard output
    #[arg(long, default_value_t = false)]
    no_header: bool,

    /// The sensor module to use to read energy counters (powercap_rapl or debug)
    #[arg(short, long)]
    sensor: Option<String>,
}

/// Defines the possible subcommands, one per exporter.
///
/// ### Description style
/// Per the clap documentation, the description of commands and arguments should be written in the style applied here,
/// *not* in the third-person. That is, use "Do xyz" instead of "Does xyz".
#[derive(Subcommand)]
enum ExporterChoice {
    /// Write the readings in the JSON format to a file or to stdout
    #[cfg(feature = "json")]
    Json(exporters::json::ExporterArgs),

    /// Write the readings to the terminal
    Stdout(exporters::stdout::ExporterArgs),
}

fn main() {
    let cli = Cli::parse();
    loggerv::init_with_verbosity(cli.verbose.into()).expect("unable to initialize the logger");

    let sensor = match raplmon::get_sensor(cli.sensor.as_deref()) {
        Ok(sensor) => sensor,
        Err(e) => {
            eprintln!("{}", format!("Invalid sensor: {e}").red());
            process::exit(1);
        }
    };
    if !cli.no_header {
        print_raplmon_header(sensor.as_ref());
    }

    let mut exporter = match build_exporter(cli.exporter, sensor) {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("{}", format!("Couldn't start the exporter: {e}").red());
            process::exit(1);
        }
    };
    exporter.run();
}

fn build_exporter(
    choice: ExporterChoice,
    sensor: Box<dyn EnergySource>,
) -> std::io::Result<Box<dyn exporters::Exporter>> {
    Ok(match choice {
        #[cfg(feature = "json")]
        ExporterChoice::Json(args) => {
            Box::new(exporters::json::JsonExporter::new(sensor, args)?) // keep this in braces
        }
        ExporterChoice::Stdout(args) => {
            Box::new(exporters::stdout::StdoutExporter::new(sensor, args))
        }
    })
    // Note that invalid choices are automatically turned into errors by `parse()` before the Cli is populated,
    // that's why they don't appear in this function.
}

fn print_raplmon_header(sensor: &dyn EnergySource) {
    let title = format!(
        "raplmon {} - {} sensor",
        exporters::utils::get_raplmon_version(),
        sensor.get_source_label()
    );
    println!("{}", title.red().bold());
    println!(
        "Recommended sampling interval: {} us",
        sensor.get_recommended_interval_us()
    );
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
