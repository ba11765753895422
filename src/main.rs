// Copyright 2026 by the timetabler authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

use clap::{arg, command, value_parser};
use log::{error, info};
use std::time::Duration;
use timetabler::cp::{SearchSolver, SolverConfig};
use timetabler::{Error, SolveOutcome};

fn main() {
    env_logger::init();

    let matches = command!()
        .arg(arg!(<CONFIG> "Timetable configuration file (JSON)").value_parser(value_parser!(std::path::PathBuf)))
        .arg(
            arg!(-o --output <FILE> "Write the timetable to this file instead of stdout")
                .value_parser(value_parser!(std::path::PathBuf)),
        )
        .arg(arg!(--json "Write the timetable in the simple JSON format instead of the human readable listing"))
        .arg(
            arg!(-j --threads <N> "Number of solver threads. Defaults to the number of CPUs.")
                .value_parser(value_parser!(u32)),
        )
        .arg(arg!(--"node-limit" <N> "Stop the search after N nodes").value_parser(value_parser!(u64)))
        .arg(arg!(--"time-limit" <SECS> "Stop the search after SECS seconds").value_parser(value_parser!(u64)))
        .get_matches();

    // Read configuration
    let config_path = matches.get_one::<std::path::PathBuf>("CONFIG").unwrap();
    let file = match std::fs::File::open(config_path) {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open input file {}: {}", config_path.display(), e);
            std::process::exit(exitcode::NOINPUT)
        }
    };
    let config = match timetabler::io::config::read(std::io::BufReader::new(file)) {
        Ok(c) => c,
        Err(e) => {
            error!("Could not read configuration: {}", e);
            std::process::exit(exitcode::DATAERR)
        }
    };

    // Build model
    let session = match timetabler::build_session(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::DATAERR)
        }
    };

    // Solve
    let mut solver_config = SolverConfig::default();
    if let Some(threads) = matches.get_one::<u32>("threads") {
        solver_config.num_threads = *threads;
    }
    solver_config.node_limit = matches.get_one::<u64>("node-limit").copied();
    solver_config.time_limit = matches.get_one::<u64>("time-limit").map(|s| Duration::from_secs(*s));
    let timetable = match timetabler::solve(session, &SearchSolver::new(solver_config)) {
        Ok(SolveOutcome::Solved(t)) => t,
        Ok(SolveOutcome::Infeasible) => {
            error!("The constraints admit no timetable.");
            std::process::exit(exitcode::DATAERR)
        }
        Err(e @ Error::Configuration(_)) => {
            error!("{}", e);
            std::process::exit(exitcode::DATAERR)
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::SOFTWARE)
        }
    };
    info!(
        "Found timetable with status {} and penalty {}",
        timetable.status(),
        timetable.objective().unwrap_or(0)
    );

    // Write output
    let result = match matches.get_one::<std::path::PathBuf>("output") {
        Some(path) => {
            let file = match std::fs::File::create(path) {
                Ok(f) => f,
                Err(e) => {
                    error!("Could not create output file {}: {}", path.display(), e);
                    std::process::exit(exitcode::CANTCREAT)
                }
            };
            write_timetable(std::io::BufWriter::new(file), &timetable, matches.get_flag("json"))
        }
        None => write_timetable(std::io::stdout(), &timetable, matches.get_flag("json")),
    };
    if let Err(e) = result {
        error!("Could not write timetable: {}", e);
        std::process::exit(exitcode::IOERR)
    }
}

fn write_timetable<W: std::io::Write>(mut writer: W, timetable: &timetabler::Timetable, json: bool) -> Result<(), String> {
    if json {
        timetabler::io::simple::write(writer, timetable)
    } else {
        writer
            .write_all(timetabler::io::format_timetable(timetable).as_bytes())
            .map_err(|e| e.to_string())
    }
}
