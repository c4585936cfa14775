use std::path::PathBuf;
use std::process;

use clap::{value_parser, Arg, ArgMatches, Command};
use colored::Colorize;

use crate::command_handlers::ConnectOptions;
use crate::dsp::{PipelineConfig, DEFAULT_ALPHA};
use crate::models::SUPPORTED_INTERVALS_MS;
use crate::utils::get_env;

pub mod command_handlers;
pub mod db;
pub mod dsp;
pub mod models;
pub mod socket_handlers;
pub mod store;
pub mod stream;
pub mod utils;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "12345";
const DEFAULT_FOLDER: &str = "adc_files";
const DEFAULT_LOG_FILE: &str = "client_log.csv";
const DEFAULT_LOG_TYPE: &str = "csv";
const DEFAULT_INTERVAL_MS: u64 = 20;

fn parse_interval(s: &str) -> Result<u64, String> {
    let ms: u64 = s.parse().map_err(|e| format!("{}", e))?;
    if SUPPORTED_INTERVALS_MS.contains(&ms) {
        Ok(ms)
    } else {
        Err(format!("interval must be one of {:?} ms", SUPPORTED_INTERVALS_MS))
    }
}

fn parse_alpha(s: &str) -> Result<f64, String> {
    let alpha: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if alpha > 0.0 && alpha < 1.0 {
        Ok(alpha)
    } else {
        Err("alpha must be strictly between 0 and 1".to_string())
    }
}

fn parse_tolerance(s: &str) -> Result<f64, String> {
    let tolerance: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(tolerance)
    } else {
        Err("tolerance must be a non-negative number".to_string())
    }
}

fn address_args() -> [Arg; 2] {
    [
        Arg::new("host")
            .long("host")
            .help("Host to bind or connect to [env: ADC_HOST] [default: 127.0.0.1]"),
        Arg::new("port")
            .short('p')
            .long("port")
            .value_parser(value_parser!(u16))
            .help("TCP port [env: ADC_PORT] [default: 12345]"),
    ]
}

fn cli() -> Command {
    Command::new("adc-stream")
        .about("Paced sample streaming with live adaptive filtering")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Stream recorded series to one client at the requested pace")
                .args(address_args())
                .arg(
                    Arg::new("folder")
                        .long("folder")
                        .value_parser(value_parser!(PathBuf))
                        .help("Folder of *.txt series [env: ADC_FOLDER] [default: adc_files]"),
                ),
        )
        .subcommand(
            Command::new("connect")
                .about("Receive a stream and filter it live")
                .args(address_args())
                .arg(
                    Arg::new("series")
                        .short('s')
                        .long("series")
                        .value_parser(value_parser!(usize))
                        .default_value("0")
                        .help("Zero-based index of the series to stream first"),
                )
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_parser(parse_interval)
                        .help("Sampling interval in ms (10, 20, 50, 100, 200, 500 or 1000) [default: 20]"),
                )
                .arg(
                    Arg::new("alpha")
                        .long("alpha")
                        .value_parser(parse_alpha)
                        .help("EMA smoothing factor in (0, 1) [default: 0.1]"),
                )
                .arg(
                    Arg::new("history")
                        .long("history")
                        .value_parser(value_parser!(usize))
                        .help("Keep at most this many samples (default: unbounded)"),
                )
                .arg(
                    Arg::new("tolerance")
                        .long("tolerance")
                        .value_parser(parse_tolerance)
                        .help("Cutoff change below which the FIR design is reused [default: 0]"),
                )
                .arg(
                    Arg::new("log-file")
                        .long("log-file")
                        .value_parser(value_parser!(PathBuf))
                        .help("CSV sample log [env: ADC_LOG_FILE] [default: client_log.csv]"),
                ),
        )
}

/// Flag value, else environment variable, else built-in default.
fn setting(matches: &ArgMatches, id: &str, env_key: &str, fallback: &str) -> String {
    matches
        .get_one::<String>(id)
        .cloned()
        .unwrap_or_else(|| get_env(env_key, Some(fallback)))
}

fn address(matches: &ArgMatches) -> Result<String, String> {
    let host = setting(matches, "host", "ADC_HOST", DEFAULT_HOST);
    let port = match matches.get_one::<u16>("port") {
        Some(port) => *port,
        None => get_env("ADC_PORT", Some(DEFAULT_PORT))
            .parse()
            .map_err(|e| format!("invalid ADC_PORT: {}", e))?,
    };
    Ok(format!("{}:{}", host, port))
}

fn path_setting(matches: &ArgMatches, id: &str, env_key: &str, fallback: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(get_env(env_key, Some(fallback))))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", format!("Error: {}", message).red());
    process::exit(1);
}

fn main() {
    let matches = cli().get_matches();
    let logger = utils::get_logger();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => fail(format!("failed to start runtime: {}", e)),
    };

    match matches.subcommand() {
        Some(("serve", sub)) => {
            let addr = address(sub).unwrap_or_else(|e| fail(e));
            let folder = path_setting(sub, "folder", "ADC_FOLDER", DEFAULT_FOLDER);
            if let Err(e) = rt.block_on(command_handlers::serve(&addr, &folder, &logger)) {
                utils::error_context(&logger, "server failed", format!("{:#}", e));
                fail(format!("{:#}", e));
            }
        }
        Some(("connect", sub)) => {
            let opts = ConnectOptions {
                addr: address(sub).unwrap_or_else(|e| fail(e)),
                series: sub.get_one::<usize>("series").copied().unwrap_or(0),
                interval_ms: sub.get_one::<u64>("interval").copied().unwrap_or(DEFAULT_INTERVAL_MS),
                pipeline: PipelineConfig {
                    alpha: sub.get_one::<f64>("alpha").copied().unwrap_or(DEFAULT_ALPHA),
                    history_capacity: sub.get_one::<usize>("history").copied(),
                    redesign_tolerance: sub.get_one::<f64>("tolerance").copied().unwrap_or(0.0),
                },
                log_type: get_env("ADC_LOG_TYPE", Some(DEFAULT_LOG_TYPE)),
                log_file: path_setting(sub, "log-file", "ADC_LOG_FILE", DEFAULT_LOG_FILE),
            };
            let result = rt.block_on(command_handlers::connect(opts, &logger));
            // Stdin is read on a blocking thread that never finishes on its own.
            rt.shutdown_background();
            if let Err(e) = result {
                utils::error_context(&logger, "client failed", format!("{:#}", e));
                fail(format!("{:#}", e));
            }
        }
        _ => {
            let _ = cli().print_help();
            process::exit(1);
        }
    }
}
