use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use pdsm_gps::GpsConfig;

/// Where sentences are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Serial { port: String, baud: u32 },
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
pub struct Options {
    pub input: Input,
    pub config: GpsConfig,
    /// Print GGA, RMC and GSA sentences as they are parsed
    pub echo: bool,
}

pub fn command() -> clap::Command {
    clap::Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Replays an NMEA stream through the fix aggregator and prints JSON reports")
        .arg(
            Arg::new("port")
                .value_name("port")
                .short('p')
                .long("port")
                .conflicts_with("file")
                .help("Serial port carrying the NMEA stream"),
        )
        .arg(
            Arg::new("baud")
                .value_name("baud")
                .short('s')
                .long("baud")
                .default_value("9600")
                .value_parser(value_parser!(u32))
                .help("Baud rate for the selected port"),
        )
        .arg(
            Arg::new("file")
                .value_name("file")
                .short('f')
                .long("file")
                .value_parser(value_parser!(PathBuf))
                .help("Recorded NMEA log; stdin is read when neither port nor file is given"),
        )
        .arg(
            Arg::new("config")
                .value_name("gps.conf")
                .short('c')
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration file"),
        )
        .arg(
            Arg::new("precision")
                .long("precision")
                .value_parser(value_parser!(u8).range(1..=15))
                .help("Metres per unit of HDOP; overrides the configuration"),
        )
        .arg(
            Arg::new("echo")
                .long("echo")
                .action(ArgAction::SetTrue)
                .help("Also print the raw position sentences"),
        )
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let input = if let Some(port) = matches.get_one::<String>("port") {
            Input::Serial {
                port: port.clone(),
                baud: matches.get_one::<u32>("baud").copied().unwrap_or(9600),
            }
        } else if let Some(path) = matches.get_one::<PathBuf>("file") {
            Input::File(path.clone())
        } else {
            Input::Stdin
        };

        let mut config = match matches.get_one::<PathBuf>("config") {
            Some(path) => GpsConfig::load(path)
                .with_context(|| format!("reading configuration {}", path.display()))?,
            None => GpsConfig::default(),
        };
        if let Some(precision) = matches.get_one::<u8>("precision") {
            config.measurement_precision = *precision;
        }

        Ok(Self {
            input,
            config,
            echo: matches.get_flag("echo"),
        })
    }
}
