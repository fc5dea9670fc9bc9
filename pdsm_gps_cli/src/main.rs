mod cli;

use std::{
    fs::File,
    io::{self, ErrorKind, Read},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use pdsm_gps::{
    FixAggregator, HostEvent, SentenceKind, SentenceParser, SentenceReader, TimeContext,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Input, Options};

fn open_input(input: &Input) -> Result<Box<dyn Read>> {
    Ok(match input {
        Input::Serial { port, baud } => {
            info!(port, baud, "opening serial port");
            let port = serialport::new(port, *baud)
                .timeout(Duration::from_millis(500))
                .open()
                .with_context(|| format!("opening serial port {}", port))?;
            Box::new(port)
        },
        Input::File(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        Input::Stdin => Box::new(io::stdin().lock()),
    })
}

fn emit(event: &HostEvent) -> Result<()> {
    let time = match event {
        HostEvent::Location(fix) => Utc.timestamp_millis_opt(fix.timestamp).single(),
        HostEvent::Nmea { timestamp_ms, .. } => Utc.timestamp_millis_opt(*timestamp_ms).single(),
        _ => None,
    };
    let line = serde_json::json!({
        "time": time.map(|t| t.to_rfc3339()),
        "event": event,
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

#[derive(Debug, Default)]
struct Totals {
    sentences: usize,
    locations: usize,
    sv_reports: usize,
}

fn run(options: Options) -> Result<Totals> {
    let mut input = open_input(&options.input)?;
    let mut reader = SentenceReader::new();
    let mut parser = SentenceParser::new(
        TimeContext::from_system_clock(),
        options.config.measurement_precision,
    );
    let aggregator = FixAggregator::new();
    let mut totals = Totals::default();
    let mut buf = [0u8; 1024];

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => return Err(e).context("reading NMEA input"),
        };

        let mut it = reader.consume(&buf[..n]);
        while let Some(line) = it.next() {
            let Some(kind) = aggregator.update(|state| parser.parse(line, state)) else {
                continue;
            };
            totals.sentences += 1;
            if options.echo && kind.is_echoed() {
                emit(&HostEvent::Nmea {
                    timestamp_ms: Utc::now().timestamp_millis(),
                    sentence: String::from_utf8_lossy(line).trim_end().to_owned(),
                })?;
            }
            // A position sentence closes the reporting cycle
            if !matches!(kind, SentenceKind::Gga | SentenceKind::Rmc) {
                continue;
            }
            let publication = aggregator.take_publication();
            if let Some(fix) = publication.location {
                totals.locations += 1;
                emit(&HostEvent::Location(fix))?;
            }
            if let Some(status) = publication.sv_status {
                totals.sv_reports += 1;
                emit(&HostEvent::SvStatus(status))?;
            }
        }
        debug!(pending = reader.pending(), "chunk consumed");
    }
    Ok(totals)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pdsm_gps=info,pdsm_gps_cli=info")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = cli::command().get_matches();
    let options = Options::from_matches(&matches)?;
    debug!(?options, "starting");

    let totals = run(options)?;
    info!(
        sentences = totals.sentences,
        locations = totals.locations,
        sv_reports = totals.sv_reports,
        "input exhausted"
    );
    Ok(())
}
