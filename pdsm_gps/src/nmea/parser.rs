use tracing::{debug, trace};

use super::{
    time::TimeContext,
    tokenizer::{str2float, str2int, Tokenizer},
};
use crate::{
    aggregator::FixState,
    constants::MIN_SENTENCE_LEN,
    error::SentenceError,
    fix::{prn_mask, LocationFlags, SvInfo},
};

/// Sentence types the parser acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    Gga,
    Rmc,
    Gsa,
    Gsv,
    Other,
}

impl SentenceKind {
    fn from_id(id: &[u8]) -> Self {
        match id.get(2..5) {
            Some(b"GGA") => SentenceKind::Gga,
            Some(b"RMC") => SentenceKind::Rmc,
            Some(b"GSA") => SentenceKind::Gsa,
            Some(b"GSV") => SentenceKind::Gsv,
            _ => SentenceKind::Other,
        }
    }

    /// GGA, RMC and GSA sentences are echoed to the host verbatim.
    pub fn is_echoed(self) -> bool {
        matches!(self, SentenceKind::Gga | SentenceKind::Rmc | SentenceKind::Gsa)
    }
}

/// Turns NMEA sentences into [`FixState`] updates.
pub struct SentenceParser {
    time: TimeContext,
    precision: u8,
}

impl SentenceParser {
    pub fn new(time: TimeContext, precision: u8) -> Self {
        Self { time, precision }
    }

    pub fn time_context(&self) -> &TimeContext {
        &self.time
    }

    /// Parses one line into `state`.
    ///
    /// Returns the recognised sentence kind, or `None` when the line was too
    /// short to carry a sentence.
    pub fn parse(&mut self, line: &[u8], state: &mut FixState) -> Option<SentenceKind> {
        if line.len() < MIN_SENTENCE_LEN {
            trace!("sentence too short, discarded");
            return None;
        }

        let tzer = Tokenizer::new(line);
        let id = tzer.get(0);
        if id.len() < 5 {
            debug!("sentence id {:?} too short, ignored", String::from_utf8_lossy(id));
            return None;
        }

        let kind = SentenceKind::from_id(id);
        match kind {
            SentenceKind::Gga => self.parse_gga(&tzer, state),
            SentenceKind::Rmc => self.parse_rmc(&tzer, state),
            SentenceKind::Gsa => parse_gsa(&tzer, state),
            SentenceKind::Gsv => parse_gsv(&tzer, state),
            SentenceKind::Other => trace!("unknown sentence {}", String::from_utf8_lossy(id)),
        }
        Some(kind)
    }

    fn parse_gga(&self, tzer: &Tokenizer, state: &mut FixState) {
        // Fix quality: 0 = invalid, 1 = GPS fix, ...
        if !matches!(tzer.get(6).first(), Some(&q) if q > b'0') {
            return;
        }
        self.update_time(tzer.get(1), state);
        update_latlong(tzer.get(2), tzer.get(3), tzer.get(4), tzer.get(5), state);

        let accuracy = tzer.get(8);
        if !accuracy.is_empty() {
            state.fix.flags |= LocationFlags::ACCURACY;
            state.fix.accuracy = (str2float(accuracy) * f64::from(self.precision)) as f32;
        }

        // Height above the ellipsoid is the sentence's mean-sea-level height
        // plus the geoid separation.
        let altitude = tzer.get(9);
        let geoid = tzer.get(11);
        if !altitude.is_empty() && !geoid.is_empty() {
            state.fix.flags |= LocationFlags::ALTITUDE;
            state.fix.altitude = str2float(altitude) + str2float(geoid);
        }
    }

    fn parse_rmc(&mut self, tzer: &Tokenizer, state: &mut FixState) {
        // Status: A = active, V = void
        if tzer.get(2).first() != Some(&b'A') {
            return;
        }
        match self.time.update_date(tzer.get(9)) {
            Ok(()) => self.update_time(tzer.get(1), state),
            Err(e) => debug!("RMC: {}", e),
        }
        update_latlong(tzer.get(3), tzer.get(4), tzer.get(5), tzer.get(6), state);

        let bearing = tzer.get(8);
        if !bearing.is_empty() {
            state.fix.flags |= LocationFlags::BEARING;
            state.fix.bearing = str2float(bearing) as f32;
        }

        let speed = tzer.get(7);
        if !speed.is_empty() {
            state.fix.flags |= LocationFlags::SPEED;
            // knots to m/s
            state.fix.speed = (str2float(speed) * 1.852 / 3.6) as f32;
        }
    }

    fn update_time(&self, token: &[u8], state: &mut FixState) {
        match self.time.timestamp_ms(token) {
            Ok(ts) => state.fix.timestamp = ts,
            Err(e) => debug!("{}: {:?}", e, String::from_utf8_lossy(token)),
        }
    }
}

fn parse_gsa(tzer: &Tokenizer, state: &mut FixState) {
    let mode = tzer.get(2).first().copied();
    state.sv_status.used_in_fix_mask = if matches!(mode, Some(b'2') | Some(b'3')) {
        prn_mask((3..=14).map(|i| str2int(tzer.get(i))))
    } else {
        0
    };
    state.sv_status_changed = true;
}

fn parse_gsv(tzer: &Tokenizer, state: &mut FixState) {
    let num_svs = str2int(tzer.get(3));
    if num_svs <= 0 {
        return;
    }
    let total_sentences = str2int(tzer.get(1));
    let sentence_no = str2int(tzer.get(2));

    if sentence_no == 1 {
        state.sv_status_changed = false;
        state.sv_status.sv_list.clear();
    }

    for i in 0..4 {
        if state.sv_status.num_svs() >= num_svs as usize {
            break;
        }
        let snr = str2float(tzer.get(i * 4 + 7));
        if snr > 0.0 {
            state.sv_status.push(SvInfo {
                prn: str2int(tzer.get(i * 4 + 4)),
                elevation: str2float(tzer.get(i * 4 + 5)) as f32,
                azimuth: str2float(tzer.get(i * 4 + 6)) as f32,
                snr: snr as f32,
            });
        }
    }

    if sentence_no == total_sentences {
        state.sv_status_changed = true;
    }
}

fn update_latlong(
    latitude: &[u8],
    lat_hemi: &[u8],
    longitude: &[u8],
    lon_hemi: &[u8],
    state: &mut FixState,
) {
    let coords = convert_coordinate(latitude, lat_hemi, b'S')
        .and_then(|lat| Ok((lat, convert_coordinate(longitude, lon_hemi, b'W')?)));
    match coords {
        Ok((lat, lon)) => {
            state.fix.flags |= LocationFlags::LAT_LONG;
            state.fix.latitude = lat;
            state.fix.longitude = lon;
        },
        Err(e) => debug!("{}", e),
    }
}

fn convert_coordinate(token: &[u8], hemi: &[u8], negative: u8) -> Result<f64, SentenceError> {
    if token.len() < 6 {
        return Err(SentenceError::InvalidCoordinate);
    }
    let value = convert_from_hhmm(str2float(token));
    Ok(if hemi.first() == Some(&negative) {
        -value
    } else {
        value
    })
}

/// `dddmm.mmmm` to decimal degrees.
pub fn convert_from_hhmm(val: f64) -> f64 {
    let degrees = (val.floor() / 100.0).trunc();
    let minutes = val - degrees * 100.0;
    degrees + minutes / 60.0
}
