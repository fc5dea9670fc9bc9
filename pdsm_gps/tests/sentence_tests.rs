use chrono::{NaiveDate, TimeZone, Utc};
use pdsm_gps::{
    FixAggregator, FixState, LocationFlags, SentenceKind, SentenceParser, SentenceReader,
    TimeContext,
};
use proptest::prelude::*;

fn parser() -> SentenceParser {
    let date = NaiveDate::from_ymd_opt(2011, 6, 15).unwrap();
    SentenceParser::new(TimeContext::new(date, 0), 10)
}

fn feed(parser: &mut SentenceParser, aggregator: &FixAggregator, data: &[u8]) -> Vec<SentenceKind> {
    let mut reader = SentenceReader::new();
    let mut kinds = Vec::new();
    let mut it = reader.consume(data);
    while let Some(line) = it.next() {
        if let Some(kind) = aggregator.update(|state| parser.parse(line, state)) {
            kinds.push(kind);
        }
    }
    kinds
}

#[test]
fn gga_fills_position_accuracy_and_altitude() {
    let mut parser = parser();
    let mut state = FixState::default();
    let kind = parser.parse(
        b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n",
        &mut state,
    );
    assert_eq!(kind, Some(SentenceKind::Gga));

    let fix = &state.fix;
    assert!(fix.has(LocationFlags::LAT_LONG | LocationFlags::ACCURACY | LocationFlags::ALTITUDE));
    assert!((fix.latitude - 48.1173).abs() < 1e-6);
    assert!((fix.longitude - 11.516_666_7).abs() < 1e-6);
    assert!((fix.accuracy - 9.0).abs() < 1e-4);
    assert!((fix.altitude - 592.3).abs() < 1e-9);
    let expect = Utc.with_ymd_and_hms(2011, 6, 15, 12, 35, 19).unwrap().timestamp_millis();
    assert_eq!(fix.timestamp, expect);
}

#[test]
fn gga_without_fix_quality_is_ignored() {
    let mut parser = parser();
    let mut state = FixState::default();
    let kind = parser.parse(
        b"$GPGGA,123519,4807.038,N,01131.000,E,0,08,0.9,545.4,M,46.9,M,,*47\r\n",
        &mut state,
    );
    assert_eq!(kind, Some(SentenceKind::Gga));
    assert!(state.fix.flags.is_empty());
}

#[test]
fn southern_and_western_hemispheres_are_negative() {
    let mut parser = parser();
    let mut state = FixState::default();
    parser.parse(
        b"$GPGGA,000000,3352.500,S,15112.000,W,1,05,1.0,10.0,M,0.0,M,,*00\r\n",
        &mut state,
    );
    assert!((state.fix.latitude + 33.875).abs() < 1e-9);
    assert!((state.fix.longitude + 151.2).abs() < 1e-9);
}

#[test]
fn rmc_sets_date_speed_and_bearing() {
    let mut parser = SentenceParser::new(TimeContext::from_system_clock(), 10);
    let mut state = FixState::default();
    let kind = parser.parse(
        b"$GPRMC,123045.500,A,4807.038,N,01131.000,E,10.0,84.4,150611,003.1,W*6A\r\n",
        &mut state,
    );
    assert_eq!(kind, Some(SentenceKind::Rmc));
    assert_eq!(
        parser.time_context().date(),
        NaiveDate::from_ymd_opt(2011, 6, 15)
    );

    let fix = &state.fix;
    let expect = Utc.with_ymd_and_hms(2011, 6, 15, 12, 30, 45).unwrap().timestamp_millis() + 500;
    assert_eq!(fix.timestamp, expect);
    assert!(fix.has(LocationFlags::LAT_LONG | LocationFlags::SPEED | LocationFlags::BEARING));
    assert!((fix.speed - 5.144_444).abs() < 1e-4);
    assert!((fix.bearing - 84.4).abs() < 1e-4);
}

#[test]
fn void_rmc_is_ignored() {
    let mut parser = parser();
    let mut state = FixState::default();
    parser.parse(
        b"$GPRMC,123045,V,4807.038,N,01131.000,E,10.0,84.4,010199,,*00\r\n",
        &mut state,
    );
    assert!(state.fix.flags.is_empty());
    assert_eq!(
        parser.time_context().date(),
        NaiveDate::from_ymd_opt(2011, 6, 15)
    );
}

#[test]
fn gsa_builds_used_in_fix_mask() {
    let mut parser = parser();
    let mut state = FixState::default();
    parser.parse(b"$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39\r\n", &mut state);
    let expect = (1 << 3) | (1 << 4) | (1 << 8) | (1 << 11) | (1 << 23);
    assert_eq!(state.sv_status.used_in_fix_mask, expect);
    assert!(state.sv_status_changed);

    parser.parse(b"$GPGSA,A,1,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39\r\n", &mut state);
    assert_eq!(state.sv_status.used_in_fix_mask, 0);
}

#[test]
fn gsv_series_collects_satellites() {
    let mut parser = parser();
    let aggregator = FixAggregator::new();
    let data = b"$GPGSV,2,1,06,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75\r\n\
                 $GPGSV,2,2,06,15,10,030,,16,55,120,30*70\r\n";
    let kinds = feed(&mut parser, &aggregator, data);
    assert_eq!(kinds, [SentenceKind::Gsv, SentenceKind::Gsv]);

    let state = aggregator.snapshot();
    assert!(state.sv_status_changed);
    // PRN 15 has no SNR and is skipped
    let prns: Vec<i32> = state.sv_status.sv_list.iter().map(|sv| sv.prn).collect();
    assert_eq!(prns, [1, 2, 12, 14, 16]);
    let first = &state.sv_status.sv_list[0];
    assert_eq!((first.elevation, first.azimuth, first.snr), (40.0, 83.0, 46.0));
}

#[test]
fn new_gsv_series_replaces_the_list() {
    let mut parser = parser();
    let mut state = FixState::default();
    parser.parse(b"$GPGSV,1,1,01,01,40,083,46*75\r\n", &mut state);
    parser.parse(b"$GPGSV,2,1,05,07,40,083,20*75\r\n", &mut state);
    assert!(!state.sv_status_changed);
    assert_eq!(state.sv_status.num_svs(), 1);
    assert_eq!(state.sv_status.sv_list[0].prn, 7);
}

#[test]
fn short_lines_are_discarded() {
    let mut parser = parser();
    let mut state = FixState::default();
    assert_eq!(parser.parse(b"$GPGGA\r\n", &mut state), None);
    assert_eq!(parser.parse(b"$GP,1,2,3,4,5\r\n", &mut state), None);
    assert_eq!(
        parser.parse(b"$GPZDA,123519,15,06,2011,,*00\r\n", &mut state),
        Some(SentenceKind::Other)
    );
}

#[test]
fn publication_merges_flags_across_cycles() {
    let mut parser = parser();
    let aggregator = FixAggregator::new();
    feed(
        &mut parser,
        &aggregator,
        b"$GPRMC,123045,A,4807.038,N,01131.000,E,10.0,84.4,150611,003.1,W*6A\r\n",
    );
    let first = aggregator.take_publication().location.unwrap();
    assert!(first.has(LocationFlags::SPEED));

    feed(
        &mut parser,
        &aggregator,
        b"$GPGGA,123046,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n",
    );
    let second = aggregator.take_publication().location.unwrap();
    assert!(second.has(LocationFlags::SPEED | LocationFlags::ALTITUDE | LocationFlags::ACCURACY));

    assert!(aggregator.take_publication().location.is_none());
}

#[test]
fn overlong_line_is_dropped_whole() {
    let mut reader = SentenceReader::new();
    let mut data = vec![b'x'; 300];
    data.extend_from_slice(b"\n$GPGSA,A,3,04*00\r\n");

    let mut lines = Vec::new();
    let mut it = reader.consume(&data);
    while let Some(line) = it.next() {
        lines.push(line.to_vec());
    }
    assert_eq!(lines, [b"$GPGSA,A,3,04*00\r\n".to_vec()]);
    assert!(!reader.is_overflowing());
}

fn gsv_sentences(svs: &[(u8, u8, u16, u8)]) -> Vec<u8> {
    let total = svs.len().div_ceil(4);
    let mut out = Vec::new();
    for (n, chunk) in svs.chunks(4).enumerate() {
        let mut line = format!("$GPGSV,{},{},{:02}", total, n + 1, svs.len());
        for (prn, elevation, azimuth, snr) in chunk {
            line.push_str(&format!(",{:02},{:02},{:03},{:02}", prn, elevation, azimuth, snr));
        }
        line.push_str("*00\r\n");
        out.extend_from_slice(line.as_bytes());
    }
    out
}

fn satellites() -> impl Strategy<Value = Vec<(u8, u8, u16, u8)>> {
    prop::collection::vec((1u8..=32, 0u8..=90, 0u16..360, 1u8..=99), 1..=12)
}

proptest! {
    #[test]
    fn gsv_series_keeps_every_satellite_in_order(svs in satellites()) {
        let mut parser = parser();
        let aggregator = FixAggregator::new();
        feed(&mut parser, &aggregator, &gsv_sentences(&svs));

        let state = aggregator.snapshot();
        prop_assert!(state.sv_status_changed);
        prop_assert_eq!(state.sv_status.num_svs(), svs.len());
        for (sv, (prn, elevation, azimuth, snr)) in state.sv_status.sv_list.iter().zip(&svs) {
            prop_assert_eq!(sv.prn, i32::from(*prn));
            prop_assert_eq!(sv.elevation, f32::from(*elevation));
            prop_assert_eq!(sv.azimuth, f32::from(*azimuth));
            prop_assert_eq!(sv.snr, f32::from(*snr));
        }
    }

    #[test]
    fn reader_output_is_independent_of_chunking(
        svs in satellites(),
        splits in prop::collection::vec(1usize..40, 1..20),
    ) {
        let data = gsv_sentences(&svs);

        let mut whole = Vec::new();
        let mut reader = SentenceReader::new();
        let mut it = reader.consume(&data);
        while let Some(line) = it.next() {
            whole.push(line.to_vec());
        }

        let mut pieces = Vec::new();
        let mut reader = SentenceReader::new();
        let mut rest = &data[..];
        let mut split = splits.iter().cycle();
        while !rest.is_empty() {
            let n = (*split.next().unwrap()).min(rest.len());
            let (chunk, tail) = rest.split_at(n);
            let mut it = reader.consume(chunk);
            while let Some(line) = it.next() {
                pieces.push(line.to_vec());
            }
            rest = tail;
        }

        prop_assert_eq!(whole.len(), svs.len().div_ceil(4));
        prop_assert_eq!(whole, pieces);
    }
}
