#[macro_use]
extern crate afl;
extern crate pdsm_gps;

use pdsm_gps::{
    EngineRevision, FixAggregator, Leo, PdEventDecoder, SentenceParser, SentenceReader,
    TimeContext, WordRecord,
};

const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

fn parse_sentences(chunksize: usize, data: &[u8]) {
    let mut reader = SentenceReader::new();
    let mut parser = SentenceParser::new(TimeContext::from_system_clock(), 10);
    let aggregator = FixAggregator::new();
    for chunk in data.chunks(chunksize) {
        // consume() returns an iterator-like object over the completed lines
        let mut it = reader.consume(chunk);
        while let Some(line) = it.next() {
            aggregator.update(|state| parser.parse(line, state));
        }
    }
    let _ = aggregator.take_publication();

    // Whatever came before, a newline resynchronizes the reader
    let mut lines = 0;
    let mut it = reader.consume(b"\n");
    while it.next().is_some() {}
    let mut it = reader.consume(GGA);
    while let Some(line) = it.next() {
        assert_eq!(line, GGA);
        lines += 1;
    }
    assert_eq!(lines, 1);
}

fn decode_records(data: &[u8]) {
    let len = data.len() / 4 * 4;
    let Ok(record) = WordRecord::new(&data[..len]) else {
        return;
    };
    for decode_fix in [false, true] {
        let decoder = PdEventDecoder {
            layout: Leo::PD_LAYOUT,
            altitude_rule: Leo::altitude_rule(),
            precision: 10,
            decode_fix,
        };
        if let Ok(event) = decoder.decode(record) {
            if let Some(status) = event.sv_status {
                assert!(status.num_svs() <= 32);
            }
        }
    }
    let _ = pdsm_gps::pdsm::decode_ext_status(&Leo::EXT_LAYOUT, record);
}

fn main() {
    fuzz!(|data: &[u8]| {
        if data.len() > 2 {
            let chunksize = data[1] as usize;
            if data[0] & 1 == 0 {
                if chunksize != 0 {
                    parse_sentences(chunksize, &data[2..]);
                }
            } else {
                decode_records(&data[2..]);
            }
        }
    });
}
