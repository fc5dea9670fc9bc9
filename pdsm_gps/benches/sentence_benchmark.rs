use byteorder::{BigEndian, WriteBytesExt};
use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use pdsm_gps::*;
use std::hint::black_box;

const EPOCH: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n\
$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n\
$GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1*39\r\n\
$GPGSV,2,1,08,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*75\r\n\
$GPGSV,2,2,08,15,10,030,20,16,55,120,30,24,61,270,44,29,09,010,12*70\r\n";

fn parse_all(data: &[u8], chunk_size: usize) -> usize {
    let mut reader = SentenceReader::new();
    let date = NaiveDate::from_ymd_opt(1994, 3, 23).unwrap();
    let mut parser = SentenceParser::new(TimeContext::new(date, 0), 10);
    let mut state = FixState::default();
    let mut count = 0;
    for chunk in data.chunks(chunk_size) {
        let mut it = reader.consume(chunk);
        while let Some(line) = it.next() {
            if parser.parse(line, &mut state).is_some() {
                count += 1;
            }
        }
    }
    count
}

fn pd_record() -> Vec<u8> {
    let layout = Leo::PD_LAYOUT;
    let mut words = vec![0u32; layout.sv_list + 12 * layout.sv_stride];
    words[layout.event] = (PdEvents::POSITION | PdEvents::VELOCITY | PdEvents::HEIGHT).bits();
    words[layout.timestamp] = 1_000_000_000;
    words[layout.latitude_lo] = 0x1_0000;
    words[layout.altitude] = 5454;
    words[layout.sv_count] = 12;
    for i in 0..12 {
        let base = layout.sv_list + i * layout.sv_stride;
        words[base] = i as u32 + 1;
        words[base + 2] = 18_045;
    }
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for w in words {
        bytes.write_u32::<BigEndian>(w).unwrap();
    }
    bytes
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let data = EPOCH.repeat(500);
    for chunk in &[16, 64, 100, 256, 512, 1024] {
        c.bench_function(&format!("sentence_parse_{}", chunk), |b| {
            b.iter(|| assert_eq!(parse_all(black_box(&data), *chunk), 2500))
        });
    }

    let record = pd_record();
    let decoder = PdEventDecoder {
        layout: Leo::PD_LAYOUT,
        altitude_rule: Leo::altitude_rule(),
        precision: 10,
        decode_fix: true,
    };
    c.bench_function("pd_event_decode", |b| {
        b.iter(|| {
            let event = decoder
                .decode(WordRecord::new(black_box(&record)).unwrap())
                .unwrap();
            assert!(event.has_fix());
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
