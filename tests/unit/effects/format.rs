use super::*;

fn entry() -> CacheEntry {
    CacheEntry {
        key: 40,
        start: 1.5,
        end: 30.0,
        trajectories: vec![
            Trajectory {
                samples: vec![
                    Sample {
                        frame: 2,
                        x: 10,
                        y: 20,
                    },
                    Sample {
                        frame: 3,
                        x: 11,
                        y: 18,
                    },
                ],
            },
            Trajectory::default(),
        ],
    }
}

#[test]
fn entry_layout_matches_documented_sizes() {
    let mut buf = Vec::new();
    write_entry(&mut buf, &entry()).unwrap();
    assert_eq!(buf.len(), HEADER_LEN + 2 + 2 * SAMPLE_LEN + 2);
    assert_eq!(buf[0], 40);
    assert_eq!(&buf[1..5], &1.5f32.to_le_bytes());
    assert_eq!(&buf[9..13], &2u32.to_le_bytes());
    assert_eq!(&buf[13..15], &2u16.to_le_bytes());
    assert_eq!(parse_entry(&buf), Some(entry()));
}

#[test]
fn truncated_entry_is_rejected() {
    let mut buf = Vec::new();
    write_entry(&mut buf, &entry()).unwrap();
    assert!(parse_entry(&buf[..buf.len() - 3]).is_none());
    assert!(EntryHeader::parse(&buf[..HEADER_LEN - 1]).is_none());
}

#[test]
fn index_ignores_partial_trailing_record() {
    let mut buf = Vec::new();
    for i in [7u32, 0, 123_456] {
        write_index_record(&mut buf, i).unwrap();
    }
    buf.extend_from_slice(&[1, 2]);
    assert_eq!(read_index(&mut buf.as_slice()).unwrap(), vec![7, 0, 123_456]);
}

#[test]
fn window_is_inclusive() {
    let h = EntryHeader {
        key: 0,
        start: 10.0,
        end: 20.0,
        trajectories: 1,
    };
    assert!(!h.window_contains(9.0, 5));
    assert!(h.window_contains(10.0, 5));
    assert!(h.window_contains(25.0, 5));
    assert!(!h.window_contains(26.0, 5));
}
