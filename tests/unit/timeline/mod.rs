use super::*;

fn note(key: u8, start: f64, end: f64) -> Note {
    Note {
        key,
        start_frame: start,
        end_frame: end,
        velocity: 64,
    }
}

#[test]
fn new_sorts_and_reports_bounds() {
    let tl = Timeline::new(
        vec![note(5, 10.0, 40.0), note(1, 2.0, 8.0), note(3, 5.0, 12.0)],
        TimelineStats::default(),
    );
    let keys: Vec<u8> = tl.notes().iter().map(|n| n.key).collect();
    assert_eq!(keys, vec![1, 3, 5]);
    assert_eq!(tl.first_start(), 2.0);
    assert_eq!(tl.last_end(), 40.0);
    assert_eq!(tl.span_frames(), 38.0);
}

#[test]
fn sounding_is_half_open() {
    let tl = Timeline::new(
        vec![note(1, 0.0, 10.0), note(2, 10.0, 20.0)],
        TimelineStats::default(),
    );
    let at = |f: f64| tl.sounding_at(f).map(|n| n.key).collect::<Vec<_>>();
    assert_eq!(at(0.0), vec![1]);
    assert_eq!(at(10.0), vec![2]);
    assert!(at(20.0).is_empty());
}

#[test]
fn empty_timeline_has_zero_span() {
    let tl = Timeline::default();
    assert!(tl.is_empty());
    assert_eq!(tl.first_start(), 0.0);
    assert_eq!(tl.span_frames(), 0.0);
}
