use super::*;

#[test]
fn first_request_paints_immediately() {
    let mut t = RedrawThrottle::new();
    assert_eq!(t.request(0.0), RedrawDecision::PaintNow);
    assert!(!t.is_pending());
}

#[test]
fn burst_inside_window_schedules_one_trailing_paint() {
    let mut t = RedrawThrottle::with_interval(16.0);
    assert_eq!(t.request(100.0), RedrawDecision::PaintNow);
    assert_eq!(t.request(104.0), RedrawDecision::Scheduled { delay_ms: 12.0 });
    assert_eq!(t.request(105.0), RedrawDecision::Coalesced);
    assert_eq!(t.request(110.0), RedrawDecision::Coalesced);
    assert!(t.is_pending());

    assert!(t.on_timer(116.0));
    assert!(!t.is_pending());
    // The trailing paint opened a new window.
    assert!(matches!(t.request(120.0), RedrawDecision::Scheduled { .. }));
}

#[test]
fn request_after_window_paints_again() {
    let mut t = RedrawThrottle::with_interval(16.0);
    assert_eq!(t.request(0.0), RedrawDecision::PaintNow);
    assert_eq!(t.request(16.0), RedrawDecision::PaintNow);
    assert_eq!(t.request(40.0), RedrawDecision::PaintNow);
}

#[test]
fn stray_timer_does_not_paint() {
    let mut t = RedrawThrottle::new();
    assert!(!t.on_timer(5.0));
}

#[test]
fn at_most_one_paint_per_interval() {
    let mut t = RedrawThrottle::with_interval(16.0);
    let mut paints = Vec::new();
    let mut timer_due: Option<f64> = None;
    for ms in 0..100u32 {
        let now = f64::from(ms);
        if timer_due.is_some_and(|due| now >= due) {
            timer_due = None;
            if t.on_timer(now) {
                paints.push(now);
            }
        }
        match t.request(now) {
            RedrawDecision::PaintNow => paints.push(now),
            RedrawDecision::Scheduled { delay_ms } => timer_due = Some(now + delay_ms),
            RedrawDecision::Coalesced => {}
        }
    }
    for pair in paints.windows(2) {
        assert!(pair[1] - pair[0] >= 16.0, "paints too close: {pair:?}");
    }
    assert!(paints.len() >= 6);
}
