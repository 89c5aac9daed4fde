#[test]
fn poll_schedule_fires_once_per_second() {
    let interval = std::time::Duration::from_secs(1);
    let start = std::time::Instant::now();
    let mut next_poll = start + interval;
    let mut polls = 0;

    // Simulate three seconds of frame ticks at ~50 ms.
    let mut now = start;
    while now < start + std::time::Duration::from_secs(3) {
        if now >= next_poll {
            polls += 1;
            next_poll = now + interval;
        }
        now += std::time::Duration::from_millis(50);
    }

    assert_eq!(polls, 2, "the poll did not fire once per elapsed second");
}
