use printcomm_backup::{SchedulerError, parse_schedule};
use std::time::Duration;

#[test]
fn every_and_bare_durations() {
    assert_eq!(parse_schedule("@every 6h").unwrap(), Duration::from_secs(6 * 3600));
    assert_eq!(parse_schedule("@every 90s").unwrap(), Duration::from_secs(90));
    assert_eq!(parse_schedule("@EVERY 1h 30m").unwrap(), Duration::from_secs(5400));
    assert_eq!(parse_schedule(" 30m ").unwrap(), Duration::from_secs(1800));
    assert_eq!(parse_schedule("250ms").unwrap(), Duration::from_millis(250));
}

#[test]
fn descriptors() {
    assert_eq!(parse_schedule("@hourly").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_schedule("@daily").unwrap(), Duration::from_secs(86_400));
    assert_eq!(parse_schedule("@midnight").unwrap(), Duration::from_secs(86_400));
    assert_eq!(parse_schedule("@weekly").unwrap(), Duration::from_secs(7 * 86_400));
}

#[test]
fn invalid_expressions_are_rejected() {
    for expr in ["", "@every", "@every 0s", "0m", "@yearly", "tomorrow", "*/5 * * * *"] {
        let err = parse_schedule(expr).unwrap_err();
        assert!(
            matches!(err, SchedulerError::InvalidSchedule { .. }),
            "{expr}: {err}"
        );
    }
}
