use crate::sim::{SimTime, TimeParseError};

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn parse_accepts_all_unit_suffixes() {
    assert_eq!(SimTime::parse("500ns"), Ok(SimTime(500)));
    assert_eq!(SimTime::parse("10us"), Ok(SimTime(10_000)));
    assert_eq!(SimTime::parse("10µs"), Ok(SimTime(10_000)));
    assert_eq!(SimTime::parse("5ms"), Ok(SimTime(5_000_000)));
    assert_eq!(SimTime::parse("2s"), Ok(SimTime(2_000_000_000)));
    assert_eq!(SimTime::parse(" 7ms "), Ok(SimTime(7_000_000)));
}

#[test]
fn parse_rejects_malformed_tokens() {
    assert_eq!(SimTime::parse(""), Err(TimeParseError::Empty));
    assert_eq!(SimTime::parse("   "), Err(TimeParseError::Empty));
    assert_eq!(
        SimTime::parse("5"),
        Err(TimeParseError::BadUnit(String::new()))
    );
    assert_eq!(
        SimTime::parse("5m"),
        Err(TimeParseError::BadUnit("m".to_string()))
    );
    assert_eq!(
        SimTime::parse("xs"),
        Err(TimeParseError::BadNumber(String::new()))
    );
    assert_eq!(
        SimTime::parse("-5ms"),
        Err(TimeParseError::BadNumber(String::new()))
    );
}

#[test]
fn display_formats_nanoseconds() {
    assert_eq!(SimTime(1500).to_string(), "1500ns");
}
