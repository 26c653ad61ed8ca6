// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    dotted     = { "15.04.2026" },
    slashed    = { "15/04/2026" },
    iso        = { "2026-04-15" },
    verbose    = { "15th of April 2026" },
    no_of      = { "15 April 2026" },
)]
fn parse_client_date_accepts_all_formats(input: &str) {
    let expected = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
    assert_eq!(parse_client_date(input), Some(expected), "{input}");
}

#[test]
fn two_digit_year_resolves_to_2000s() {
    assert_eq!(
        parse_ddmmyyyy("15.04.26"),
        NaiveDate::from_ymd_opt(2026, 4, 15)
    );
}

#[test]
fn invalid_date_is_rejected() {
    assert_eq!(parse_ddmmyyyy("32.13.2026"), None);
    assert_eq!(parse_client_date("not a date"), None);
}

#[test]
fn find_dates_in_prose() {
    let found = find_dates("We'd like Room A on 15.04.2026, or failing that 2026-04-22.");
    assert_eq!(
        found,
        vec![
            NaiveDate::from_ymd_opt(2026, 4, 15).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 22).unwrap(),
        ]
    );
}

#[test]
fn round_trip_ddmmyyyy() {
    let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
    assert_eq!(to_ddmmyyyy(date), "03.02.2026");
    assert_eq!(parse_ddmmyyyy("03.02.2026"), Some(date));
}

#[yare::parameterized(
    iso_with_time = { "2026-01-20 at 10:00", Some("2026-01-20"), Some("10:00") },
    dotted        = { "20.01.2026 at 10:00", Some("2026-01-20"), Some("10:00") },
    bare_iso      = { "2026-01-20", Some("2026-01-20"), None },
    garbage       = { "whenever", None, None },
)]
fn parse_slot_formats(input: &str, date: Option<&str>, time: Option<&str>) {
    let (d, t) = parse_slot(input);
    assert_eq!(d.as_deref(), date);
    assert_eq!(t.as_deref(), time);
}

#[yare::parameterized(
    small    = { 950.0, "CHF 950.00" },
    thousand = { 1234.5, "CHF 1'234.50" },
    million  = { 1_000_000.0, "CHF 1'000'000.00" },
)]
fn chf_formatting(amount: f64, expected: &str) {
    assert_eq!(format_chf(amount), expected);
}

#[test]
fn date_aliases_cover_verbalizer_formats() {
    let aliases = date_aliases(NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
    assert!(aliases.contains(&"15.02.2026".to_string()));
    assert!(aliases.contains(&"2026-02-15".to_string()));
    assert!(aliases.contains(&"15th of February 2026".to_string()));
}

#[test]
fn day_month_without_year_is_found() {
    assert_eq!(find_day_month("Would the 15.06. work for you?"), Some((15, 6)));
    assert_eq!(find_day_month("Maybe on 3.9"), Some((3, 9)));
    // Full dates are not re-read as day.month
    assert_eq!(find_day_month("We confirm 15.06.2026"), None);
    // Out-of-range pairs are rejected
    assert_eq!(find_day_month("version 12.99 is out"), None);
}

#[test]
fn day_month_rolls_over_past_dates() {
    let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    assert_eq!(
        resolve_day_month(15, 4, 2026, today),
        NaiveDate::from_ymd_opt(2027, 4, 15)
    );
    assert_eq!(
        resolve_day_month(15, 8, 2026, today),
        NaiveDate::from_ymd_opt(2026, 8, 15)
    );
}

#[test]
fn iso_to_ddmmyyyy_passthrough() {
    assert_eq!(iso_to_ddmmyyyy("2026-05-12"), "12.05.2026");
    assert_eq!(iso_to_ddmmyyyy("12.05.2026"), "12.05.2026");
}
