use chrono::NaiveDate;

const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Dates repeat after this many days.
pub const DATE_CYCLE_DAYS: u64 = 36_835;
pub const EPOCH_YEAR: i32 = 1900;

/// Maps a dense key to a calendar date using 365-day years.
pub fn synth_date(dense_key: u64) -> NaiveDate {
    let offset = dense_key % DATE_CYCLE_DAYS;
    let year = EPOCH_YEAR + (offset / 365) as i32;
    let mut day = (offset % 365) as u32;
    let mut month = 0;
    while day >= MONTH_DAYS[month] {
        day -= MONTH_DAYS[month];
        month += 1;
    }
    // Feb 29 is never produced, so every (year, month, day) is valid.
    NaiveDate::from_ymd_opt(year, month as u32 + 1, day + 1).unwrap_or(NaiveDate::MIN)
}

pub fn format_date(dense_key: u64) -> String {
    synth_date(dense_key).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "1900-01-01")]
    #[case(31, "1900-02-01")]
    #[case(58, "1900-02-28")]
    #[case(59, "1900-03-01")]
    #[case(364, "1900-12-31")]
    #[case(365, "1901-01-01")]
    #[case(1000, "1902-09-28")]
    #[case(DATE_CYCLE_DAYS, "1900-01-01")]
    fn dates_follow_month_table(#[case] key: u64, #[case] expected: &str) {
        assert_eq!(format_date(key), expected);
    }

    #[test]
    fn whole_cycle_is_valid_and_fits_column() {
        for key in 0..DATE_CYCLE_DAYS {
            let d = format_date(key);
            assert!(d.len() <= 20);
        }
    }
}
