//! 印尼语日期格式化
//!
//! 星期表以星期日为首。

use bidan_core::{utils, Result};
use chrono::{Datelike, NaiveDate};

const WEEKDAYS: [&str; 7] = [
    "Minggu", "Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu",
];

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// 图表使用的月份缩写
const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// `<星期>, <日> <月> <年>`, 例如 `Minggu, 10 Maret 2024`
pub fn localized_date(date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_sunday() as usize];
    let month = MONTHS[date.month0() as usize];
    format!("{}, {} {} {}", weekday, date.day(), month, date.year())
}

/// 解析 ISO 日期 (可带时间部分) 并格式化; 无法解析时返回 `DateFormat` 错误
pub fn format_localized_date(iso_date: &str) -> Result<String> {
    utils::parse_date_prefix(iso_date).map(localized_date)
}

/// `dd-mm-yyyy`
pub fn format_day_month_year(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// 月份 (1..=12) 的缩写
pub fn short_month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|index| SHORT_MONTHS.get(index as usize))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidan_core::BidanError;

    #[test]
    fn test_reference_date() {
        assert_eq!(
            format_localized_date("2024-03-10").unwrap(),
            "Minggu, 10 Maret 2024"
        );
    }

    #[test]
    fn test_every_weekday_name() {
        // 2024-03-10 为星期日
        let expected = WEEKDAYS;
        for (offset, name) in expected.iter().enumerate() {
            let date = NaiveDate::from_ymd_opt(2024, 3, 10 + offset as u32).unwrap();
            assert!(localized_date(date).starts_with(name), "{}", date);
        }
    }

    #[test]
    fn test_datetime_input_and_month_names() {
        assert_eq!(
            format_localized_date("2023-12-25T10:00:00.000Z").unwrap(),
            "Senin, 25 Desember 2023"
        );
        assert_eq!(
            format_localized_date("2024-08-17").unwrap(),
            "Sabtu, 17 Agustus 2024"
        );
    }

    #[test]
    fn test_unparseable_date_is_an_error() {
        for bad in ["", "kemarin", "2024-02-30", "10-03-2024"] {
            assert!(matches!(
                format_localized_date(bad),
                Err(BidanError::DateFormat(_))
            ));
        }
    }

    #[test]
    fn test_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_day_month_year(date), "05-03-2024");
    }

    #[test]
    fn test_short_month_name_bounds() {
        assert_eq!(short_month_name(1), Some("Jan"));
        assert_eq!(short_month_name(12), Some("Dec"));
        assert_eq!(short_month_name(0), None);
        assert_eq!(short_month_name(13), None);
    }
}
