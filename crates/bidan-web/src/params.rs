//! 查询参数解析

use bidan_core::{utils, BidanError, DateRange, Result, ServiceType};
use chrono::NaiveDate;

/// 必填参数
pub fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BidanError::required(field))
}

pub fn service(value: &Option<String>) -> Result<ServiceType> {
    required(value, "id_layanan")?.parse()
}

/// 可选的服务类型, 缺省表示全部服务
pub fn optional_service(value: &Option<String>) -> Result<Option<ServiceType>> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map(Some),
        None => Ok(None),
    }
}

pub fn patient_id(value: &Option<String>) -> Result<u64> {
    utils::parse_patient_id_text(required(value, "id_pasien")?, "id_pasien")
}

/// `[1,2,3]` 或 `1,2,3`
pub fn patient_id_list(value: &Option<String>) -> Result<Vec<u64>> {
    let raw = required(value, "id_pasien")?;
    let inner = raw
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(raw);

    let ids = inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| utils::parse_patient_id_text(part, "id_pasien"))
        .collect::<Result<Vec<_>>>()?;
    if ids.is_empty() {
        return Err(BidanError::validation("id_pasien", "must list at least one id"));
    }
    Ok(ids)
}

pub fn date(raw: &str, field: &str) -> Result<NaiveDate> {
    utils::parse_date_prefix(raw)
        .map_err(|_| BidanError::validation(field, "must be a date (YYYY-MM-DD)"))
}

/// 成对出现的起止日期; 都缺省时返回 None
pub fn optional_range(from: &Option<String>, to: &Option<String>) -> Result<Option<DateRange>> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    match (present(from), present(to)) {
        (false, false) => Ok(None),
        _ => {
            let from = date(required(from, "from")?, "from")?;
            let to = date(required(to, "to")?, "to")?;
            DateRange::new(from, to).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_patient_id_list_formats() {
        assert_eq!(patient_id_list(&some("[1,2, 3]")).unwrap(), vec![1, 2, 3]);
        assert_eq!(patient_id_list(&some("7")).unwrap(), vec![7]);
        assert!(patient_id_list(&some("[]")).is_err());
        assert!(patient_id_list(&some("[1,x]")).is_err());
        assert!(patient_id_list(&None).is_err());
    }

    #[test]
    fn test_service_params() {
        assert_eq!(service(&some("2")).unwrap(), ServiceType::Immunization);
        assert!(service(&some("3")).is_err());
        assert!(service(&None).is_err());
        assert_eq!(optional_service(&None).unwrap(), None);
        assert_eq!(optional_service(&some("")).unwrap(), None);
    }

    #[test]
    fn test_optional_range() {
        assert_eq!(optional_range(&None, &None).unwrap(), None);
        let range = optional_range(&some("2024-01-01"), &some("2024-01-31"))
            .unwrap()
            .unwrap();
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert!(optional_range(&some("2024-01-01"), &None).is_err());
        assert!(optional_range(&some("2024-02-01"), &some("2024-01-01")).is_err());
    }
}
