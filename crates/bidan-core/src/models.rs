//! 核心数据模型定义

use chrono::{Datelike, Days, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{BidanError, Result};

/// 存储集合名称
pub mod collections {
    pub const PATIENTS: &str = "patients";
    pub const VISITS_FAMILY_PLANNING: &str = "visits_family_planning";
    pub const VISITS_PREGNANCY: &str = "visits_pregnancy";
    pub const VISITS_IMMUNIZATION: &str = "visits_immunization";
    pub const MIDWIVES: &str = "midwives";
    pub const RESERVATIONS: &str = "reservations";
    pub const REMINDERS: &str = "reminders";
    pub const ID_COUNTERS: &str = "id_counters";
}

/// 存储文档中的公共字段名
pub mod fields {
    pub const DOCUMENT_ID: &str = "_id";
    pub const PATIENT_ID: &str = "id_pasien";
    pub const BABY_NUMBER: &str = "no_bayi";
    pub const PATIENT_NAME: &str = "nama_pasien";
    pub const PHONE: &str = "no_hp";
    pub const REGISTERED_AT: &str = "tanggal_register";
    /// 就诊记录的统一日期字段
    pub const VISIT_DATE: &str = "tglDatang";
}

/// 服务类型
///
/// 线路上统一使用从0开始的整数编码: 0=计划生育, 1=孕期, 2=免疫。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    FamilyPlanning,
    Pregnancy,
    Immunization,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::FamilyPlanning,
        ServiceType::Pregnancy,
        ServiceType::Immunization,
    ];

    pub fn code(self) -> u8 {
        match self {
            ServiceType::FamilyPlanning => 0,
            ServiceType::Pregnancy => 1,
            ServiceType::Immunization => 2,
        }
    }

    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(ServiceType::FamilyPlanning),
            1 => Ok(ServiceType::Pregnancy),
            2 => Ok(ServiceType::Immunization),
            _ => Err(BidanError::validation(
                "id_layanan",
                format!("must be 0, 1 or 2 (got {})", code),
            )),
        }
    }

    /// 患者文档中该服务的子文档键
    pub fn section(self) -> &'static str {
        match self {
            ServiceType::FamilyPlanning => "data_family_planning",
            ServiceType::Pregnancy => "data_pregnancy",
            ServiceType::Immunization => "data_immunization",
        }
    }

    /// 就诊记录集合
    pub fn visit_collection(self) -> &'static str {
        match self {
            ServiceType::FamilyPlanning => collections::VISITS_FAMILY_PLANNING,
            ServiceType::Pregnancy => collections::VISITS_PREGNANCY,
            ServiceType::Immunization => collections::VISITS_IMMUNIZATION,
        }
    }

    /// 面向用户的服务名称
    pub fn label(self) -> &'static str {
        match self {
            ServiceType::FamilyPlanning => "KB",
            ServiceType::Pregnancy => "Kehamilan",
            ServiceType::Immunization => "Imunisasi",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ServiceType {
    type Err = BidanError;

    fn from_str(raw: &str) -> Result<Self> {
        let code = raw.trim().parse::<u64>().map_err(|_| {
            BidanError::validation("id_layanan", format!("must be an integer (got {:?})", raw))
        })?;
        Self::from_code(code)
    }
}

impl Serialize for ServiceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ServiceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ServiceTypeVisitor;

        impl<'de> de::Visitor<'de> for ServiceTypeVisitor {
            type Value = ServiceType;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a service type code (0, 1 or 2)")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ServiceType, E> {
                ServiceType::from_code(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ServiceType, E> {
                let code = u64::try_from(v).map_err(|_| E::custom("id_layanan must not be negative"))?;
                self.visit_u64(code)
            }

            // 前端以 JSON number 发送, 可能带小数部分 0
            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<ServiceType, E> {
                if v.fract() != 0.0 || v < 0.0 {
                    return Err(E::custom(format!("id_layanan must be an integer (got {})", v)));
                }
                self.visit_u64(v as u64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ServiceType, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ServiceTypeVisitor)
    }
}

/// 闭区间日期范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(BidanError::validation("date.from", "must not be after date.to"));
        }
        Ok(Self { from, to })
    }

    /// 整个自然年
    pub fn year(year: i32) -> Result<Self> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| BidanError::validation("year", format!("{} is out of range", year)))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| BidanError::validation("year", format!("{} is out of range", year)))?;
        Self::new(from, to)
    }

    /// 包含给定日期的自然月
    pub fn month_of(date: NaiveDate) -> Self {
        let from = date.with_day(1).unwrap_or(date);
        let to = from
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date);
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// 下界, 格式 `YYYY-MM-DD`, 包含
    pub fn lower_bound(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// 上界, 为结束日期的次日, 不包含; 适用于带时间的 ISO 字符串的字典序比较
    pub fn upper_bound_exclusive(&self) -> String {
        self.to
            .checked_add_days(Days::new(1))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "9999-12-32".to_string())
    }
}

/// 助产士账户 (存储形态, 含密码哈希)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidwifeAccount {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub password: String,
}

fn default_role() -> String {
    "bidan".to_string()
}

/// 助产士资料 (不含敏感数据)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidwifeProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: String,
}

impl From<MidwifeAccount> for MidwifeProfile {
    fn from(account: MidwifeAccount) -> Self {
        MidwifeProfile {
            id: account.id,
            username: account.username,
            full_name: account.full_name,
            phone_number: account.phone_number,
            role: account.role,
        }
    }
}

/// 服务预约
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub nama: String,
    #[serde(rename = "noHP")]
    pub no_hp: String,
    pub id_layanan: ServiceType,
    /// 预约日期, `YYYY-MM-DD`
    #[serde(rename = "hariReservasi")]
    pub hari_reservasi: String,
    #[serde(rename = "waktuTersedia")]
    pub waktu_tersedia: String,
}

/// 与预约同时创建的提醒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub nama: String,
    #[serde(rename = "noHP")]
    pub no_hp: String,
    pub id_layanan: ServiceType,
    /// 触发时间 (Unix 秒)
    pub remind_timestamp: i64,
    pub status: String,
}
