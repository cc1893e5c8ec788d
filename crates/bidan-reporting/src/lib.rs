//! # 统计报表模块
//!
//! 跨集合聚合引擎、印尼语日期格式化，以及图表、计数、病史表、就诊日志与导出报表。

pub mod aggregation;
pub mod dates;
pub mod reports;

// 重新导出主要类型
pub use aggregation::{AggregationEngine, VisitSummary};
pub use dates::{format_day_month_year, format_localized_date, localized_date};
pub use reports::{MonthlyCount, PatientHistory, ReportService, VisitCount, VisitLogEntry};
