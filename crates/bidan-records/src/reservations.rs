//! 服务预约与提醒
//!
//! 预约与其提醒在同一事务中写入两个集合。

use bidan_core::{collections, utils, BidanError, Reminder, Reservation, Result, ServiceType};
use bidan_database::{DocumentStore, Filter, WriteOp};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::to_document;

pub const REMINDER_STATUS: &str = "reminder reservasi";

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn DocumentStore>,
}

fn reservation_day(raw: &str, field: &str) -> Result<NaiveDate> {
    utils::parse_date_prefix(raw.trim())
        .map_err(|_| BidanError::validation(field, "must be a date (YYYY-MM-DD)"))
}

/// 预约日当天 UTC 零点的 Unix 秒
fn reminder_timestamp(date: NaiveDate) -> Result<i64> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| BidanError::validation("hariReservasi", "has no midnight"))?;
    Ok(Utc.from_utc_datetime(&midnight).timestamp())
}

impl ReservationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 创建预约及提醒, 返回生成的提醒
    pub async fn create(&self, mut reservation: Reservation) -> Result<Reminder> {
        if reservation.nama.trim().is_empty() {
            return Err(BidanError::required("nama"));
        }
        if reservation.no_hp.trim().is_empty() {
            return Err(BidanError::required("noHP"));
        }

        // 只保存日期部分, 按天查询时精确匹配
        let day = reservation_day(&reservation.hari_reservasi, "hariReservasi")?;
        reservation.hari_reservasi = day.format("%Y-%m-%d").to_string();

        let reminder = Reminder {
            nama: reservation.nama.clone(),
            no_hp: reservation.no_hp.clone(),
            id_layanan: reservation.id_layanan,
            remind_timestamp: reminder_timestamp(day)?,
            status: REMINDER_STATUS.to_string(),
        };

        self.store
            .transaction(vec![
                WriteOp::insert(collections::RESERVATIONS, to_document(&reservation)?),
                WriteOp::insert(collections::REMINDERS, to_document(&reminder)?),
            ])
            .await?;

        info!(
            "Created {} reservation for {} on {}",
            reservation.id_layanan.label(),
            reservation.nama,
            reservation.hari_reservasi
        );
        Ok(reminder)
    }

    /// 某天某项服务的全部预约
    pub async fn list(&self, day: &str, service: ServiceType) -> Result<Vec<Reservation>> {
        let day = reservation_day(day, "tanggal")?.format("%Y-%m-%d").to_string();
        let filter = Filter::and(vec![
            Filter::eq("hariReservasi", day),
            Filter::eq("id_layanan", service.code()),
        ]);
        let documents = self.store.find(collections::RESERVATIONS, &filter).await?;
        documents
            .into_iter()
            .map(|doc| serde_json::from_value(Value::Object(doc)).map_err(BidanError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidan_database::InMemoryStore;

    fn reservation(day: &str, service: ServiceType) -> Reservation {
        Reservation {
            nama: "Siti".to_string(),
            no_hp: "0812".to_string(),
            id_layanan: service,
            hari_reservasi: day.to_string(),
            waktu_tersedia: "09:00".to_string(),
        }
    }

    #[test]
    fn test_reminder_timestamp_is_utc_midnight() {
        let day = reservation_day("2024-03-10", "hariReservasi").unwrap();
        assert_eq!(reminder_timestamp(day).unwrap(), 1_710_028_800);
        assert!(reservation_day("10/03/2024", "hariReservasi").is_err());
    }

    #[tokio::test]
    async fn test_datetime_reservation_is_listed_under_its_day() {
        let store = Arc::new(InMemoryStore::new());
        let reservations = ReservationService::new(store);

        let reminder = reservations
            .create(reservation("2024-03-10T00:00:00.000Z", ServiceType::Pregnancy))
            .await
            .unwrap();
        assert_eq!(reminder.remind_timestamp, 1_710_028_800);

        let found = reservations
            .list("2024-03-10", ServiceType::Pregnancy)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].hari_reservasi, "2024-03-10");
    }

    #[tokio::test]
    async fn test_create_writes_reservation_and_reminder() {
        let store = Arc::new(InMemoryStore::new());
        let reservations = ReservationService::new(store.clone());

        let reminder = reservations
            .create(reservation("2024-03-10", ServiceType::Pregnancy))
            .await
            .unwrap();
        assert_eq!(reminder.status, REMINDER_STATUS);
        assert_eq!(reminder.remind_timestamp, 1_710_028_800);

        assert_eq!(store.count(collections::RESERVATIONS, &Filter::All).await.unwrap(), 1);
        assert_eq!(store.count(collections::REMINDERS, &Filter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_is_all_or_nothing() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_writes_to(collections::REMINDERS).await;
        let reservations = ReservationService::new(store.clone());

        assert!(reservations
            .create(reservation("2024-03-10", ServiceType::Pregnancy))
            .await
            .is_err());
        assert_eq!(store.count(collections::RESERVATIONS, &Filter::All).await.unwrap(), 0);
        assert_eq!(store.count(collections::REMINDERS, &Filter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_day_and_service() {
        let store = Arc::new(InMemoryStore::new());
        let reservations = ReservationService::new(store);
        for (day, service) in [
            ("2024-03-10", ServiceType::Pregnancy),
            ("2024-03-10", ServiceType::Immunization),
            ("2024-03-11", ServiceType::Pregnancy),
        ] {
            reservations.create(reservation(day, service)).await.unwrap();
        }

        let found = reservations
            .list("2024-03-10", ServiceType::Pregnancy)
            .await
            .unwrap();
        assert_eq!(found, vec![reservation("2024-03-10", ServiceType::Pregnancy)]);
    }
}
