//! 记录映射器
//!
//! 依据注册表在外部载荷与存储文档之间双向转换。转换是纯函数, 不触及存储。

use bidan_core::path::{self, PathLookup};
use bidan_core::{BidanError, Result, ServiceType};
use bidan_database::Document;
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::{FieldRule, SchemaRegistry};

/// 某一服务类型的映射器
#[derive(Debug, Clone, Copy)]
pub struct RecordMapper {
    service: ServiceType,
    rules: &'static [FieldRule],
}

impl RecordMapper {
    pub fn for_service(service: ServiceType) -> Self {
        Self {
            service,
            rules: SchemaRegistry::rules(service),
        }
    }

    /// 外部载荷 -> 存储文档
    ///
    /// 按规则顺序校验, 遇到第一个违规字段立即失败; 未注册的字段被忽略。
    /// 结果总是包含该服务的子文档 (可能为空对象)。
    pub fn to_storage(&self, payload: &Value) -> Result<Document> {
        if !payload.is_object() {
            return Err(BidanError::validation("data", "must be an object"));
        }

        let mut document = Map::new();
        document.insert(
            self.service.section().to_string(),
            Value::Object(Map::new()),
        );

        for rule in self.rules {
            match path::lookup(payload, rule.external) {
                PathLookup::NotTraversable(prefix) => {
                    return Err(BidanError::validation(prefix, "must be an object"));
                }
                PathLookup::Missing | PathLookup::Found(Value::Null) if rule.required => {
                    return Err(BidanError::required(rule.external));
                }
                PathLookup::Missing => {}
                PathLookup::Found(Value::Null) => {
                    path::set(&mut document, rule.internal, Value::Null);
                }
                PathLookup::Found(value) => {
                    if !rule.kind.accepts(value) {
                        return Err(BidanError::validation(
                            rule.external,
                            format!("must be {}", rule.kind.describe()),
                        ));
                    }
                    if rule.required && value.as_str().is_some_and(|s| s.trim().is_empty()) {
                        return Err(BidanError::validation(rule.external, "must not be empty"));
                    }
                    path::set(&mut document, rule.internal, value.clone());
                }
            }
        }

        debug!(
            "Mapped {} payload into {} storage fields",
            self.service.label(),
            document.len()
        );
        Ok(document)
    }

    /// 存储文档 -> 外部载荷
    ///
    /// 只输出文档中存在的字段, 缺失的可选字段在结果中不出现。
    pub fn to_external(&self, document: &Document) -> Value {
        let mut payload = Map::new();
        for rule in self.rules {
            if let Some(value) = path::get_in(document, rule.internal) {
                path::set(&mut payload, rule.external, value.clone());
            }
        }
        Value::Object(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn family_planning_payload() -> Value {
        json!({
            "generalInformation": {
                "tglDatang": "2024-03-10T08:30:00Z",
                "namaPeserta": "Siti Aminah",
                "noFaskes": "F-001",
                "noSeriKartu": "K-778",
                "statusJkn": "PBI",
                "tglLahir": "1995-04-02",
                "usia": 28,
                "namaPasangan": "Budi",
                "jenisPasangan": "Suami",
                "pendidikanAkhir": "SMA",
                "alamat": "Jl. Melati 3",
                "pekerjaanPasangan": "Petani",
                "noHP": "081234567890"
            },
            "otherInformation": {"caraKBTerakhir": "Pil", "jumlahAnak": 2},
            "skrining": {"anemia": false},
            "hasil": {"layak": true},
            "penapisanKB": {"hamil": "tidak"}
        })
    }

    fn pregnancy_payload() -> Value {
        json!({
            "generalInformation": {
                "tanggalRegister": "2024-01-05",
                "namaLengkap": "Dewi Lestari",
                "tanggalLahir": "1998-07-21",
                "umur": 25,
                "namaSuami": "Agus",
                "pendidikan": "D3",
                "alamatDomisili": "Dusun Krajan",
                "pekerjaan": "Guru",
                "agama": "Islam",
                "desa": "Sukamaju",
                "kabupaten": "Bandung",
                "kecamatan": "Cileunyi",
                "provinsi": "Jawa Barat",
                "rtrw": "01/02",
                "noIbu": "IBU-12"
            },
            "section2": {"noTelp": "0857000111", "golonganDarah": "O"},
            "riwayatKehamilan": {"gravida": 2},
            "skriningTT": {"tt1": "2023-10-01"}
        })
    }

    fn immunization_payload() -> Value {
        json!({
            "generalInformation": {
                "tglDatang": "2024-02-14",
                "namaBayi": "Rafi",
                "namaAyah": "Joko",
                "usiaAyah": 31,
                "namaIbu": "Rina",
                "usiaIbu": 29,
                "puskesmas": "Puskesmas Sehat",
                "bidan": "Bd. Yuni",
                "alamat": "Jl. Kenanga",
                "desa": "Mekar",
                "kecamatan": "Ciparay",
                "kabupaten": "Bandung",
                "provinsi": "Jawa Barat",
                "noHP": "0899111222"
            },
            "detailBayi": {"beratLahir": 3100},
            "imunisasi": {"hb0": "2024-02-15"}
        })
    }

    #[test]
    fn test_round_trip_every_service() {
        let cases = [
            (ServiceType::FamilyPlanning, family_planning_payload()),
            (ServiceType::Pregnancy, pregnancy_payload()),
            (ServiceType::Immunization, immunization_payload()),
        ];
        for (service, payload) in cases {
            let mapper = RecordMapper::for_service(service);
            let stored = mapper.to_storage(&payload).unwrap();
            assert_eq!(mapper.to_external(&stored), payload, "{:?}", service);
        }
    }

    #[test]
    fn test_storage_shape_family_planning() {
        let stored = RecordMapper::for_service(ServiceType::FamilyPlanning)
            .to_storage(&family_planning_payload())
            .unwrap();
        assert_eq!(stored["nama_pasien"], json!("Siti Aminah"));
        assert_eq!(stored["tanggal_register"], json!("2024-03-10T08:30:00Z"));
        assert_eq!(stored["no_hp"], json!("081234567890"));
        assert_eq!(
            stored["data_family_planning"]["informasi_lainnya"]["caraKBTerakhir"],
            json!("Pil")
        );
        assert_eq!(stored["data_family_planning"]["no_faskes"], json!("F-001"));
    }

    #[test]
    fn test_pregnancy_phone_is_promoted() {
        let stored = RecordMapper::for_service(ServiceType::Pregnancy)
            .to_storage(&pregnancy_payload())
            .unwrap();
        assert_eq!(stored["no_hp"], json!("0857000111"));
        assert_eq!(stored["data_pregnancy"]["section2"]["golonganDarah"], json!("O"));
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let mut payload = family_planning_payload();
        payload["generalInformation"]
            .as_object_mut()
            .unwrap()
            .remove("namaPeserta");

        let err = RecordMapper::for_service(ServiceType::FamilyPlanning)
            .to_storage(&payload)
            .unwrap_err();
        match err {
            BidanError::Validation { field, reason } => {
                assert_eq!(field, "generalInformation.namaPeserta");
                assert_eq!(reason, "is required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_fails_fast() {
        let mut payload = immunization_payload();
        payload["detailBayi"] = json!("not an object");
        payload["generalInformation"]["usiaIbu"] = json!("dua puluh");

        let err = RecordMapper::for_service(ServiceType::Immunization)
            .to_storage(&payload)
            .unwrap_err();
        // 规则顺序中 usiaIbu 在 detailBayi 之前
        assert_eq!(err.to_string(), "generalInformation.usiaIbu must be a number");
    }

    #[test]
    fn test_non_object_group_is_rejected() {
        let payload = json!({"generalInformation": "Siti"});
        let err = RecordMapper::for_service(ServiceType::Pregnancy)
            .to_storage(&payload)
            .unwrap_err();
        assert_eq!(err.to_string(), "generalInformation must be an object");

        let err = RecordMapper::for_service(ServiceType::Pregnancy)
            .to_storage(&json!([1, 2]))
            .unwrap_err();
        assert_eq!(err.to_string(), "data must be an object");
    }

    #[test]
    fn test_blank_required_value_is_rejected() {
        let mut payload = pregnancy_payload();
        payload["generalInformation"]["namaLengkap"] = json!("   ");
        let err = RecordMapper::for_service(ServiceType::Pregnancy)
            .to_storage(&payload)
            .unwrap_err();
        assert_eq!(err.to_string(), "generalInformation.namaLengkap must not be empty");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut payload = immunization_payload();
        payload["generalInformation"]["hobi"] = json!("tidur");
        payload["extra"] = json!({"x": 1});

        let mapper = RecordMapper::for_service(ServiceType::Immunization);
        let stored = mapper.to_storage(&payload).unwrap();
        assert!(!stored.contains_key("extra"));
        assert_eq!(mapper.to_external(&stored), immunization_payload());
    }

    #[test]
    fn test_optional_null_survives_round_trip() {
        let mut payload = family_planning_payload();
        payload["generalInformation"]["noHP"] = Value::Null;
        payload["hasil"] = Value::Null;

        let mapper = RecordMapper::for_service(ServiceType::FamilyPlanning);
        let stored = mapper.to_storage(&payload).unwrap();
        assert_eq!(stored["no_hp"], Value::Null);
        assert_eq!(mapper.to_external(&stored), payload);
    }

    #[test]
    fn test_section_always_created() {
        let payload = json!({
            "generalInformation": {"tglDatang": "2024-02-14", "namaBayi": "Rafi"}
        });
        let stored = RecordMapper::for_service(ServiceType::Immunization)
            .to_storage(&payload)
            .unwrap();
        assert_eq!(stored["data_immunization"], json!({}));
    }

    #[test]
    fn test_to_external_tolerates_sparse_documents() {
        let mut document = Document::new();
        document.insert("nama_pasien".to_string(), json!("Lama"));
        document.insert("data_pregnancy".to_string(), json!("corrupted"));

        let external = RecordMapper::for_service(ServiceType::Pregnancy).to_external(&document);
        assert_eq!(external, json!({"generalInformation": {"namaLengkap": "Lama"}}));
    }
}
