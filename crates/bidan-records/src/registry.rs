//! 字段映射注册表
//!
//! 每种服务类型声明一次外部 (API, camelCase) 路径与内部 (存储, snake_case) 路径的对应关系。
//! 新增字段只需增加一条规则。

use bidan_core::ServiceType;
use serde_json::Value;

/// 字段值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    NestedObject,
    /// 任意 JSON 值, 原样保存
    Passthrough,
}

impl FieldKind {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::NestedObject => value.is_object(),
            FieldKind::Passthrough => true,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::NestedObject => "an object",
            FieldKind::Passthrough => "any value",
        }
    }
}

/// 单条映射规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub external: &'static str,
    pub internal: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

const fn required(external: &'static str, internal: &'static str) -> FieldRule {
    FieldRule {
        external,
        internal,
        required: true,
        kind: FieldKind::String,
    }
}

const fn text(external: &'static str, internal: &'static str) -> FieldRule {
    FieldRule {
        external,
        internal,
        required: false,
        kind: FieldKind::String,
    }
}

const fn number(external: &'static str, internal: &'static str) -> FieldRule {
    FieldRule {
        external,
        internal,
        required: false,
        kind: FieldKind::Number,
    }
}

const fn group(external: &'static str, internal: &'static str) -> FieldRule {
    FieldRule {
        external,
        internal,
        required: false,
        kind: FieldKind::NestedObject,
    }
}

const fn any(external: &'static str, internal: &'static str) -> FieldRule {
    FieldRule {
        external,
        internal,
        required: false,
        kind: FieldKind::Passthrough,
    }
}

static FAMILY_PLANNING: &[FieldRule] = &[
    required("generalInformation.tglDatang", "tanggal_register"),
    required("generalInformation.namaPeserta", "nama_pasien"),
    text("generalInformation.noFaskes", "data_family_planning.no_faskes"),
    text("generalInformation.noSeriKartu", "data_family_planning.no_seri_kartu"),
    text("generalInformation.statusJkn", "data_family_planning.status_jkn"),
    text("generalInformation.tglLahir", "tanggal_lahir"),
    number("generalInformation.usia", "umur"),
    text("generalInformation.namaPasangan", "nama_pasangan"),
    text("generalInformation.jenisPasangan", "jenis_pasangan"),
    text("generalInformation.pendidikanAkhir", "pendidikan"),
    text("generalInformation.alamat", "alamat"),
    text("generalInformation.pekerjaanPasangan", "pekerjaan_pasangan"),
    text("generalInformation.noHP", "no_hp"),
    group("otherInformation", "data_family_planning.informasi_lainnya"),
    group("skrining", "data_family_planning.skrining"),
    group("hasil", "data_family_planning.hasil"),
    group("penapisanKB", "data_family_planning.penapisan_kb"),
];

static PREGNANCY: &[FieldRule] = &[
    required("generalInformation.tanggalRegister", "tanggal_register"),
    required("generalInformation.namaLengkap", "nama_pasien"),
    text("generalInformation.tanggalLahir", "tanggal_lahir"),
    number("generalInformation.umur", "umur"),
    text("generalInformation.namaSuami", "nama_pasangan"),
    text("generalInformation.jenisPasangan", "jenis_pasangan"),
    text("generalInformation.pendidikan", "pendidikan"),
    text("generalInformation.alamatDomisili", "alamat"),
    text("generalInformation.pekerjaanPasangan", "pekerjaan_pasangan"),
    text("generalInformation.pekerjaan", "data_pregnancy.pekerjaan"),
    text("generalInformation.agama", "data_pregnancy.agama"),
    text("generalInformation.desa", "data_pregnancy.desa"),
    text("generalInformation.kabupaten", "data_pregnancy.kabupaten"),
    text("generalInformation.kecamatan", "data_pregnancy.kecamatan"),
    text("generalInformation.provinsi", "data_pregnancy.provinsi"),
    text("generalInformation.rtrw", "data_pregnancy.rtrw"),
    any("generalInformation.noIbu", "data_pregnancy.no_ibu"),
    text("generalInformation.statusJkn", "data_pregnancy.status_jkn"),
    text("generalInformation.noFaskes", "data_pregnancy.no_faskes"),
    text("generalInformation.noSeriKartu", "data_pregnancy.no_seri_kartu"),
    // 整组在前, 其中的电话号码随后单独提升到顶层
    group("section2", "data_pregnancy.section2"),
    text("section2.noTelp", "no_hp"),
    group("kunjunganNifas", "data_pregnancy.kunjungan_nifas"),
    group(
        "mendeteksiFaktorResikoDanResikoTinggi",
        "data_pregnancy.faktor_resiko_resiko_tinggi",
    ),
    group("pemeriksaanPNC", "data_pregnancy.pemeriksaan_pnc"),
    group("persalinan", "data_pregnancy.persalinan"),
    group("rencanaPersalinan", "data_pregnancy.rencana_persalinan"),
    group("riwayatKehamilan", "data_pregnancy.riwayat_kehamilan"),
    group("skriningTT", "data_pregnancy.skrining_tt"),
];

static IMMUNIZATION: &[FieldRule] = &[
    required("generalInformation.tglDatang", "tanggal_register"),
    required("generalInformation.namaBayi", "nama_pasien"),
    any("generalInformation.nomorBayi", "nomor_bayi"),
    any("generalInformation.nomor", "nomor"),
    text("generalInformation.namaAyah", "nama_ayah"),
    number("generalInformation.usiaAyah", "umur_ayah"),
    text("generalInformation.namaIbu", "nama_ibu"),
    number("generalInformation.usiaIbu", "umur_ibu"),
    text("generalInformation.puskesmas", "puskesmas"),
    text("generalInformation.bidan", "bidan"),
    text("generalInformation.alamat", "alamat"),
    text("generalInformation.desa", "desa"),
    text("generalInformation.kecamatan", "kecamatan"),
    text("generalInformation.kabupaten", "kabupaten"),
    text("generalInformation.provinsi", "provinsi"),
    text("generalInformation.noHP", "no_hp"),
    group("detailBayi", "data_immunization.detail_bayi"),
    group("pemeriksaanNeonatus", "data_immunization.pemeriksaan_neonatus"),
    group(
        "pemeriksaanNeonatusLanjutan",
        "data_immunization.pemeriksaan_neonatus_lanjutan",
    ),
    group("pemeriksaanBalita", "data_immunization.pemeriksaan_balita"),
    group(
        "pelayananKlinisTumbuhKembang",
        "data_immunization.pelayanan_klinis_tumbuh_kembang",
    ),
    group("pemberianVitaminA", "data_immunization.pemberian_vitamin_a"),
    group("imunisasi", "data_immunization.imunisasi"),
];

/// 映射注册表
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// 按声明顺序返回服务类型的全部规则
    pub fn rules(service: ServiceType) -> &'static [FieldRule] {
        match service {
            ServiceType::FamilyPlanning => FAMILY_PLANNING,
            ServiceType::Pregnancy => PREGNANCY,
            ServiceType::Immunization => IMMUNIZATION,
        }
    }

    pub fn required_fields(service: ServiceType) -> impl Iterator<Item = &'static FieldRule> {
        Self::rules(service).iter().filter(|rule| rule.required)
    }

    pub fn by_external(service: ServiceType, external: &str) -> Option<&'static FieldRule> {
        Self::rules(service).iter().find(|rule| rule.external == external)
    }
}
