// src/models/installation.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::Role;

// --- Enums de Status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "delivery_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Delivered,
    #[default]
    Pending,
    #[serde(rename = "In Transit")]
    InTransit,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [Self::Delivered, Self::Pending, Self::InTransit];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered => "Delivered",
            Self::Pending => "Pending",
            Self::InTransit => "In Transit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "installation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallationStatus {
    Installed,
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
}

impl InstallationStatus {
    pub const ALL: [InstallationStatus; 3] = [Self::Installed, Self::Pending, Self::InProgress];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Installed => "Installed",
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "priority_level", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

// Soft delete: a linha nunca é apagada, só muda de estado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "record_state", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Active,
    Deleted,
}

// --- Slots de Anexo ---

/// Os 9 slots de arquivo de uma instalação. O nome serializado é a coluna do banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSlot {
    DeliveryReport,
    InstallationReport,
    BelarcReport,
    BackSidePhoto,
    OsInstallPhoto,
    KeyboardPhoto,
    MousePhoto,
    Screenshot,
    EvidenceFile,
}

impl AttachmentSlot {
    pub const ALL: [AttachmentSlot; 9] = [
        Self::DeliveryReport,
        Self::InstallationReport,
        Self::BelarcReport,
        Self::BackSidePhoto,
        Self::OsInstallPhoto,
        Self::KeyboardPhoto,
        Self::MousePhoto,
        Self::Screenshot,
        Self::EvidenceFile,
    ];

    /// Nome da coluna (e do campo no formulário multipart).
    pub fn column(&self) -> &'static str {
        match self {
            Self::DeliveryReport => "delivery_report",
            Self::InstallationReport => "installation_report",
            Self::BelarcReport => "belarc_report",
            Self::BackSidePhoto => "back_side_photo",
            Self::OsInstallPhoto => "os_install_photo",
            Self::KeyboardPhoto => "keyboard_photo",
            Self::MousePhoto => "mouse_photo",
            Self::Screenshot => "screenshot",
            Self::EvidenceFile => "evidence_file",
        }
    }

    /// Rótulo legível, usado como nome de arquivo nos downloads e no ZIP.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeliveryReport => "Delivery Report",
            Self::InstallationReport => "Installation Report",
            Self::BelarcReport => "Belarc Report",
            Self::BackSidePhoto => "Back Side Photo",
            Self::OsInstallPhoto => "OS Installation Photo",
            Self::KeyboardPhoto => "Keyboard Photo",
            Self::MousePhoto => "Mouse Photo",
            Self::Screenshot => "Screenshot",
            Self::EvidenceFile => "Evidence File",
        }
    }
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSlot(pub String);

impl FromStr for AttachmentSlot {
    type Err = UnknownSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.column() == s)
            .ok_or_else(|| UnknownSlot(s.to_string()))
    }
}

// --- Entidade Principal ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub id: Uuid,
    #[schema(example = "DC-2025-0042")]
    pub sr_no: String,

    // Localização
    #[schema(example = "North")]
    pub region: String,
    #[schema(example = "Pune")]
    pub district: String,
    #[schema(example = "Haveli")]
    pub tahsil: String,
    #[schema(example = "411001")]
    pub pin_code: String,
    pub address: String,

    // Contato
    pub receiver_name: String,
    #[schema(example = "9876543210")]
    pub contact_number: String,
    pub alternate_contact_number: Option<String>,

    pub delivery_status: DeliveryStatus,
    pub installation_status: InstallationStatus,
    pub priority: Priority,

    pub dispatch_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub installation_date: Option<NaiveDate>,

    pub cpu_serial: Option<String>,
    pub monitor_serial: Option<String>,
    pub ups_serial: Option<String>,
    pub keyboard_serial: Option<String>,
    pub mouse_serial: Option<String>,

    pub vendor_name: Option<String>,
    pub installer_name: Option<String>,
    pub installer_contact: Option<String>,
    pub assigned_technician: Option<String>,
    pub installation_charges: Option<Decimal>,
    pub remarks: Option<String>,
    pub notes: Option<String>,

    // Confirmação física do documento/foto, NÃO indica upload
    pub delivery_report_received: bool,
    pub installation_report_received: bool,
    pub belarc_report_received: bool,
    pub back_side_photo_taken: bool,
    pub os_install_photo_taken: bool,
    pub keyboard_photo_taken: bool,
    pub mouse_photo_taken: bool,
    pub screenshot_taken: bool,

    // Chaves relativas no BlobStore
    pub delivery_report: Option<String>,
    pub installation_report: Option<String>,
    pub belarc_report: Option<String>,
    pub back_side_photo: Option<String>,
    pub os_install_photo: Option<String>,
    pub keyboard_photo: Option<String>,
    pub mouse_photo: Option<String>,
    pub screenshot: Option<String>,
    pub evidence_file: Option<String>,

    pub created_by: String,
    pub updated_by: Option<String>,
    pub record_state: RecordState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Installation {
    pub fn slot_key(&self, slot: AttachmentSlot) -> Option<&str> {
        let key = match slot {
            AttachmentSlot::DeliveryReport => &self.delivery_report,
            AttachmentSlot::InstallationReport => &self.installation_report,
            AttachmentSlot::BelarcReport => &self.belarc_report,
            AttachmentSlot::BackSidePhoto => &self.back_side_photo,
            AttachmentSlot::OsInstallPhoto => &self.os_install_photo,
            AttachmentSlot::KeyboardPhoto => &self.keyboard_photo,
            AttachmentSlot::MousePhoto => &self.mouse_photo,
            AttachmentSlot::Screenshot => &self.screenshot,
            AttachmentSlot::EvidenceFile => &self.evidence_file,
        };
        key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn has_attachment(&self, slot: AttachmentSlot) -> bool {
        self.slot_key(slot).is_some()
    }

    /// Slots preenchidos, na ordem canônica.
    pub fn attachments(&self) -> Vec<(AttachmentSlot, &str)> {
        AttachmentSlot::ALL
            .into_iter()
            .filter_map(|slot| self.slot_key(slot).map(|key| (slot, key)))
            .collect()
    }

    /// Os 8 flags de confirmação física, com o rótulo usado nos resumos.
    pub fn document_flags(&self) -> [(&'static str, bool); 8] {
        [
            ("Delivery Report Received", self.delivery_report_received),
            ("Installation Report Received", self.installation_report_received),
            ("Belarc Report Received", self.belarc_report_received),
            ("Back Side Photo Taken", self.back_side_photo_taken),
            ("OS Install Photo Taken", self.os_install_photo_taken),
            ("Keyboard Photo Taken", self.keyboard_photo_taken),
            ("Mouse Photo Taken", self.mouse_photo_taken),
            ("Screenshot Taken", self.screenshot_taken),
        ]
    }

    /// Percentual derivado (nunca persistido): 8 flags + entregue + instalado.
    pub fn completion_percentage(&self) -> u8 {
        let mut done = self.document_flags().iter().filter(|(_, v)| *v).count();
        if self.delivery_status == DeliveryStatus::Delivered {
            done += 1;
        }
        if self.installation_status == InstallationStatus::Installed {
            done += 1;
        }
        ((done * 100) / 10) as u8
    }

    /// Vencido: entregue há 7 dias ou mais e instalação ainda pendente.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.installation_status == InstallationStatus::Pending
            && self
                .delivery_date
                .is_some_and(|d| d <= today - chrono::Duration::days(OVERDUE_AFTER_DAYS))
    }
}

pub const OVERDUE_AFTER_DAYS: i64 = 7;

/// Visão do registro para o perfil Client e para links compartilhados:
/// sem campos internos (técnico, valores, notas, autoria).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallationView {
    pub id: Uuid,
    pub sr_no: String,
    pub region: String,
    pub district: String,
    pub tahsil: String,
    pub pin_code: String,
    pub address: String,
    pub receiver_name: String,
    pub contact_number: String,
    pub alternate_contact_number: Option<String>,
    pub delivery_status: DeliveryStatus,
    pub installation_status: InstallationStatus,
    pub priority: Priority,
    pub dispatch_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub installation_date: Option<NaiveDate>,
    pub cpu_serial: Option<String>,
    pub monitor_serial: Option<String>,
    pub ups_serial: Option<String>,
    pub keyboard_serial: Option<String>,
    pub mouse_serial: Option<String>,
    pub vendor_name: Option<String>,
    pub remarks: Option<String>,
    pub attachments: Vec<AttachmentSlot>,
    pub completion_percentage: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Installation> for InstallationView {
    fn from(r: &Installation) -> Self {
        Self {
            id: r.id,
            sr_no: r.sr_no.clone(),
            region: r.region.clone(),
            district: r.district.clone(),
            tahsil: r.tahsil.clone(),
            pin_code: r.pin_code.clone(),
            address: r.address.clone(),
            receiver_name: r.receiver_name.clone(),
            contact_number: r.contact_number.clone(),
            alternate_contact_number: r.alternate_contact_number.clone(),
            delivery_status: r.delivery_status,
            installation_status: r.installation_status,
            priority: r.priority,
            dispatch_date: r.dispatch_date,
            delivery_date: r.delivery_date,
            installation_date: r.installation_date,
            cpu_serial: r.cpu_serial.clone(),
            monitor_serial: r.monitor_serial.clone(),
            ups_serial: r.ups_serial.clone(),
            keyboard_serial: r.keyboard_serial.clone(),
            mouse_serial: r.mouse_serial.clone(),
            vendor_name: r.vendor_name.clone(),
            remarks: r.remarks.clone(),
            attachments: r.attachments().into_iter().map(|(slot, _)| slot).collect(),
            completion_percentage: r.completion_percentage(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Resposta completa do Admin: registro + campos derivados.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallationDetail {
    #[serde(flatten)]
    pub record: Installation,
    pub completion_percentage: u8,
    pub attachments: Vec<AttachmentSlot>,
}

impl From<Installation> for InstallationDetail {
    fn from(record: Installation) -> Self {
        let completion_percentage = record.completion_percentage();
        let attachments = record.attachments().into_iter().map(|(slot, _)| slot).collect();
        Self { record, completion_percentage, attachments }
    }
}

/// Corpo de resposta conforme o papel: Admin vê tudo, os demais a visão de cliente.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum InstallationResponse {
    Full(InstallationDetail),
    Client(InstallationView),
}

impl InstallationResponse {
    pub fn for_role(record: Installation, role: Role) -> Self {
        match role {
            Role::Admin => Self::Full(record.into()),
            Role::Client | Role::User => Self::Client(InstallationView::from(&record)),
        }
    }
}

// --- Filtros e Paginação ---

/// Atalhos de status aceitos no parâmetro `status` da listagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusPreset {
    Overdue,
    Delivered,
    InTransit,
    PendingDelivery,
    Installed,
    InProgress,
    PendingInstallation,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallationFilter {
    pub status: Option<StatusPreset>,
    pub delivery_status: Option<DeliveryStatus>,
    pub installation_status: Option<InstallationStatus>,
    pub priority: Option<Priority>,
    pub region: Option<String>,
    pub district: Option<String>,
    /// Busca por substring em sr_no, nome do recebedor, endereço e distrito.
    pub search: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Teto da página pedida; mantém o OFFSET longe do overflow.
pub const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: default_page(), per_page: default_per_page() }
    }
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page(&self) -> i64 {
        self.page.clamp(1, MAX_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_installation;
    use chrono::Duration;

    #[test]
    fn slot_names_round_trip_and_unknown_names_fail() {
        for slot in AttachmentSlot::ALL {
            assert_eq!(slot.column().parse::<AttachmentSlot>(), Ok(slot));
        }
        assert_eq!("passport".parse::<AttachmentSlot>(), Err(UnknownSlot("passport".into())));
    }

    #[test]
    fn empty_keys_do_not_count_as_attachments() {
        let mut record = sample_installation("DC-2025-0001");
        record.screenshot = Some(String::new());
        record.mouse_photo = Some("DC-2025-0001/mouse_photo_1.jpg".into());
        assert!(!record.has_attachment(AttachmentSlot::Screenshot));
        assert_eq!(record.attachments(), vec![(AttachmentSlot::MousePhoto, "DC-2025-0001/mouse_photo_1.jpg")]);
    }

    #[test]
    fn completion_counts_flags_and_final_statuses() {
        let mut record = sample_installation("DC-2025-0001");
        assert_eq!(record.completion_percentage(), 0);

        record.delivery_status = DeliveryStatus::Delivered;
        record.installation_status = InstallationStatus::Installed;
        record.screenshot_taken = true;
        assert_eq!(record.completion_percentage(), 30);

        // Anexar arquivo não marca o flag físico
        record.mouse_photo = Some("k".into());
        assert_eq!(record.completion_percentage(), 30);
    }

    #[test]
    fn overdue_needs_pending_installation_seven_days_after_delivery() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let mut record = sample_installation("DC-2025-0001");

        record.delivery_date = Some(today - Duration::days(7));
        assert!(record.is_overdue(today));

        record.delivery_date = Some(today - Duration::days(6));
        assert!(!record.is_overdue(today));

        record.delivery_date = Some(today - Duration::days(30));
        record.installation_status = InstallationStatus::InProgress;
        assert!(!record.is_overdue(today));
    }

    #[test]
    fn client_view_hides_internal_fields() {
        let mut record = sample_installation("DC-2025-0001");
        record.notes = Some("internal".into());
        let json = serde_json::to_value(InstallationResponse::for_role(record.clone(), Role::Client)).unwrap();
        assert!(json.get("notes").is_none());
        assert!(json.get("completionPercentage").is_some());

        let json = serde_json::to_value(InstallationResponse::for_role(record, Role::Admin)).unwrap();
        assert_eq!(json["notes"], "internal");
        assert_eq!(json["srNo"], "DC-2025-0001");
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { page: 0, per_page: 500 };
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn huge_page_numbers_are_capped() {
        let p = Pagination { page: i64::MAX, per_page: i64::MAX };
        assert_eq!(p.page(), MAX_PAGE);
        assert_eq!(p.offset(), (MAX_PAGE - 1) * MAX_PAGE_SIZE);

        let p = Pagination { page: i64::MIN, per_page: 20 };
        assert_eq!(p.page(), 1);
        assert_eq!(p.offset(), 0);
    }
}
