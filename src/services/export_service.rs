// src/services/export_service.rs

use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    models::{auth::Role, installation::Installation},
};

/// Colunas por perfil. O perfil Client não vê os campos internos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportProfile {
    Admin,
    Client,
}

impl ExportProfile {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::Client | Role::User => Self::Client,
        }
    }
}

const CLIENT_HEADERS: [&str; 28] = [
    "SR No", "Region", "District", "Tahsil", "Pin Code", "Address",
    "Receiver Name", "Contact Number", "Alternate Contact",
    "Delivery Status", "Installation Status", "Priority",
    "Dispatch Date", "Delivery Date", "Installation Date",
    "CPU Serial", "Monitor Serial", "UPS Serial", "Keyboard Serial", "Mouse Serial",
    "Vendor", "Installer", "Installer Contact", "Remarks",
    "Completion %", "Files Attached", "Created At", "Updated At",
];

const ADMIN_ONLY_HEADERS: [&str; 5] = [
    "Assigned Technician", "Installation Charges", "Notes", "Created By", "Updated By",
];

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn client_row(r: &Installation) -> Vec<String> {
    vec![
        r.sr_no.clone(),
        r.region.clone(),
        r.district.clone(),
        r.tahsil.clone(),
        r.pin_code.clone(),
        r.address.clone(),
        r.receiver_name.clone(),
        r.contact_number.clone(),
        text(&r.alternate_contact_number),
        r.delivery_status.label().to_string(),
        r.installation_status.label().to_string(),
        r.priority.label().to_string(),
        date(r.dispatch_date),
        date(r.delivery_date),
        date(r.installation_date),
        text(&r.cpu_serial),
        text(&r.monitor_serial),
        text(&r.ups_serial),
        text(&r.keyboard_serial),
        text(&r.mouse_serial),
        text(&r.vendor_name),
        text(&r.installer_name),
        text(&r.installer_contact),
        text(&r.remarks),
        r.completion_percentage().to_string(),
        r.attachments().len().to_string(),
        r.created_at.format("%Y-%m-%d").to_string(),
        r.updated_at.format("%Y-%m-%d").to_string(),
    ]
}

fn admin_extra(r: &Installation) -> [String; 5] {
    [
        text(&r.assigned_technician),
        r.installation_charges.map(|c| c.to_string()).unwrap_or_default(),
        text(&r.notes),
        r.created_by.clone(),
        text(&r.updated_by),
    ]
}

/// Gera o CSV completo em memória.
pub fn to_csv(records: &[Installation], profile: ExportProfile) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::InternalServerError(e.into());

    let mut headers: Vec<&str> = CLIENT_HEADERS.to_vec();
    if profile == ExportProfile::Admin {
        headers.extend(ADMIN_ONLY_HEADERS);
    }
    writer.write_record(&headers).map_err(csv_err)?;

    for record in records {
        let mut row = client_row(record);
        if profile == ExportProfile::Admin {
            row.extend(admin_extra(record));
        }
        writer.write_record(&row).map_err(csv_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Falha ao finalizar CSV: {}", e)))
}

pub fn file_name(today: NaiveDate) -> String {
    format!("dc_installations_{}.csv", today.format("%Y%m%d"))
}
