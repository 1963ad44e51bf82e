// src/models/installation_form.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use super::installation::{DeliveryStatus, InstallationStatus, Priority};
use crate::services::serial_allocator;

// ---
// Validações Customizadas
// ---

fn digits_only(val: &str, len: usize) -> bool {
    val.len() == len && val.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_pin_code(val: &str) -> Result<(), ValidationError> {
    if !digits_only(val, 6) {
        let mut err = ValidationError::new("pin_code");
        err.message = Some("Pin code must be exactly 6 digits.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_phone(val: &str) -> Result<(), ValidationError> {
    if !digits_only(val, 10) {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number must be exactly 10 digits.".into());
        return Err(err);
    }
    Ok(())
}

/// Formato `DC-<ano>-<sequência>`, na mesma forma que o alocador gera.
pub fn validate_sr_no(val: &str) -> Result<(), ValidationError> {
    if serial_allocator::parse_serial(val).is_none() {
        let mut err = ValidationError::new("sr_no");
        err.message = Some("Serial number must look like DC-2025-0001.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("Value cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: criação e edição completa
// ---

/// Formulário de instalação. Campos desconhecidos são rejeitados na desserialização.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstallationPayload {
    /// Opcional na criação (gerado automaticamente); proibido na edição.
    #[validate(custom(function = "validate_sr_no"))]
    #[schema(example = "DC-2025-0001")]
    pub sr_no: Option<String>,

    #[validate(required(message = "Region is required."), length(max = 120, message = "Region is too long."))]
    #[schema(example = "North")]
    pub region: Option<String>,

    #[validate(required(message = "District is required."), length(max = 120, message = "District is too long."))]
    #[schema(example = "Pune")]
    pub district: Option<String>,

    #[validate(required(message = "Tahsil is required."), length(max = 120, message = "Tahsil is too long."))]
    #[schema(example = "Haveli")]
    pub tahsil: Option<String>,

    #[validate(required(message = "Pin code is required."), custom(function = "validate_pin_code"))]
    #[schema(example = "411001")]
    pub pin_code: Option<String>,

    #[validate(required(message = "Address is required."))]
    pub address: Option<String>,

    #[validate(required(message = "Receiver name is required."), length(max = 200, message = "Receiver name is too long."))]
    pub receiver_name: Option<String>,

    #[validate(required(message = "Contact number is required."), custom(function = "validate_phone"))]
    #[schema(example = "9876543210")]
    pub contact_number: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub alternate_contact_number: Option<String>,

    // Ausentes assumem o padrão (Pending / Pending / Medium)
    pub delivery_status: Option<DeliveryStatus>,
    pub installation_status: Option<InstallationStatus>,
    pub priority: Option<Priority>,

    pub dispatch_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub installation_date: Option<NaiveDate>,

    #[validate(length(max = 120))]
    pub cpu_serial: Option<String>,
    #[validate(length(max = 120))]
    pub monitor_serial: Option<String>,
    #[validate(length(max = 120))]
    pub ups_serial: Option<String>,
    #[validate(length(max = 120))]
    pub keyboard_serial: Option<String>,
    #[validate(length(max = 120))]
    pub mouse_serial: Option<String>,

    #[validate(length(max = 200))]
    pub vendor_name: Option<String>,
    #[validate(length(max = 200))]
    pub installer_name: Option<String>,
    #[validate(length(max = 20, message = "Installer contact is too long."))]
    pub installer_contact: Option<String>,
    #[validate(length(max = 200))]
    pub assigned_technician: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "1500.00")]
    pub installation_charges: Option<Decimal>,

    pub remarks: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    pub delivery_report_received: bool,
    #[serde(default)]
    pub installation_report_received: bool,
    #[serde(default)]
    pub belarc_report_received: bool,
    #[serde(default)]
    pub back_side_photo_taken: bool,
    #[serde(default)]
    pub os_install_photo_taken: bool,
    #[serde(default)]
    pub keyboard_photo_taken: bool,
    #[serde(default)]
    pub mouse_photo_taken: bool,
    #[serde(default)]
    pub screenshot_taken: bool,
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl InstallationPayload {
    /// Remove espaços e transforma strings vazias em `None` (formulários mandam "").
    pub fn normalized(self) -> Self {
        Self {
            sr_no: clean(self.sr_no),
            region: clean(self.region),
            district: clean(self.district),
            tahsil: clean(self.tahsil),
            pin_code: clean(self.pin_code),
            address: clean(self.address),
            receiver_name: clean(self.receiver_name),
            contact_number: clean(self.contact_number),
            alternate_contact_number: clean(self.alternate_contact_number),
            cpu_serial: clean(self.cpu_serial),
            monitor_serial: clean(self.monitor_serial),
            ups_serial: clean(self.ups_serial),
            keyboard_serial: clean(self.keyboard_serial),
            mouse_serial: clean(self.mouse_serial),
            vendor_name: clean(self.vendor_name),
            installer_name: clean(self.installer_name),
            installer_contact: clean(self.installer_contact),
            assigned_technician: clean(self.assigned_technician),
            remarks: clean(self.remarks),
            notes: clean(self.notes),
            ..self
        }
    }

    /// Validação de criação: regras do derive.
    pub fn validate_for_create(&self) -> Result<(), ValidationErrors> {
        self.validate()
    }

    /// Validação de edição: mesmas regras, e o sr_no não pode ser alterado.
    pub fn validate_for_update(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(e) => e,
        };
        if self.sr_no.is_some() {
            let mut err = ValidationError::new("immutable");
            err.message = Some("Serial number cannot be changed after creation.".into());
            errors.add("sr_no", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Converte o payload já validado nos campos persistidos.
    pub fn into_fields(self) -> InstallationFields {
        InstallationFields {
            region: self.region.unwrap_or_default(),
            district: self.district.unwrap_or_default(),
            tahsil: self.tahsil.unwrap_or_default(),
            pin_code: self.pin_code.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            receiver_name: self.receiver_name.unwrap_or_default(),
            contact_number: self.contact_number.unwrap_or_default(),
            alternate_contact_number: self.alternate_contact_number,
            delivery_status: self.delivery_status.unwrap_or_default(),
            installation_status: self.installation_status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            dispatch_date: self.dispatch_date,
            delivery_date: self.delivery_date,
            installation_date: self.installation_date,
            cpu_serial: self.cpu_serial,
            monitor_serial: self.monitor_serial,
            ups_serial: self.ups_serial,
            keyboard_serial: self.keyboard_serial,
            mouse_serial: self.mouse_serial,
            vendor_name: self.vendor_name,
            installer_name: self.installer_name,
            installer_contact: self.installer_contact,
            assigned_technician: self.assigned_technician,
            installation_charges: self.installation_charges,
            remarks: self.remarks,
            notes: self.notes,
            delivery_report_received: self.delivery_report_received,
            installation_report_received: self.installation_report_received,
            belarc_report_received: self.belarc_report_received,
            back_side_photo_taken: self.back_side_photo_taken,
            os_install_photo_taken: self.os_install_photo_taken,
            keyboard_photo_taken: self.keyboard_photo_taken,
            mouse_photo_taken: self.mouse_photo_taken,
            screenshot_taken: self.screenshot_taken,
        }
    }
}

/// Campos gravados no INSERT/UPDATE (sem identidade, anexos ou auditoria).
#[derive(Debug, Clone)]
pub struct InstallationFields {
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
    pub installer_name: Option<String>,
    pub installer_contact: Option<String>,
    pub assigned_technician: Option<String>,
    pub installation_charges: Option<Decimal>,
    pub remarks: Option<String>,
    pub notes: Option<String>,
    pub delivery_report_received: bool,
    pub installation_report_received: bool,
    pub belarc_report_received: bool,
    pub back_side_photo_taken: bool,
    pub os_install_photo_taken: bool,
    pub keyboard_photo_taken: bool,
    pub mouse_photo_taken: bool,
    pub screenshot_taken: bool,
}

// ---
// Payload: transição de status (PATCH)
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusUpdatePayload {
    pub delivery_status: Option<DeliveryStatus>,
    pub installation_status: Option<InstallationStatus>,
    pub priority: Option<Priority>,
    pub delivery_date: Option<NaiveDate>,
    pub installation_date: Option<NaiveDate>,
    #[validate(length(max = 2000, message = "Remarks are too long."))]
    pub remarks: Option<String>,
}

impl StatusUpdatePayload {
    pub fn validate_consistency(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        let empty = self.delivery_status.is_none()
            && self.installation_status.is_none()
            && self.priority.is_none()
            && self.delivery_date.is_none()
            && self.installation_date.is_none()
            && self.remarks.is_none();
        if empty {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("empty");
            err.message = Some("At least one field must be provided.".into());
            errors.add("status", err);
            return Err(errors);
        }
        Ok(())
    }
}
