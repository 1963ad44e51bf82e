// Fixtures compartilhadas pelos testes

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    installation::{DeliveryStatus, Installation, InstallationStatus, Priority, RecordState},
    installation_form::InstallationFields,
};

pub fn sample_fields() -> InstallationFields {
    InstallationFields {
        region: "North".into(),
        district: "Pune".into(),
        tahsil: "Haveli".into(),
        pin_code: "411001".into(),
        address: "Gram Panchayat Office, Main Road".into(),
        receiver_name: "Sunita Patil".into(),
        contact_number: "9876543210".into(),
        alternate_contact_number: None,
        delivery_status: DeliveryStatus::Pending,
        installation_status: InstallationStatus::Pending,
        priority: Priority::Medium,
        dispatch_date: None,
        delivery_date: None,
        installation_date: None,
        cpu_serial: None,
        monitor_serial: None,
        ups_serial: None,
        keyboard_serial: None,
        mouse_serial: None,
        vendor_name: None,
        installer_name: None,
        installer_contact: None,
        assigned_technician: None,
        installation_charges: None,
        remarks: None,
        notes: None,
        delivery_report_received: false,
        installation_report_received: false,
        belarc_report_received: false,
        back_side_photo_taken: false,
        os_install_photo_taken: false,
        keyboard_photo_taken: false,
        mouse_photo_taken: false,
        screenshot_taken: false,
    }
}

pub fn sample_installation(sr_no: &str) -> Installation {
    let f = sample_fields();
    let now = Utc::now();
    Installation {
        id: Uuid::new_v4(),
        sr_no: sr_no.to_string(),
        region: f.region,
        district: f.district,
        tahsil: f.tahsil,
        pin_code: f.pin_code,
        address: f.address,
        receiver_name: f.receiver_name,
        contact_number: f.contact_number,
        alternate_contact_number: None,
        delivery_status: f.delivery_status,
        installation_status: f.installation_status,
        priority: f.priority,
        dispatch_date: None,
        delivery_date: None,
        installation_date: None,
        cpu_serial: None,
        monitor_serial: None,
        ups_serial: None,
        keyboard_serial: None,
        mouse_serial: None,
        vendor_name: None,
        installer_name: None,
        installer_contact: None,
        assigned_technician: None,
        installation_charges: None,
        remarks: None,
        notes: None,
        delivery_report_received: false,
        installation_report_received: false,
        belarc_report_received: false,
        back_side_photo_taken: false,
        os_install_photo_taken: false,
        keyboard_photo_taken: false,
        mouse_photo_taken: false,
        screenshot_taken: false,
        delivery_report: None,
        installation_report: None,
        belarc_report: None,
        back_side_photo: None,
        os_install_photo: None,
        keyboard_photo: None,
        mouse_photo: None,
        screenshot: None,
        evidence_file: None,
        created_by: "Test User".into(),
        updated_by: None,
        record_state: RecordState::Active,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
