// src/services/archive.rs

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use futures::{Stream, StreamExt};
use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs::File,
    io::{self, Seek, SeekFrom, Write},
    path::Path,
};
use tempfile::TempPath;
use tokio_util::io::ReaderStream;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::models::installation::{DeliveryStatus, Installation, InstallationStatus};

pub struct ArchiveEntry {
    pub path: String,
    pub contents: Bytes,
}

/// ZIP pronto num arquivo temporário. O arquivo é apagado quando este valor
/// (ou o stream criado a partir dele) é descartado.
#[derive(Debug)]
pub struct TempArchive {
    file: File,
    path: TempPath,
    size: u64,
}

impl TempArchive {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Corpo da resposta. O guard do arquivo vive dentro do stream.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let TempArchive { file, path, .. } = self;
        let reader = tokio::fs::File::from_std(file);
        ReaderStream::new(reader).map(move |chunk| {
            let _guard = &path;
            chunk
        })
    }
}

/// Escreve as entradas num ZIP temporário. Bloqueante: usar em `spawn_blocking`.
pub fn write_zip(entries: Vec<ArchiveEntry>) -> anyhow::Result<TempArchive> {
    let temp = tempfile::Builder::new()
        .prefix("dc-bundle-")
        .suffix(".zip")
        .tempfile()
        .context("Falha ao criar arquivo temporário")?;
    let (file, path) = temp.into_parts();

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        zip.start_file(entry.path, options)?;
        zip.write_all(&entry.contents)?;
    }
    let mut file = zip.finish()?;

    let size = file.seek(SeekFrom::End(0))?;
    file.rewind()?;

    Ok(TempArchive { file, path, size })
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

fn date_or_dash(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "-".to_string())
}

/// `summary.txt` de um registro.
pub fn record_summary(record: &Installation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "DC Installation Summary");
    let _ = writeln!(out, "=======================");
    let _ = writeln!(out, "SR No: {}", record.sr_no);
    let _ = writeln!(out, "Receiver: {} ({})", record.receiver_name, record.contact_number);
    let _ = writeln!(out, "Region: {}", record.region);
    let _ = writeln!(out, "District: {}", record.district);
    let _ = writeln!(out, "Tahsil: {}", record.tahsil);
    let _ = writeln!(out, "Pin Code: {}", record.pin_code);
    let _ = writeln!(out, "Address: {}", record.address);
    let _ = writeln!(out);
    let _ = writeln!(out, "Delivery Status: {}", record.delivery_status.label());
    let _ = writeln!(out, "Installation Status: {}", record.installation_status.label());
    let _ = writeln!(out, "Priority: {}", record.priority.label());
    let _ = writeln!(out, "Dispatch Date: {}", date_or_dash(record.dispatch_date));
    let _ = writeln!(out, "Delivery Date: {}", date_or_dash(record.delivery_date));
    let _ = writeln!(out, "Installation Date: {}", date_or_dash(record.installation_date));
    let _ = writeln!(out, "Completion: {}%", record.completion_percentage());
    let _ = writeln!(out);
    let _ = writeln!(out, "Equipment");
    for (label, serial) in [
        ("CPU", &record.cpu_serial),
        ("Monitor", &record.monitor_serial),
        ("UPS", &record.ups_serial),
        ("Keyboard", &record.keyboard_serial),
        ("Mouse", &record.mouse_serial),
    ] {
        let _ = writeln!(out, "  {}: {}", label, serial.as_deref().unwrap_or("-"));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Documents");
    for (label, done) in record.document_flags() {
        let _ = writeln!(out, "  {}: {}", label, yes_no(done));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Attached Files");
    let attachments = record.attachments();
    if attachments.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (slot, _) in attachments {
        let _ = writeln!(out, "  {}", slot.label());
    }
    out
}

/// `SUMMARY.txt` de um pacote com vários registros.
pub fn bundle_summary(records: &[(&Installation, usize)], generated_at: DateTime<Utc>) -> String {
    let mut by_delivery: BTreeMap<&str, usize> = DeliveryStatus::ALL.iter().map(|s| (s.label(), 0)).collect();
    let mut by_installation: BTreeMap<&str, usize> =
        InstallationStatus::ALL.iter().map(|s| (s.label(), 0)).collect();
    let mut total_files = 0;

    for (record, files) in records {
        *by_delivery.entry(record.delivery_status.label()).or_default() += 1;
        *by_installation.entry(record.installation_status.label()).or_default() += 1;
        total_files += files;
    }

    let mut out = String::new();
    let _ = writeln!(out, "DC Installation Bundle");
    let _ = writeln!(out, "======================");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Records: {}", records.len());
    let _ = writeln!(out, "Files: {}", total_files);
    let _ = writeln!(out);
    let _ = writeln!(out, "Delivery Status");
    for (label, count) in &by_delivery {
        let _ = writeln!(out, "  {}: {}", label, count);
    }
    let _ = writeln!(out, "Installation Status");
    for (label, count) in &by_installation {
        let _ = writeln!(out, "  {}: {}", label, count);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Records");
    for (record, files) in records {
        let _ = writeln!(out, "  {} | {} | {} | {} file(s)", record.sr_no, record.receiver_name, record.district, files);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_installation;
    use futures::TryStreamExt;
    use std::io::Read;

    fn entry(path: &str, contents: &'static [u8]) -> ArchiveEntry {
        ArchiveEntry { path: path.to_string(), contents: Bytes::from_static(contents) }
    }

    #[test]
    fn zip_contains_every_entry() {
        let archive = write_zip(vec![entry("Mouse Photo.jpg", b"jpeg"), entry("summary.txt", b"hello")]).unwrap();
        assert!(archive.size() > 0);

        let mut zip = zip::ZipArchive::new(File::open(archive.path()).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut summary = String::new();
        zip.by_name("summary.txt").unwrap().read_to_string(&mut summary).unwrap();
        assert_eq!(summary, "hello");
    }

    #[test]
    fn dropping_the_archive_removes_the_temp_file() {
        let archive = write_zip(vec![entry("a.txt", b"a")]).unwrap();
        let path = archive.path().to_path_buf();
        assert!(path.exists());
        drop(archive);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn stream_yields_the_whole_file_and_cleans_up() {
        let archive = write_zip(vec![entry("a.txt", b"aaaa"), entry("b.txt", b"bbbb")]).unwrap();
        let path = archive.path().to_path_buf();
        let size = archive.size();

        let chunks: Vec<Bytes> = archive.into_stream().try_collect().await.unwrap();
        let streamed: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(streamed as u64, size);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn abandoned_stream_still_cleans_up() {
        let archive = write_zip(vec![entry("a.txt", b"a")]).unwrap();
        let path = archive.path().to_path_buf();
        let stream = archive.into_stream();
        drop(stream);
        assert!(!path.exists());
    }

    #[test]
    fn record_summary_lists_flags_and_files() {
        let mut record = sample_installation("DC-2025-0007");
        record.mouse_photo = Some("DC-2025-0007/mouse_photo_1.jpg".into());
        record.keyboard_photo_taken = true;

        let text = record_summary(&record);
        assert!(text.contains("SR No: DC-2025-0007"));
        assert!(text.contains("Keyboard Photo Taken: Yes"));
        assert!(text.contains("Mouse Photo Taken: No"));
        assert!(text.contains("  Mouse Photo\n"));
    }

    #[test]
    fn bundle_summary_counts_statuses() {
        let mut a = sample_installation("DC-2025-0001");
        a.delivery_status = DeliveryStatus::Delivered;
        let b = sample_installation("DC-2025-0002");

        let text = bundle_summary(&[(&a, 2), (&b, 1)], Utc::now());
        assert!(text.contains("Records: 2"));
        assert!(text.contains("Files: 3"));
        assert!(text.contains("  Delivered: 1"));
        assert!(text.contains("  Pending: 1"));
        assert!(text.contains("DC-2025-0002"));
    }
}
