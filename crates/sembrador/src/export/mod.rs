//! CSV export: spreadsheet-safe rendering and delivery of the rendered file.

pub mod csv;
pub mod download;

pub use csv::{escape_field, CsvPayload, CSV_MEDIA_TYPE, UTF8_BOM};
pub use download::{export_csv, DownloadError, DownloadTarget, FileDownloadTarget, StagedDownload};
