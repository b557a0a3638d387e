//! 异常说明 PDF 落盘

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// PDF 写入器
///
/// 只负责命名与写文件，PDF 内容由后端生成
#[derive(Debug, Clone)]
pub struct NoteExporter {
    export_dir: PathBuf,
}

impl NoteExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.export_dir)
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// 生成导出文件名: `compliance_report_{发票号或 note}_{时间戳}.pdf`
    ///
    /// 发票号中不适合出现在文件名里的字符替换为 `_`
    pub fn file_name(invoice_number: Option<&str>, at: DateTime<Local>) -> String {
        let label = invoice_number
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                            c
                        } else {
                            '_'
                        }
                    })
                    .collect::<String>()
            })
            .unwrap_or_else(|| "note".to_string());

        format!(
            "compliance_report_{}_{}.pdf",
            label,
            at.format("%Y%m%d_%H%M%S")
        )
    }

    /// 写入 PDF，返回文件路径
    pub async fn write(&self, bytes: &[u8], invoice_number: Option<&str>) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| {
                AppError::Export(format!("无法创建目录 {}: {}", self.export_dir.display(), e))
            })?;

        let path = self
            .export_dir
            .join(Self::file_name(invoice_number, Local::now()));

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Export(format!("无法写入 {}: {}", path.display(), e)))?;

        info!("✓ PDF 已保存: {} ({} 字节)", path.display(), bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_file_name_uses_invoice_number() {
        assert_eq!(
            NoteExporter::file_name(Some("84652373"), fixed_time()),
            "compliance_report_84652373_20240305_140709.pdf"
        );
    }

    #[test]
    fn test_file_name_falls_back_to_note() {
        assert_eq!(
            NoteExporter::file_name(None, fixed_time()),
            "compliance_report_note_20240305_140709.pdf"
        );
        assert_eq!(
            NoteExporter::file_name(Some("  "), fixed_time()),
            "compliance_report_note_20240305_140709.pdf"
        );
    }

    #[test]
    fn test_file_name_sanitizes_separators() {
        assert_eq!(
            NoteExporter::file_name(Some("INV/2024 01"), fixed_time()),
            "compliance_report_INV_2024_01_20240305_140709.pdf"
        );
    }

    #[tokio::test]
    async fn test_write_creates_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = NoteExporter::new(dir.path().join("nested").join("notes"));

        let path = exporter.write(b"%PDF-1.4", Some("INV-1")).await.unwrap();

        assert!(path.starts_with(exporter.export_dir()));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("compliance_report_INV-1_"));
    }

    #[tokio::test]
    async fn test_write_failure_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        // 用普通文件占住目录位置
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"x").unwrap();

        let exporter = NoteExporter::new(&blocker);
        let err = exporter.write(b"%PDF-1.4", None).await.unwrap_err();
        assert!(matches!(err, AppError::Export(_)));
    }
}
