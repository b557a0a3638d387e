//! 证据关联服务 - 业务能力层
//!
//! 只负责"字段 / 差异 ↔ 坐标框"的映射，不关心流程

use crate::models::{BoundingBox, ExtractionMeta, FieldPath, Finding};
use crate::workflow::WorkflowState;

/// 当前高亮的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlaySource {
    None,
    Finding(usize),
    Field(String),
}

/// 需要绘制的高亮层
///
/// 同一时刻只有一个来源，避免字段与差异的高亮互相叠加
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub source: OverlaySource,
    pub boxes: Vec<BoundingBox>,
}

impl Overlay {
    pub fn empty() -> Self {
        Self {
            source: OverlaySource::None,
            boxes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// 只保留当前显示页上的框，其他页的证据暂不绘制
    pub fn on_page(&self, page: u32) -> Vec<BoundingBox> {
        self.boxes.iter().filter(|b| b.page == page).copied().collect()
    }
}

/// 证据关联器
///
/// 职责：
/// - 字段路径 → 坐标框
/// - 差异索引 → 坐标框
/// - 页面上的点 → 字段路径（反向）
/// - 不修改任何状态
pub struct EvidenceCorrelator<'a> {
    meta: &'a [ExtractionMeta],
    findings: &'a [Finding],
}

impl<'a> EvidenceCorrelator<'a> {
    pub fn new(meta: &'a [ExtractionMeta], findings: &'a [Finding]) -> Self {
        Self { meta, findings }
    }

    /// 基于当前工作流状态创建（尚未对账时差异列表为空）
    pub fn from_state(state: &'a WorkflowState) -> Self {
        let findings = state
            .reconcile_result
            .as_ref()
            .map(|r| r.findings.as_slice())
            .unwrap_or(&[]);
        Self::new(&state.extraction_meta, findings)
    }

    /// 字段对应的所有坐标框（去重、已归一化）；找不到返回空
    pub fn boxes_for_field(&self, field_path: &str) -> Vec<BoundingBox> {
        let mut boxes: Vec<BoundingBox> = Vec::new();
        for entry in self.meta.iter().filter(|m| m.field_path == field_path) {
            for b in &entry.boxes {
                let b = b.normalized();
                if !boxes.contains(&b) {
                    boxes.push(b);
                }
            }
        }
        boxes
    }

    /// 差异的证据框；有 `evidence_page` 时只保留该页，索引越界返回空
    pub fn boxes_for_finding(&self, finding_idx: usize) -> Vec<BoundingBox> {
        let Some(finding) = self.findings.get(finding_idx) else {
            return Vec::new();
        };

        finding
            .evidence_boxes
            .iter()
            .filter(|b| finding.evidence_page.map_or(true, |page| b.page == page))
            .map(BoundingBox::normalized)
            .collect()
    }

    /// 高亮优先级：差异 > 字段 > 无
    pub fn overlay(&self, field_path: Option<&str>, finding_idx: Option<usize>) -> Overlay {
        if let Some(idx) = finding_idx {
            return Overlay {
                source: OverlaySource::Finding(idx),
                boxes: self.boxes_for_finding(idx),
            };
        }

        if let Some(path) = field_path {
            return Overlay {
                source: OverlaySource::Field(path.to_string()),
                boxes: self.boxes_for_field(path),
            };
        }

        Overlay::empty()
    }

    /// 反向映射：页面上某点（归一化坐标）所在的字段
    pub fn fields_at(&self, page: u32, x: f64, y: f64) -> Vec<&'a str> {
        let mut fields: Vec<&'a str> = Vec::new();
        for entry in self.meta {
            let hit = entry
                .boxes
                .iter()
                .map(BoundingBox::normalized)
                .any(|b| b.page == page && b.contains(x, y));
            if hit && !fields.contains(&entry.field_path.as_str()) {
                fields.push(entry.field_path.as_str());
            }
        }
        fields
    }

    /// 指向发票第 `line_idx` 行的所有字段路径
    pub fn fields_for_invoice_line(&self, line_idx: usize) -> Vec<&'a str> {
        let prefix = FieldPath::invoice_line(line_idx);
        let mut fields: Vec<&'a str> = Vec::new();
        for entry in self.meta {
            let on_line = FieldPath::parse(&entry.field_path)
                .is_ok_and(|path| path.starts_with(&prefix));
            if on_line && !fields.contains(&entry.field_path.as_str()) {
                fields.push(entry.field_path.as_str());
            }
        }
        fields
    }
}

/// 根据状态中的高亮字段 / 差异计算需要绘制的高亮层
pub fn active_overlay(state: &WorkflowState) -> Overlay {
    EvidenceCorrelator::from_state(state).overlay(
        state.highlighted_field_path.as_deref(),
        state.highlighted_finding_idx,
    )
}
