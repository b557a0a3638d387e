//! 对账结果数据结构
//!
//! 对账算法在后端，这里只描述结果契约

use serde::{Deserialize, Serialize};
use std::fmt;

use super::evidence::BoundingBox;

/// 差异类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingType {
    /// 单价偏差
    UnitPriceVariance,
    /// 数量超出合同上限
    QuantityOverflow,
    /// 合同中无对应行
    UnknownLine,
    /// 币种不一致
    CurrencyMismatch,
    /// 付款条款不一致
    TermsMismatch,
    /// 税率不一致
    TaxMismatch,
}

impl FindingType {
    pub const ALL: [FindingType; 6] = [
        FindingType::UnitPriceVariance,
        FindingType::QuantityOverflow,
        FindingType::UnknownLine,
        FindingType::CurrencyMismatch,
        FindingType::TermsMismatch,
        FindingType::TaxMismatch,
    ];

    /// 线上传输使用的代码
    pub fn code(self) -> &'static str {
        match self {
            FindingType::UnitPriceVariance => "UNIT_PRICE_VARIANCE",
            FindingType::QuantityOverflow => "QUANTITY_OVERFLOW",
            FindingType::UnknownLine => "UNKNOWN_LINE",
            FindingType::CurrencyMismatch => "CURRENCY_MISMATCH",
            FindingType::TermsMismatch => "TERMS_MISMATCH",
            FindingType::TaxMismatch => "TAX_MISMATCH",
        }
    }

    /// 中文名称
    pub fn name(self) -> &'static str {
        match self {
            FindingType::UnitPriceVariance => "单价偏差",
            FindingType::QuantityOverflow => "数量超限",
            FindingType::UnknownLine => "未知行项目",
            FindingType::CurrencyMismatch => "币种不一致",
            FindingType::TermsMismatch => "付款条款不一致",
            FindingType::TaxMismatch => "税率不一致",
        }
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
    Major,
    Minor,
}

impl fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingSeverity::Major => write!(f, "MAJOR"),
            FindingSeverity::Minor => write!(f, "MINOR"),
        }
    }
}

/// 单条差异
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub severity: FindingSeverity,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_line_idx: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_line_idx: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_page: Option<u32>,
    #[serde(default)]
    pub evidence_boxes: Vec<BoundingBox>,
}

impl Finding {
    pub fn is_major(&self) -> bool {
        self.severity == FindingSeverity::Major
    }
}

/// 对账汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub pass: bool,
    pub major_count: usize,
    pub minor_count: usize,
    pub total_count: usize,
}

/// 对账结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub summary: ReconcileSummary,
    pub findings: Vec<Finding>,
}

impl ReconcileResult {
    /// 由差异列表汇总出结果：只有 MAJOR 差异会导致不通过
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let major_count = findings.iter().filter(|f| f.is_major()).count();
        let minor_count = findings.len() - major_count;

        Self {
            summary: ReconcileSummary {
                pass: major_count == 0,
                major_count,
                minor_count,
                total_count: findings.len(),
            },
            findings,
        }
    }

    /// 汇总数字是否与差异列表一致
    pub fn is_consistent(&self) -> bool {
        let major = self.findings.iter().filter(|f| f.is_major()).count();
        let minor = self.findings.len() - major;
        let s = &self.summary;

        s.total_count == s.major_count + s.minor_count
            && s.total_count == self.findings.len()
            && s.major_count == major
            && s.minor_count == minor
            && s.pass == (s.major_count == 0)
    }

    /// 按类型统计差异数量
    pub fn count_of(&self, finding_type: FindingType) -> usize {
        self.findings
            .iter()
            .filter(|f| f.finding_type == finding_type)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(finding_type: FindingType, severity: FindingSeverity) -> Finding {
        Finding {
            finding_type,
            severity,
            details: String::new(),
            invoice_line_idx: None,
            contract_line_idx: None,
            evidence_page: None,
            evidence_boxes: Vec::new(),
        }
    }

    #[test]
    fn test_minor_findings_alone_pass() {
        let result = ReconcileResult::from_findings(vec![finding(
            FindingType::TermsMismatch,
            FindingSeverity::Minor,
        )]);

        assert!(result.summary.pass);
        assert_eq!(result.summary.minor_count, 1);
        assert_eq!(result.summary.total_count, 1);
        assert!(result.is_consistent());
    }

    #[test]
    fn test_major_finding_fails() {
        let result = ReconcileResult::from_findings(vec![
            finding(FindingType::UnitPriceVariance, FindingSeverity::Major),
            finding(FindingType::TermsMismatch, FindingSeverity::Minor),
        ]);

        assert!(!result.summary.pass);
        assert_eq!(result.summary.major_count, 1);
        assert_eq!(result.count_of(FindingType::UnitPriceVariance), 1);
    }

    #[test]
    fn test_type_counts_cover_every_finding() {
        let result = ReconcileResult::from_findings(vec![
            finding(FindingType::QuantityOverflow, FindingSeverity::Major),
            finding(FindingType::QuantityOverflow, FindingSeverity::Major),
            finding(FindingType::TaxMismatch, FindingSeverity::Minor),
        ]);

        let total: usize = FindingType::ALL.iter().map(|t| result.count_of(*t)).sum();
        assert_eq!(total, result.summary.total_count);
        assert_eq!(result.count_of(FindingType::QuantityOverflow), 2);
        assert_eq!(result.count_of(FindingType::CurrencyMismatch), 0);
    }

    #[test]
    fn test_inconsistent_summary_detected() {
        let mut result = ReconcileResult::from_findings(vec![finding(
            FindingType::UnknownLine,
            FindingSeverity::Major,
        )]);
        result.summary.pass = true;
        assert!(!result.is_consistent());
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "summary": {"pass": false, "major_count": 1, "minor_count": 0, "total_count": 1},
            "findings": [{
                "type": "UNIT_PRICE_VARIANCE",
                "severity": "MAJOR",
                "details": "Unit price variance 20.0% exceeds 5.0%",
                "invoice_line_idx": 0,
                "contract_line_idx": 0
            }]
        }"#;

        let result: ReconcileResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.findings[0].finding_type, FindingType::UnitPriceVariance);
        assert!(result.findings[0].evidence_boxes.is_empty());
        assert!(result.is_consistent());
    }
}
