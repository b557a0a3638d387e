//! 发票与合同数据结构
//!
//! 与后端抽取结果的 JSON 结构一一对应

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_NET_TERMS: &str = "Net 30";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_net_terms() -> String {
    DEFAULT_NET_TERMS.to_string()
}

fn default_optional_net_terms() -> Option<String> {
    Some(default_net_terms())
}

fn default_tax_rate() -> f64 {
    0.0909
}

fn default_allowed_variance_pct() -> f64 {
    2.0
}

/// 文档类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Contract,
}

impl DocumentKind {
    /// 抽取接口路径
    pub fn extract_endpoint(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "/parse_extract/invoice",
            DocumentKind::Contract => "/parse_extract/contract",
        }
    }

    /// 中文名称
    pub fn name(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "发票",
            DocumentKind::Contract => "合同",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 发票行项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// 发票小计
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Subtotal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    pub total: f64,
}

/// 发票
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    pub seller_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_address: Option<String>,
    pub invoice_number: String,
    pub invoice_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// 顺序有意义：行索引既是字段路径的一部分，也是对账时的关联键
    pub items: Vec<InvoiceLine>,
    pub subtotal: Subtotal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_optional_net_terms")]
    pub net_terms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

impl Invoice {
    /// 付款条款，缺省为 `Net 30`
    pub fn net_terms_or_default(&self) -> &str {
        self.net_terms.as_deref().unwrap_or(DEFAULT_NET_TERMS)
    }
}

/// 合同行项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractLine {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

/// 合同 / SOW
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub vendor_name: String,
    pub client_name: String,
    pub contract_id: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_net_terms")]
    pub net_terms: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_payment_discount: Option<f64>,
    #[serde(default = "default_tax_rate")]
    pub default_tax_rate: f64,
    #[serde(default = "default_allowed_variance_pct")]
    pub allowed_variance_pct: f64,
    pub line_items: Vec<ContractLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_defaults_applied() {
        let json = r#"{
            "client_name": "Clark-Foster",
            "seller_name": "Nguyen-Roach",
            "invoice_number": "84652373",
            "invoice_date": "02/23/2021",
            "items": [{"description": "Stemware Rack", "quantity": 1.0, "total_price": 46.55}],
            "subtotal": {"tax": 21.18, "total": 232.95}
        }"#;

        let invoice: Invoice = serde_json::from_str(json).unwrap();
        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.net_terms_or_default(), "Net 30");
        assert_eq!(invoice.items[0].unit_price, None);
        assert_eq!(invoice.subtotal.total, 232.95);
    }

    #[test]
    fn test_contract_defaults_applied() {
        let json = r#"{
            "vendor_name": "Nguyen-Roach",
            "client_name": "Clark-Foster",
            "contract_id": "SOW-84652373",
            "line_items": [{"description": "Stemware Rack", "unit_price": 46.55}]
        }"#;

        let contract: Contract = serde_json::from_str(json).unwrap();
        assert_eq!(contract.net_terms, "Net 30");
        assert_eq!(contract.allowed_variance_pct, 2.0);
        assert!((contract.default_tax_rate - 0.0909).abs() < 1e-12);
        assert_eq!(contract.line_items[0].max_quantity, None);
    }
}
