//! 证据模型
//!
//! 归一化坐标框（BoundingBox）、字段抽取证据（ExtractionMeta）以及字段路径（FieldPath）

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// 页面上的归一化矩形区域
///
/// 四个坐标均位于 `[0, 1]`，且 `left <= right`、`top <= bottom`。
/// 后端可能返回轻微越界的值，使用前请调用 [`BoundingBox::normalized`]。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// 页码（从 0 开始）
    #[serde(default)]
    pub page: u32,
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// 像素坐标矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(page: u32, left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            page,
            left,
            top,
            right,
            bottom,
        }
    }

    /// 坐标是否满足归一化约束
    pub fn is_valid(&self) -> bool {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        in_unit(self.left)
            && in_unit(self.top)
            && in_unit(self.right)
            && in_unit(self.bottom)
            && self.left <= self.right
            && self.top <= self.bottom
    }

    /// 返回满足约束的副本：坐标截断到 `[0, 1]`，左右、上下按大小排列
    pub fn normalized(&self) -> Self {
        let left = clamp_unit(self.left);
        let right = clamp_unit(self.right);
        let top = clamp_unit(self.top);
        let bottom = clamp_unit(self.bottom);

        Self {
            page: self.page,
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// 归一化坐标点是否落在框内（含边界）
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    /// 换算到指定尺寸容器中的像素坐标
    pub fn to_pixels(&self, container_width: f64, container_height: f64) -> PixelRect {
        PixelRect {
            left: self.left * container_width,
            top: self.top * container_height,
            width: (self.right - self.left) * container_width,
            height: (self.bottom - self.top) * container_height,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    // NaN 视为 0
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// 单个逻辑字段的证据链
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMeta {
    pub field_path: String,
    #[serde(default)]
    pub boxes: Vec<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// 字段路径的一段
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// 字段路径解析失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("无效的字段路径: '{0}'")]
pub struct InvalidFieldPath(pub String);

/// 解析后的字段路径，例如 `items[2].description`、`subtotal.total`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

fn path_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\[\d+\])*(\.[A-Za-z_][A-Za-z0-9_]*(\[\d+\])*)*$")
            .expect("字段路径正则非法")
    })
}

fn path_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)|\[(\d+)\]").expect("字段路径正则非法")
    })
}

impl FieldPath {
    /// 解析字段路径字符串
    pub fn parse(raw: &str) -> Result<Self, InvalidFieldPath> {
        let trimmed = raw.trim();
        if !path_shape().is_match(trimmed) {
            return Err(InvalidFieldPath(raw.to_string()));
        }

        let mut segments = Vec::new();
        for caps in path_token().captures_iter(trimmed) {
            if let Some(key) = caps.get(1) {
                segments.push(PathSegment::Key(key.as_str().to_string()));
            } else if let Some(index) = caps.get(2) {
                let index = index
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| InvalidFieldPath(raw.to_string()))?;
                segments.push(PathSegment::Index(index));
            }
        }

        Ok(Self { segments })
    }

    /// 发票第 `idx` 行的路径前缀 `items[idx]`
    pub fn invoice_line(idx: usize) -> Self {
        Self {
            segments: vec![PathSegment::Key("items".to_string()), PathSegment::Index(idx)],
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// 行项目索引：`items[n]...` 或 `line_items[n]...` 中的 `n`
    pub fn line_index(&self) -> Option<usize> {
        match self.segments.as_slice() {
            [PathSegment::Key(key), PathSegment::Index(idx), ..]
                if key == "items" || key == "line_items" =>
            {
                Some(*idx)
            }
            _ => None,
        }
    }

    /// 是否以 `prefix` 的全部分段开头
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = InvalidFieldPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_indexed_field_path() {
        let path = FieldPath::parse("items[2].description").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("items".to_string()),
                PathSegment::Index(2),
                PathSegment::Key("description".to_string()),
            ]
        );
        assert_eq!(path.line_index(), Some(2));
        assert_eq!(path.to_string(), "items[2].description");
    }

    #[test]
    fn test_parse_dotted_field_path() {
        let path: FieldPath = "subtotal.total".parse().unwrap();
        assert_eq!(path.line_index(), None);
        assert_eq!(path.to_string(), "subtotal.total");
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        for raw in ["", "items[", "items[a]", ".total", "items..x", "items[2]description"] {
            assert!(FieldPath::parse(raw).is_err(), "应拒绝: {}", raw);
        }
    }

    #[test]
    fn test_starts_with_prefix() {
        let path = FieldPath::parse("items[1].unit_price").unwrap();
        assert!(path.starts_with(&FieldPath::parse("items[1]").unwrap()));
        assert!(!path.starts_with(&FieldPath::parse("items[10]").unwrap()));
        assert!(path.starts_with(&FieldPath::invoice_line(1)));
        assert_eq!(FieldPath::invoice_line(4).to_string(), "items[4]");
    }

    #[test]
    fn test_normalized_box_satisfies_invariant() {
        let raw = BoundingBox::new(0, 0.8, -0.1, 0.2, 1.3);
        assert!(!raw.is_valid());

        let fixed = raw.normalized();
        assert!(fixed.is_valid());
        assert_eq!(fixed, BoundingBox::new(0, 0.2, 0.0, 0.8, 1.0));
    }

    #[test]
    fn test_box_to_pixels() {
        let rect = BoundingBox::new(0, 0.1, 0.2, 0.5, 0.4).to_pixels(800.0, 1000.0);
        assert!((rect.left - 80.0).abs() < 1e-9);
        assert!((rect.top - 200.0).abs() < 1e-9);
        assert!((rect.width - 320.0).abs() < 1e-9);
        assert!((rect.height - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_box_missing_page_defaults_to_zero() {
        let json = r#"{"left":0.1,"top":0.1,"right":0.2,"bottom":0.2}"#;
        let parsed: BoundingBox = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.page, 0);
    }
}
