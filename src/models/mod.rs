pub mod document;
pub mod evidence;
pub mod pipeline;
pub mod reconcile;

pub use document::{Contract, ContractLine, DocumentKind, Invoice, InvoiceLine, Subtotal};
pub use evidence::{BoundingBox, ExtractionMeta, FieldPath, InvalidFieldPath, PathSegment, PixelRect};
pub use pipeline::{DocumentFile, ExtractionResponse, NoteResponse, ParseInfo, UploadResponse};
pub use reconcile::{Finding, FindingSeverity, FindingType, ReconcileResult, ReconcileSummary};
