pub mod evidence;
pub mod note_export;

pub use evidence::{active_overlay, EvidenceCorrelator, Overlay, OverlaySource};
pub use note_export::NoteExporter;
