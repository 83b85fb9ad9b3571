//! Canonical export and its wire formats.
//!
//! The builder turns a projected identity into a `pinc-1` envelope with a
//! content hash (`rev`) and an opaque subject. Serializers render the
//! envelope's identity payload as JSON, XML, plain text or vCard.

pub mod attachments;
pub mod envelope;
pub mod format;
pub mod service;
pub mod text;
pub mod vcard;
pub mod xml;

pub use attachments::{build_attachments, PropertyValue};
pub use envelope::{
    build_envelope, compute_rev, profile_image_from_self, subject_for_identity, subject_of,
    Envelope, EnvelopeContext, ExportLink, ExportSocial, IdentityPayload, Meta, PINC_VERSION,
};
pub use format::{cache_control, ExportFormat, PRIVATE_CACHE_CONTROL, PUBLIC_CACHE_CONTROL};
pub use service::{ExportService, RenderedExport};
pub use text::render_text;
pub use vcard::{escape_vcard, render_vcard, sanitize_vcard_key};
pub use xml::{escape_xml, render_xml};
