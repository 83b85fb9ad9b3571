//! Export service: resolves an identity and renders it in a wire format.

use std::sync::Arc;

use crate::domains::verified_domains;
use crate::error::Result;
use crate::identity::Identity;
use crate::projection::{project, View};
use crate::storage::{DomainVerificationStore, IdentityStore, ProfilePictureAltSource};
use crate::time::{Clock, SystemClock};

use super::attachments::{build_attachments, PropertyValue};
use super::envelope::{build_envelope, Envelope, EnvelopeContext};
use super::format::{cache_control, ExportFormat};
use super::text::render_text;
use super::vcard::render_vcard;
use super::xml::render_xml;

/// A rendered export and the headers it must be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExport {
    pub format: ExportFormat,
    pub view: View,
    pub content_type: &'static str,
    pub cache_control: &'static str,
    pub body: String,
}

pub struct ExportService {
    identities: Arc<dyn IdentityStore>,
    domains: Arc<dyn DomainVerificationStore>,
    alt_source: Arc<dyn ProfilePictureAltSource>,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl ExportService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        domains: Arc<dyn DomainVerificationStore>,
        alt_source: Arc<dyn ProfilePictureAltSource>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            identities,
            domains,
            alt_source,
            clock: Arc::new(SystemClock),
            base_url: base_url.into(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the envelope for `view` of an identity.
    ///
    /// Verification rows are authoritative for `verified_domains` once the
    /// identity has any; older records without rows keep their stored list.
    pub fn envelope(
        &self,
        identity: &Identity,
        view: View,
        self_url: Option<&str>,
    ) -> Result<Envelope> {
        let mut identity = identity.clone();
        let rows = self.domains.list_for_identity(identity.id)?;
        if !rows.is_empty() {
            identity.verified_domains = verified_domains(&rows);
        }

        let projection = project(&identity, view);
        let alt = self.alt_source.active_alt_text(&identity);
        let ctx = EnvelopeContext {
            base_url: &self.base_url,
            profile_image_alt: &alt,
            now: self.clock.now(),
        };
        build_envelope(&projection, view, &ctx, self_url)
    }

    /// Render an identity in `format`.
    pub fn render(
        &self,
        identity: &Identity,
        view: View,
        format: ExportFormat,
        self_url: Option<&str>,
    ) -> Result<RenderedExport> {
        let envelope = self.envelope(identity, view, self_url)?;
        let body = match format {
            ExportFormat::Envelope | ExportFormat::Json => serde_json::to_string(&envelope)?,
            ExportFormat::Xml => render_xml(&envelope.identity),
            ExportFormat::Text => render_text(&envelope.identity),
            ExportFormat::VCard => render_vcard(&envelope.identity),
        };
        log::debug!(
            "rendered {format} export of {} ({view}, rev {})",
            identity.handle,
            envelope.meta.rev
        );
        Ok(RenderedExport {
            format,
            view,
            content_type: format.content_type(),
            cache_control: cache_control(view),
            body,
        })
    }

    /// Public export addressed by handle, e.g. `alice` or `alice.vcf`.
    pub fn render_public(&self, ident: &str, self_url: Option<&str>) -> Result<RenderedExport> {
        let (handle, format) = ExportFormat::from_ident(ident);
        let identity = self.identities.get_by_handle(handle)?;
        self.render(&identity, View::Public, format, self_url)
    }

    /// Private export addressed by capability token, e.g. `pin:abc.json`.
    pub fn render_private(&self, ident: &str, self_url: Option<&str>) -> Result<RenderedExport> {
        let (token, format) = ExportFormat::from_ident(ident);
        let identity = self.identities.get_by_private_token(token)?;
        self.render(&identity, View::Private, format, self_url)
    }

    /// Federation attachments for the public view of a handle.
    pub fn attachments(&self, handle: &str) -> Result<Vec<PropertyValue>> {
        let identity = self.identities.get_by_handle(handle)?;
        let envelope = self.envelope(&identity, View::Public, None)?;
        Ok(build_attachments(&envelope.identity))
    }
}
