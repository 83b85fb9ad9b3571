//! PinIdentity: identity projection and domain verification for
//! self-hosted profile pages.
//!
//! Derives public and private views of one canonical identity record,
//! proves ownership of external domains through a well-known challenge,
//! and builds a deterministic, hash-addressed export rendered as JSON,
//! XML, plain text or vCard.

pub mod config;
pub mod domains;
pub mod error;
pub mod export;
pub mod identity;
pub mod projection;
pub mod storage;
pub mod time;
pub mod token;

// Re-export primary types
pub use config::InstanceConfig;
pub use error::{PinError, Result};
pub use identity::{Handle, Identity, IdentityId, Link, SocialProfile, Visibility, VisibilityMap};
pub use projection::{project, Projection, View};
pub use time::{Clock, FixedClock, SystemClock};

// Re-export domain verification types
pub use domains::{
    normalize_domain, parse_domains, ChallengeFetcher, DomainService, DomainState,
    DomainVerification, HttpChallenger,
};

// Re-export export types
pub use export::{Envelope, ExportFormat, ExportService, IdentityPayload, RenderedExport};

// Re-export storage types
pub use storage::{
    DomainVerificationStore, FileStore, IdentityStore, MemoryStore, ProfilePictureAltSource,
};
