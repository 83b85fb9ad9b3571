//! Identity records and their visibility policy.
//!
//! The identity module provides the canonical `Identity` record, the
//! validated `Handle`, typed profile collections and the `VisibilityMap`
//! that governs what a public view may expose.

pub mod record;
pub mod visibility;

pub use record::{
    decode_links, decode_social_profiles, encode_links, encode_social_profiles,
    is_atproto_handle_verified, merge_social_profiles, Handle, Identity, IdentityId, Link,
    ScalarField, SocialProfile,
};
pub use visibility::{Visibility, VisibilityMap, DEFAULT_PRIVATE_FIELDS};
