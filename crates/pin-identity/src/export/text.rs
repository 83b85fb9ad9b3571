//! Plain-text serializer: one `key: value` line per populated field.

use super::envelope::IdentityPayload;

/// Render the payload as newline-separated `key: value` lines.
///
/// Map sections come out in key order here, but consumers should not rely on
/// line order; the format is meant for people.
pub fn render_text(payload: &IdentityPayload) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut push = |key: &str, value: &str| {
        if !value.trim().is_empty() {
            lines.push(format!("{key}: {value}"));
        }
    };

    push("handle", &payload.handle);
    push("display_name", &payload.display_name);
    push("email", &payload.email);
    push("bio", &payload.bio);
    push("organization", &payload.organization);
    push("job_title", &payload.job_title);
    push("birthdate", &payload.birthdate);
    push("languages", &payload.languages);
    push("phone", &payload.phone);
    for (key, value) in &payload.custom_fields {
        push(&format!("custom.{}", key.to_lowercase()), value);
    }
    push("address", &payload.address);
    push("location", &payload.location);
    push("website", &payload.website);
    push("pronouns", &payload.pronouns);
    push("timezone", &payload.timezone);
    for (label, address) in &payload.wallets {
        push(&format!("wallet.{}", label.to_lowercase()), address);
    }
    for (algorithm, key) in &payload.public_keys {
        push(&format!("key.{}", algorithm.to_lowercase()), key);
    }
    for domain in &payload.verified_domains {
        push("verified_domain", domain);
    }
    push("atproto_handle", &payload.atproto_handle);
    push("atproto_did", &payload.atproto_did);
    push("profile_url", &payload.url);
    push("profile_image", &payload.profile_image);
    push("profile_image_alt", &payload.profile_image_alt);
    push("updated_at", &payload.updated_at);

    lines.join("\n")
}
