//! ActivityPub profile attachments (`PropertyValue` entries).

use serde::{Deserialize, Serialize};

use super::envelope::IdentityPayload;

/// Wallet labels surfaced as attachments, in display order.
const WALLET_LABELS: [&str; 4] = ["btc", "eth", "sol", "xrp"];

/// Key algorithms surfaced as attachments with their display names.
const KEY_LABELS: [(&str, &str); 3] = [("pgp", "PGP"), ("ssh", "SSH"), ("age", "age")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub value: String,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "PropertyValue".to_string(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Attachments for a payload. Build from a public payload only.
pub fn build_attachments(payload: &IdentityPayload) -> Vec<PropertyValue> {
    let mut out = Vec::new();
    let mut add = |name: &str, value: &str| {
        let value = value.trim();
        if !value.is_empty() {
            out.push(PropertyValue::new(name, value));
        }
    };

    add("Location", &payload.location);
    add("Website", &payload.website);
    add("Pronouns", &payload.pronouns);
    add("Timezone", &payload.timezone);
    for domain in &payload.verified_domains {
        add("Verified Domain", domain);
    }
    for label in WALLET_LABELS {
        if let Some(address) = payload.wallets.get(label) {
            add(&label.to_uppercase(), address);
        }
    }
    for (algorithm, name) in KEY_LABELS {
        if let Some(key) = payload.public_keys.get(algorithm) {
            add(name, key);
        }
    }
    for profile in &payload.social {
        let label = match profile.label.trim() {
            "" => "Social",
            label => label,
        };
        let label = if profile.verified {
            format!("{label} (verified)")
        } else {
            label.to_string()
        };
        add(&label, &profile.url);
    }
    out
}
