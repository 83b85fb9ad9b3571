//! vCard 4.0 serializer.

use super::envelope::IdentityPayload;

/// Escape a property value: backslash, newline, semicolon and comma.
pub fn escape_vcard(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            c => out.push(c),
        }
    }
    out
}

/// Turn a custom-field key into an uppercase property-name token.
pub fn sanitize_vcard_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Render the payload as a vCard with CRLF line endings.
pub fn render_vcard(payload: &IdentityPayload) -> String {
    let name = escape_vcard(&payload.display_name);
    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:4.0".to_string(),
        format!("N:;{name};;;"),
        format!("FN:{name}"),
    ];

    property(&mut lines, "EMAIL;TYPE=work:", &payload.email, "");
    property(&mut lines, "TEL;TYPE=cell:", &payload.phone, "");
    property(&mut lines, "ORG:", &payload.organization, "");
    property(&mut lines, "TITLE:", &payload.job_title, "");
    property(&mut lines, "URL:", first_present(&payload.website, &payload.url), "");
    property(
        &mut lines,
        "ADR;TYPE=home:;;",
        first_present(&payload.location, &payload.address),
        ";;;;",
    );
    property(&mut lines, "PHOTO;MEDIATYPE=image/webp:", &payload.profile_image, "");
    property(&mut lines, "NOTE:", &payload.bio, "");
    property(&mut lines, "LANG:", &payload.languages, "");
    for (key, value) in &payload.custom_fields {
        let token = sanitize_vcard_key(key);
        if !token.is_empty() {
            property(&mut lines, &format!("X-{token}:"), value, "");
        }
    }

    lines.push("END:VCARD".to_string());
    lines.join("\r\n")
}

fn property(lines: &mut Vec<String>, prefix: &str, value: &str, suffix: &str) {
    if !value.is_empty() {
        lines.push(format!("{prefix}{}{suffix}", escape_vcard(value)));
    }
}

fn first_present<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}
