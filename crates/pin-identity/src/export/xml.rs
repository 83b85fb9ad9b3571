//! XML serializer: a flat `<identity>` element, no envelope.

use std::fmt::Write as _;

use super::envelope::IdentityPayload;

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const INDENT: &str = "  ";

/// Escape text for use in element content or a double-quoted attribute.
///
/// Characters outside the XML 1.0 `Char` production become U+FFFD.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\r' => out.push_str("&#xD;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            c if !is_xml_char(c) => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

struct XmlWriter {
    buf: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            buf: String::from(XML_HEADER),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
    }

    fn open(&mut self, name: &str) {
        self.indent();
        let _ = writeln!(self.buf, "<{name}>");
        self.depth += 1;
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        let _ = writeln!(self.buf, "</{name}>");
    }

    fn text(&mut self, name: &str, value: &str) {
        self.indent();
        let _ = writeln!(self.buf, "<{name}>{}</{name}>", escape_xml(value));
    }

    fn optional(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.text(name, value);
        }
    }

    fn keyed(&mut self, name: &str, attr: &str, key: &str, value: &str) {
        self.indent();
        let _ = writeln!(
            self.buf,
            "<{name} {attr}=\"{}\">{}</{name}>",
            escape_xml(key),
            escape_xml(value)
        );
    }

    fn finish(mut self) -> String {
        while self.buf.ends_with('\n') {
            self.buf.pop();
        }
        self.buf
    }
}

/// Render the payload as an XML document.
pub fn render_xml(payload: &IdentityPayload) -> String {
    let mut w = XmlWriter::new();
    w.open("identity");
    w.text("handle", &payload.handle);
    w.text("display_name", &payload.display_name);
    w.optional("email", &payload.email);
    w.optional("bio", &payload.bio);
    w.optional("organization", &payload.organization);
    w.optional("job_title", &payload.job_title);
    w.optional("birthdate", &payload.birthdate);
    w.optional("languages", &payload.languages);
    w.optional("phone", &payload.phone);
    w.optional("address", &payload.address);
    w.optional("location", &payload.location);
    w.optional("website", &payload.website);
    w.optional("pronouns", &payload.pronouns);
    w.optional("timezone", &payload.timezone);

    if !payload.custom_fields.is_empty() {
        w.open("custom_fields");
        for (key, value) in &payload.custom_fields {
            w.keyed("field", "key", key, value);
        }
        w.close("custom_fields");
    }

    w.text("profile_url", &payload.url);
    w.text("profile_image", &payload.profile_image);
    w.optional("profile_image_alt", &payload.profile_image_alt);

    if !payload.links.is_empty() {
        w.open("links");
        for link in &payload.links {
            w.open("link");
            w.text("label", &link.label);
            w.text("url", &link.url);
            w.close("link");
        }
        w.close("links");
    }

    if !payload.social.is_empty() {
        w.open("social");
        for profile in &payload.social {
            w.open("profile");
            w.text("label", &profile.label);
            w.text("url", &profile.url);
            w.optional("provider", &profile.provider);
            w.text("verified", if profile.verified { "true" } else { "false" });
            w.close("profile");
        }
        w.close("social");
    }

    if !payload.wallets.is_empty() {
        w.open("wallets");
        for (label, address) in &payload.wallets {
            w.keyed("wallet", "label", label, address);
        }
        w.close("wallets");
    }

    if !payload.public_keys.is_empty() {
        w.open("public_keys");
        for (algorithm, key) in &payload.public_keys {
            w.keyed("key", "algorithm", algorithm, key);
        }
        w.close("public_keys");
    }

    if !payload.verified_domains.is_empty() {
        w.open("verified_domains");
        for domain in &payload.verified_domains {
            w.text("domain", domain);
        }
        w.close("verified_domains");
    }

    w.optional("atproto_handle", &payload.atproto_handle);
    w.optional("atproto_did", &payload.atproto_did);
    w.optional("updated_at", &payload.updated_at);
    w.close("identity");
    w.finish()
}
