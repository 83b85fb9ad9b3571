//! Edge case tests: visibility defaults and overrides, collection filtering,
//! domain normalization, persistence codecs, serializer escaping.

use pin_identity::domains::{normalize_domain, parse_domains, verified_domains};
use pin_identity::export::{escape_vcard, escape_xml, render_vcard, IdentityPayload};
use pin_identity::identity::{
    decode_links, decode_social_profiles, encode_links, is_atproto_handle_verified, Handle,
    Identity, IdentityId, Link, SocialProfile, Visibility, VisibilityMap,
};
use pin_identity::projection::{project, View};

fn full_identity() -> Identity {
    let mut identity = Identity::new(IdentityId(42), Handle::parse("  Carol ").unwrap());
    identity.display_name = "Carol".into();
    identity.email = "carol@example.com".into();
    identity.phone = "+49 30 1234".into();
    identity.address = "1 Main St".into();
    identity.birthdate = "1990-01-01".into();
    identity.location = "Berlin".into();
    identity.private_token = "pin:carol".into();
    identity
}

// === Visibility Edge Cases ===

#[test]
fn edge_visibility_normalization() {
    assert_eq!(Visibility::normalize(" PRIVATE "), Visibility::Private);
    assert_eq!(Visibility::normalize("Private"), Visibility::Private);
    assert_eq!(Visibility::normalize("secret"), Visibility::Public);
    assert_eq!(Visibility::normalize(""), Visibility::Public);
}

#[test]
fn edge_default_private_fields_hidden_until_made_public() {
    let mut identity = full_identity();
    let public = project(&identity, View::Public).identity;
    assert_eq!(public.email, "");
    assert_eq!(public.phone, "");
    assert_eq!(public.address, "");
    assert_eq!(public.birthdate, "");
    assert_eq!(public.location, "Berlin");

    identity.visibility.set("phone", Visibility::Public);
    let public = project(&identity, View::Public).identity;
    assert_eq!(public.phone, "+49 30 1234");
    assert_eq!(public.email, "");
}

#[test]
fn edge_private_view_keeps_everything() {
    let mut identity = full_identity();
    identity.visibility.set("location", Visibility::Private);
    identity.visibility.set("wallet.btc", Visibility::Private);
    identity.wallets.insert("btc".into(), "bc1q".into());

    let private = project(&identity, View::Private).identity;
    assert_eq!(private.location, "Berlin");
    assert_eq!(private.email, "carol@example.com");
    assert_eq!(private.private_token, "pin:carol");
    assert_eq!(private.wallets.len(), 1);
}

#[test]
fn edge_public_view_never_carries_token() {
    let identity = full_identity();
    assert_eq!(project(&identity, View::Public).identity.private_token, "");
    // The caller's record is untouched.
    assert_eq!(identity.private_token, "pin:carol");
}

#[test]
fn edge_entry_flag_or_key_hides_collection_items() {
    let mut identity = full_identity();
    let mut hidden = Link::new("Hidden", "https://hidden.example");
    hidden.visibility = Some(Visibility::Private);
    identity.links = vec![
        Link::new("Blog", "https://blog.example"),
        hidden,
        Link::new("Shop", "https://shop.example"),
    ];
    identity.social_profiles = vec![
        SocialProfile::new("Mastodon", "https://m.example/@carol"),
        SocialProfile::new("Forge", "https://forge.example/carol"),
    ];
    identity.visibility.set("link:2", Visibility::Private);
    identity.visibility.set("social:0", Visibility::Private);

    let public = project(&identity, View::Public).identity;
    let links: Vec<_> = public.links.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(links, vec!["Blog"]);
    let social: Vec<_> = public.social_profiles.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(social, vec!["Forge"]);
}

#[test]
fn edge_wallet_and_key_flags_ignore_case() {
    let mut identity = full_identity();
    identity.wallets.insert("BTC".into(), "bc1q".into());
    identity.wallets.insert("eth".into(), "0xabc".into());
    identity.public_keys.insert("SSH".into(), "ssh-ed25519 AAAA".into());
    identity.visibility.set("wallet.btc", Visibility::Private);
    identity.visibility.set("key.ssh", Visibility::Private);

    let public = project(&identity, View::Public).identity;
    assert_eq!(public.wallets.keys().collect::<Vec<_>>(), vec!["eth"]);
    assert!(public.public_keys.is_empty());
}

#[test]
fn edge_custom_fields_split_and_stripped() {
    let mut identity = full_identity();
    identity.custom_fields.insert("team".into(), " Infra ".into());
    identity.custom_fields.insert("blank".into(), "   ".into());
    identity.custom_fields.insert("salary".into(), "lots".into());
    identity.visibility.set("custom.salary", Visibility::Private);

    let public = project(&identity, View::Public);
    assert!(public.identity.custom_fields.is_empty());
    assert_eq!(public.custom_fields.len(), 1);
    assert_eq!(public.custom_fields["team"], "Infra");

    let private = project(&identity, View::Private);
    assert_eq!(private.custom_fields.len(), 2);
    assert!(!private.custom_fields.contains_key("blank"));
}

#[test]
fn edge_verified_domain_can_be_hidden() {
    let mut identity = full_identity();
    identity.verified_domains = vec!["carol.dev".into(), "Work.Example".into()];
    identity.visibility.set("verified_domain:work.example", Visibility::Private);
    let public = project(&identity, View::Public).identity;
    assert_eq!(public.verified_domains, vec!["carol.dev"]);
}

#[test]
fn edge_many_links_keep_order() {
    let mut identity = full_identity();
    identity.links = (0..500)
        .map(|i| Link::new(format!("link-{i}"), format!("https://l{i}.example")))
        .collect();
    for i in (1..500).step_by(2) {
        identity.visibility.set(format!("link:{i}"), Visibility::Private);
    }

    let public = project(&identity, View::Public).identity;
    assert_eq!(public.links.len(), 250);
    for (n, link) in public.links.iter().enumerate() {
        assert_eq!(link.label, format!("link-{}", n * 2));
    }
}

// === Domain Edge Cases ===

#[test]
fn edge_domain_normalization() {
    assert_eq!(normalize_domain("HTTPS://Example.COM/path/x"), Some("example.com".into()));
    assert_eq!(normalize_domain("  http://a.example/ "), Some("a.example".into()));
    assert_eq!(normalize_domain("//b.example//"), Some("b.example".into()));
    assert_eq!(normalize_domain("localhost:8080"), Some("localhost:8080".into()));
    assert_eq!(normalize_domain("https://"), None);
    assert_eq!(normalize_domain("   "), None);
}

#[test]
fn edge_parse_domain_lists() {
    assert_eq!(
        parse_domains("a.example, https://B.example/x\r\n\n,,c.example"),
        vec!["a.example", "b.example", "c.example"]
    );
    assert!(parse_domains(" , \n ").is_empty());
    assert!(verified_domains(&[]).is_empty());
}

#[test]
fn edge_atproto_handle_under_verified_domain() {
    let verified = vec!["carol.dev".to_string()];
    assert!(is_atproto_handle_verified("Carol.Dev", &verified));
    assert!(is_atproto_handle_verified("bsky.carol.dev", &verified));
    assert!(!is_atproto_handle_verified("carol.example", &verified));
    assert!(!is_atproto_handle_verified("evilcarol.dev", &verified));
    assert!(!is_atproto_handle_verified("", &verified));
}

// === Codec Edge Cases ===

#[test]
fn edge_blank_codec_input_is_empty() {
    assert_eq!(encode_links(&[]).unwrap(), "");
    assert!(decode_links("  ").unwrap().is_empty());
    assert!(decode_social_profiles("").unwrap().is_empty());
    assert!(VisibilityMap::decode("\n").unwrap().is_empty());
    assert!(decode_links("not json").is_err());
}

#[test]
fn edge_visibility_document_is_stable() {
    let mut a = VisibilityMap::new();
    a.set("phone", Visibility::Public);
    a.set("email", Visibility::Private);
    let mut b = VisibilityMap::new();
    b.set("email", Visibility::Private);
    b.set("phone", Visibility::Public);
    assert_eq!(a.encode().unwrap(), b.encode().unwrap());

    let decoded = VisibilityMap::decode(&a.encode().unwrap()).unwrap();
    assert_eq!(decoded, a);
}

// === Serializer Edge Cases ===

fn unescape_vcard(value: &str) -> String {
    let mut out = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[test]
fn edge_vcard_escaping_is_recoverable() {
    for raw in [
        "plain",
        "Doe, Jane; Jr.",
        r"C:\path\to",
        "two\nlines",
        r"ends with \",
        "\\;\\,",
    ] {
        assert_eq!(unescape_vcard(&escape_vcard(raw)), raw, "input {raw:?}");
    }
}

#[test]
fn edge_vcard_display_name_survives_rendering() {
    let name = "Doe, Jane; C:\\x\nJr";
    let payload: IdentityPayload = serde_json::from_value(serde_json::json!({
        "handle": "jane",
        "display_name": name,
        "url": "https://pin.example/jane",
        "updated_at": "2025-01-01T00:00:00Z"
    }))
    .unwrap();

    let card = render_vcard(&payload);
    let fn_line = card
        .split("\r\n")
        .find_map(|l| l.strip_prefix("FN:"))
        .expect("card has an FN line");
    assert_eq!(fn_line, r"Doe\, Jane\; C:\\x\nJr");
    assert_eq!(unescape_vcard(fn_line), name);
}

#[test]
fn edge_vcard_lines_never_break_inside_values() {
    let payload: IdentityPayload = serde_json::from_value(serde_json::json!({
        "handle": "carol",
        "display_name": "Carol\r\nEvil:Injected",
        "url": "https://pin.example/carol",
        "updated_at": "2025-01-01T00:00:00Z",
        "bio": "line one\nEND:VCARD"
    }))
    .unwrap();

    let card = render_vcard(&payload);
    let lines: Vec<&str> = card.split("\r\n").collect();
    assert_eq!(lines.iter().filter(|l| **l == "END:VCARD").count(), 1);
    assert_eq!(lines.last(), Some(&"END:VCARD"));
    assert!(!lines.iter().any(|l| l.starts_with("Evil")));
}

#[test]
fn edge_xml_escaping() {
    assert_eq!(
        escape_xml(r#"<a href="x">Tom & 'Jerry'</a>"#),
        "&lt;a href=&#34;x&#34;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
    );
}
