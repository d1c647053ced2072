use email_normalize::{ParseError, ParseOptions, parse_message};
use std::collections::BTreeMap;

fn option_name(error: &ParseError) -> Option<&str> {
    match error {
        ParseError::InvalidOption { option, .. } => Some(option.as_str()),
        _ => None,
    }
}

// --- JSON shape ---

#[test]
fn test_from_json_full_shape() {
    let options = ParseOptions::from_json(
        r#"{
            "cleanQuotations": true,
            "cleanSignatures": true,
            "autolink": true,
            "enhanceLinks": true,
            "forceViewport": "width=device-width",
            "noRemoteContent": true,
            "remoteContentReplacements": {"https://a.example/x.png": "https://b.example/x.png"},
            "includeStyle": "p { margin: 0 }",
            "cleanStyles": true
        }"#,
    )
    .unwrap();

    assert!(options.clean_quotations);
    assert!(options.clean_signatures);
    assert!(options.autolink);
    assert!(options.enhance_links);
    assert_eq!(options.force_viewport.as_deref(), Some("width=device-width"));
    assert!(options.no_remote_content);
    assert_eq!(
        options.remote_content_replacements.get("https://a.example/x.png").map(String::as_str),
        Some("https://b.example/x.png")
    );
    assert_eq!(options.include_style.as_deref(), Some("p { margin: 0 }"));
    assert!(options.clean_styles);
}

#[test]
fn test_from_json_defaults_and_false() {
    let options =
        ParseOptions::from_json(r#"{"forceViewport": false, "includeStyle": false}"#).unwrap();

    assert_eq!(options, ParseOptions::default());
    assert_eq!(ParseOptions::from_json("{}").unwrap(), ParseOptions::default());
    assert_eq!(
        ParseOptions::from_json(r#"{"forceViewport": null}"#).unwrap(),
        ParseOptions::default()
    );
}

#[test]
fn test_from_json_rejects_true_for_string_options() {
    let error = ParseOptions::from_json(r#"{"forceViewport": true}"#).unwrap_err();

    assert_eq!(option_name(&error), Some("options"));
}

#[test]
fn test_from_json_rejects_malformed_json() {
    let error = ParseOptions::from_json("{cleanSignatures: yes").unwrap_err();

    assert_eq!(option_name(&error), Some("options"));
}

#[test]
fn test_serialize_uses_false_for_unset_strings() {
    let value = serde_json::to_value(ParseOptions::default()).unwrap();

    assert_eq!(value["forceViewport"], serde_json::json!(false));
    assert_eq!(value["includeStyle"], serde_json::json!(false));
    assert_eq!(value["cleanSignatures"], serde_json::json!(false));
}

// --- Validation ---

#[test]
fn test_validate_accepts_defaults() {
    assert!(ParseOptions::default().validate().is_ok());
}

#[test]
fn test_validate_viewport() {
    let mut options = ParseOptions {
        force_viewport: Some(r#"<meta name="viewport" content="width=device-width">"#.into()),
        ..ParseOptions::default()
    };
    assert!(options.validate().is_ok());

    options.force_viewport = Some("   ".into());
    assert_eq!(
        option_name(&options.validate().unwrap_err()),
        Some("forceViewport")
    );

    options.force_viewport = Some(r#"<meta name="viewport">"#.into());
    assert_eq!(
        option_name(&options.validate().unwrap_err()),
        Some("forceViewport")
    );
}

#[test]
fn test_validate_include_style() {
    let options = ParseOptions {
        include_style: Some("p { color: red }</STYLE><script>alert(1)</script>".into()),
        ..ParseOptions::default()
    };

    assert_eq!(
        option_name(&options.validate().unwrap_err()),
        Some("includeStyle")
    );
}

#[test]
fn test_validate_replacement_patterns() {
    let options = ParseOptions {
        remote_content_replacements: BTreeMap::from([("/[a-/".to_string(), "x".to_string())]),
        ..ParseOptions::default()
    };

    assert_eq!(
        option_name(&options.validate().unwrap_err()),
        Some("remoteContentReplacements")
    );
}

#[test]
fn test_invalid_options_fail_before_parsing() {
    let options = ParseOptions {
        force_viewport: Some(String::new()),
        clean_signatures: true,
        ..ParseOptions::default()
    };

    assert!(parse_message(r#"<div class="gmail_signature">x</div>"#, &options).is_err());
    assert!(parse_message("", &options).is_err());
}
