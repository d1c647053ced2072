use email_normalize::dom;
use email_normalize::{Document, find_quotations, remove_quotations};

fn body_html(document: &Document) -> String {
    dom::inner_html(&document.body().unwrap()).unwrap()
}

// --- Client families ---

#[test]
fn test_gmail_quote_removed() {
    let document = Document::parse(concat!(
        r#"<div>Sounds good</div><div class="gmail_quote">"#,
        "<div>On Mon, Bob wrote:</div><blockquote>Lunch?</blockquote></div>",
    ));

    let result = remove_quotations(&document).unwrap();

    assert!(result.did_find());
    assert!(result.html().unwrap().starts_with(r#"<div class="gmail_quote">"#));
    assert!(result.plain_text().unwrap().contains("Lunch?"));
    assert_eq!(body_html(&document), "<div>Sounds good</div>");
}

#[test]
fn test_nested_matches_collapse_to_outermost() {
    let document = Document::parse(concat!(
        r#"<p>Reply</p><div class="gmail_quote_container">"#,
        r#"<div class="gmail_quote">old</div></div>"#,
    ));

    let found = find_quotations(&document);

    assert_eq!(found.len(), 1);
    assert_eq!(
        dom::attr(&found[0], "class").as_deref(),
        Some("gmail_quote_container")
    );
}

#[test]
fn test_protonmail_quote_removed() {
    let document =
        Document::parse(r#"<div>New</div><div class="protonmail_quote">Original message</div>"#);

    assert!(remove_quotations(&document).unwrap().did_find());
    assert_eq!(body_html(&document), "<div>New</div>");
}

#[test]
fn test_yahoo_quote_removed() {
    let document =
        Document::parse(r#"<div>New</div><div id="yahoo_quoted_4521">Earlier message</div>"#);

    assert!(remove_quotations(&document).unwrap().did_find());
    assert_eq!(body_html(&document), "<div>New</div>");
}

#[test]
fn test_apple_mail_cite_removed() {
    let document = Document::parse(
        r#"<div>New</div><blockquote type="cite"><div>Earlier message</div></blockquote>"#,
    );

    assert!(remove_quotations(&document).unwrap().did_find());
    assert_eq!(body_html(&document), "<div>New</div>");
}

#[test]
fn test_outlook_web_marker_takes_following_siblings_and_separator() {
    let document = Document::parse(
        r#"<p>Reply</p><hr><div id="divRplyFwdMsg"><b>From:</b> Bob</div><div>Old body</div>"#,
    );

    let result = remove_quotations(&document).unwrap();

    assert!(result.did_find());
    assert!(result.html().unwrap().starts_with("<hr>"));
    assert!(result.plain_text().unwrap().contains("Old body"));
    assert_eq!(body_html(&document), "<p>Reply</p>");
}

#[test]
fn test_outlook_web_marker_inside_collected_sibling_taken_once() {
    let document = Document::parse(concat!(
        r#"<p>Reply</p><div id="appendonsend"></div>"#,
        r#"<div><div id="divRplyFwdMsg">From: x</div><p>old body</p></div>"#,
    ));

    let result = remove_quotations(&document).unwrap();

    assert_eq!(
        result.html(),
        Some(concat!(
            r#"<div id="appendonsend"></div>"#,
            r#"<div><div id="divRplyFwdMsg">From: x</div><p>old body</p></div>"#,
        ))
    );
    assert_eq!(result.plain_text().unwrap().matches("old body").count(), 1);
    assert_eq!(body_html(&document), "<p>Reply</p>");
}

#[test]
fn test_outlook_desktop_reply_header() {
    let document = Document::parse(concat!(
        r#"<div class="WordSection1"><p>Reply text</p>"#,
        r#"<div style="border:none;border-top:solid #E1E1E1 1.0pt;padding:3.0pt 0in 0in 0in">"#,
        r#"<p><b>From:</b> Bob Smith<br><b>Sent:</b> Monday</p></div>"#,
        r#"<p>Old message</p></div>"#,
    ));

    let result = remove_quotations(&document).unwrap();

    assert!(result.did_find());
    assert_eq!(
        body_html(&document),
        r#"<div class="WordSection1"><p>Reply text</p></div>"#
    );
}

#[test]
fn test_outlook_desktop_border_without_sender_is_kept() {
    let document = Document::parse(concat!(
        r#"<p>Reply</p><div style="border-top:solid #E1E1E1 1.0pt">Just a divider</div>"#,
        "<p>More</p>",
    ));

    assert!(find_quotations(&document).is_empty());
}

#[test]
fn test_outlook_desktop_header_climbs_single_child_wrappers() {
    let document = Document::parse(concat!(
        r#"<p>Reply</p>"#,
        r#"<div id="wrap"><div style="border:none;border-top:solid #B5C4DF 1.0pt">"#,
        r#"<p>Von: Anna</p></div></div>"#,
        r#"<p>Alte Nachricht</p>"#,
    ));

    let found = find_quotations(&document);

    assert_eq!(dom::attr(&found[0], "id").as_deref(), Some("wrap"));
    assert_eq!(found.len(), 2);
}

// --- Generic blockquote ---

#[test]
fn test_attributed_blockquote_removed_with_attribution() {
    let document = Document::parse(concat!(
        "<p>Thanks!</p>",
        "<div>On Mon, Jan 1, 2024 at 10:00 AM Bob &lt;bob@example.com&gt; wrote:</div>",
        "<blockquote><div>Old message</div></blockquote>",
    ));

    let result = remove_quotations(&document).unwrap();

    assert!(result.did_find());
    assert_eq!(
        result.plain_text(),
        Some("On Mon, Jan 1, 2024 at 10:00 AM Bob <bob@example.com> wrote:\nOld message")
    );
    assert_eq!(body_html(&document), "<p>Thanks!</p>");
}

#[test]
fn test_french_attribution() {
    let document = Document::parse(concat!(
        "<p>Merci</p><div>Le lun. 1 janv. 2024, Bob a écrit :</div>",
        "<br><blockquote>Ancien</blockquote>",
    ));

    assert_eq!(find_quotations(&document).len(), 2);
}

#[test]
fn test_bare_blockquote_is_content() {
    let document =
        Document::parse("<p>As the saying goes:</p><blockquote>Less is more</blockquote>");
    let before = document.to_html().unwrap();

    let result = remove_quotations(&document).unwrap();

    assert!(!result.did_find());
    assert_eq!(result.plain_text(), None);
    assert_eq!(result.html(), None);
    assert_eq!(document.to_html().unwrap(), before);
}

// --- Rule priority ---

#[test]
fn test_first_matching_family_wins() {
    let document = Document::parse(concat!(
        "<p>On Mon, Ann wrote:</p><blockquote>first</blockquote>",
        r#"<div class="gmail_quote">second</div>"#,
    ));

    remove_quotations(&document).unwrap();

    let html = body_html(&document);
    assert!(html.contains("first"));
    assert!(!html.contains("second"));
}

#[test]
fn test_quotation_text_collapses_blocks() {
    let document = Document::parse(
        r#"<div class="gmail_quote"><div>line one</div><div>line two</div></div>"#,
    );

    let result = remove_quotations(&document).unwrap();

    assert_eq!(result.plain_text(), Some("line one\nline two"));
}
