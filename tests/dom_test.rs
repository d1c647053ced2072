use email_normalize::dom;
use email_normalize::{Document, Selector};

fn first(document: &Document, selector: &str) -> dom::Handle {
    document
        .select(&Selector::parse(selector).unwrap())
        .into_iter()
        .next()
        .unwrap()
}

fn body_html(document: &Document) -> String {
    dom::inner_html(&document.body().unwrap()).unwrap()
}

// --- Parsing and serialization ---

#[test]
fn test_parse_fragment_builds_skeleton() {
    let document = Document::parse("<p>Hi</p>");

    assert!(document.html_element().is_some());
    assert!(document.head().is_some());
    assert_eq!(
        document.to_html().unwrap(),
        "<html><head></head><body><p>Hi</p></body></html>"
    );
}

#[test]
fn test_parse_repairs_malformed_markup() {
    let document = Document::parse("<div><p>Unclosed <b>bold</div>");

    assert_eq!(document.text(), "Unclosed bold");
    assert!(document.to_html().unwrap().ends_with("</body></html>"));
}

#[test]
fn test_outer_and_inner_html() {
    let document = Document::parse(r#"<div class="box"><span>a</span>b</div>"#);
    let div = first(&document, "div.box");

    assert_eq!(
        dom::outer_html(&div).unwrap(),
        r#"<div class="box"><span>a</span>b</div>"#
    );
    assert_eq!(dom::inner_html(&div).unwrap(), "<span>a</span>b");
}

// --- Inspection ---

#[test]
fn test_attr_lookup_ignores_case() {
    let document = Document::parse(r#"<div ID="main" data-x="1"></div>"#);
    let div = first(&document, "div");

    assert_eq!(dom::attr(&div, "id").as_deref(), Some("main"));
    assert_eq!(dom::attr(&div, "DATA-X").as_deref(), Some("1"));
    assert!(!dom::has_attr(&div, "class"));
    assert_eq!(dom::tag_name(&div), Some("div"));
}

#[test]
fn test_siblings_and_ancestors() {
    let document = Document::parse("<div><p id=a>1</p><p id=b>2</p><p id=c>3</p></div>");
    let b = first(&document, "#b");

    let before: Vec<_> = dom::preceding_siblings(&b)
        .iter()
        .filter_map(|node| dom::attr(node, "id"))
        .collect();
    let after: Vec<_> = dom::next_element_siblings(&b)
        .iter()
        .filter_map(|node| dom::attr(node, "id"))
        .collect();
    assert_eq!(before, vec!["a"]);
    assert_eq!(after, vec!["c"]);

    let chain: Vec<_> = dom::ancestors(&b)
        .filter_map(|node| dom::tag_name(&node).map(str::to_string))
        .collect();
    assert_eq!(chain, vec!["div", "body", "html"]);
}

#[test]
fn test_descendants_in_document_order() {
    let document = Document::parse("<div><p>a</p><span>b</span></div>");
    let div = first(&document, "div");

    let tags: Vec<_> = dom::descendants(&div)
        .iter()
        .filter_map(|node| dom::tag_name(node).map(str::to_string))
        .collect();
    assert_eq!(tags, vec!["p", "span"]);
    assert_eq!(dom::text_content(&div), "ab");
}

// --- Block text ---

#[test]
fn test_block_text_breaks_between_blocks() {
    let document = Document::parse("<div><div>John Doe</div><div>CEO</div><p>Acme</p></div>");
    let outer = first(&document, "div");

    assert_eq!(dom::block_text(&outer), "John Doe\nCEO\nAcme");
}

#[test]
fn test_block_text_squashes_blank_lines() {
    let document = Document::parse("<div>A</div>\n\n\n<div>B</div>");
    let body = document.body().unwrap();

    assert_eq!(dom::block_text(&body), "A\nB");
}

#[test]
fn test_block_text_breaks_at_br() {
    let document = Document::parse("<div>John<br>CEO</div>");
    let div = first(&document, "div");

    assert_eq!(dom::block_text(&div), "John\nCEO");
}

#[test]
fn test_block_text_leaves_tree_untouched() {
    let document = Document::parse("<div><div>a</div><div>b</div></div>");
    let before = document.to_html().unwrap();

    let _ = dom::block_text(&first(&document, "div"));

    assert_eq!(document.to_html().unwrap(), before);
}

// --- Mutation ---

#[test]
fn test_detach_removes_subtree() {
    let document = Document::parse("<p>keep</p><div><span>gone</span></div>");
    dom::detach(&first(&document, "div"));

    assert_eq!(body_html(&document), "<p>keep</p>");
}

#[test]
fn test_set_and_remove_attr() {
    let document = Document::parse(r#"<a href="x">link</a>"#);
    let anchor = first(&document, "a");

    dom::set_attr(&anchor, "href", "y");
    dom::set_attr(&anchor, "title", "t");
    assert_eq!(body_html(&document), r#"<a href="y" title="t">link</a>"#);

    assert_eq!(dom::remove_attr(&anchor, "href").as_deref(), Some("y"));
    assert_eq!(dom::remove_attr(&anchor, "href"), None);
    assert_eq!(body_html(&document), r#"<a title="t">link</a>"#);
}

#[test]
fn test_insert_before_and_replace_with() {
    let document = Document::parse("<p>a</p><p>c</p>");
    let paragraphs = document.select(&Selector::parse("p").unwrap());

    let b = dom::create_element("p", &[]);
    dom::append(&b, dom::create_text("b"));
    dom::insert_before(&paragraphs[1], b);
    assert_eq!(body_html(&document), "<p>a</p><p>b</p><p>c</p>");

    dom::replace_with(&paragraphs[0], dom::create_text("z"));
    assert_eq!(body_html(&document), "z<p>b</p><p>c</p>");
    assert!(dom::parent(&paragraphs[0]).is_none());
}

#[test]
fn test_wrap_all_takes_place_of_first_node() {
    let document = Document::parse("<h1>t</h1><p>a</p><p>b</p><span>c</span>");
    let paragraphs = document.select(&Selector::parse("p").unwrap());

    let wrapper = dom::wrap_all(&paragraphs, dom::create_element("div", &[("class", "w")]));

    assert_eq!(dom::tag_name(&wrapper), Some("div"));
    assert_eq!(
        body_html(&document),
        r#"<h1>t</h1><div class="w"><p>a</p><p>b</p></div><span>c</span>"#
    );
}

#[test]
fn test_insert_before_detached_reference_is_noop() {
    let orphan = dom::create_element("div", &[]);
    let text = dom::create_text("x");

    dom::insert_before(&orphan, text.clone());

    assert!(dom::parent(&text).is_none());
}

#[test]
fn test_set_text() {
    let document = Document::parse("<p>old</p>");
    let text = dom::children(&first(&document, "p")).remove(0);

    dom::set_text(&text, "new & improved");

    assert_eq!(body_html(&document), "<p>new &amp; improved</p>");
}

// --- Cloning ---

#[test]
fn test_deep_clone_is_independent() {
    let document = Document::parse(r#"<div class="a"><p>one</p></div>"#);
    let copy = document.deep_clone();

    dom::detach(&first(&copy, "p"));
    dom::set_attr(&first(&copy, "div"), "class", "b");

    assert_eq!(body_html(&document), r#"<div class="a"><p>one</p></div>"#);
    assert_eq!(body_html(&copy), r#"<div class="b"></div>"#);
}

#[test]
fn test_deep_clone_keeps_root_attributes() {
    let document = Document::parse(
        r#"<html xmlns:m="http://schemas.microsoft.com/office/2004/12/omml"><body>x</body></html>"#,
    );
    let copy = document.deep_clone();

    let namespace = dom::attr(&copy.html_element().unwrap(), "xmlns:m").unwrap();
    assert!(namespace.contains("microsoft"));
}

#[test]
fn test_deep_clone_mapped_points_back_to_originals() {
    let document = Document::parse(r#"<div id="a"><p id="b">x</p></div>"#);
    let (copy, origins) = document.deep_clone_mapped();

    let copied = first(&copy, "#b");
    let original = origins.original(&copied).unwrap();

    assert!(std::rc::Rc::ptr_eq(original, &first(&document, "#b")));
    assert!(origins.original(&first(&document, "#b")).is_none());
    assert_eq!(origins.len(), dom::descendants(document.root()).len() + 1);
}

#[test]
fn test_deep_clone_survives_deep_nesting() {
    let depth = 50_000;
    let handle = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(move || {
            let document = Document::parse(&format!("{}x", "<div>".repeat(depth)));
            let copy = document.deep_clone();
            let (mapped, origins) = document.deep_clone_mapped();
            (
                copy.to_html().unwrap() == document.to_html().unwrap(),
                dom::descendants(mapped.root()).len() + 1 == origins.len(),
                copy.text(),
            )
        })
        .unwrap();

    let (same_html, fully_mapped, text) = handle.join().unwrap();

    assert!(same_html);
    assert!(fully_mapped);
    assert_eq!(text, "x");
}
