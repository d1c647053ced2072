//! Mutable HTML document backed by `markup5ever_rcdom`
//!
//! Parsing never fails: html5ever repairs malformed markup the same way a
//! browser would, so every input string yields a `<html><head><body>`
//! skeleton. Node helpers are free functions over [`Handle`] so they work on
//! attached and detached subtrees alike.

use crate::error::{ParseError, Result};
use crate::selector::{self, Selector};
use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever::{Attribute, LocalName, QualName, namespace_url, ns};
use markup5ever_rcdom::{Node, NodeData, RcDom, SerializableHandle};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub use markup5ever_rcdom::Handle;

static LINE_BREAKS: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(\s?\n)+").unwrap());

/// An owned HTML document
///
/// Not `Clone`: copies are made with [`Document::deep_clone`], which never
/// shares nodes with the source tree.
pub struct Document {
    root: Handle,
}

impl Document {
    /// Parse an HTML string, repairing malformed markup
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        Self {
            root: dom.document.clone(),
        }
    }

    /// The document node
    #[must_use]
    pub const fn root(&self) -> &Handle {
        &self.root
    }

    /// The `<html>` element
    #[must_use]
    pub fn html_element(&self) -> Option<Handle> {
        element_children(&self.root)
            .into_iter()
            .find(|node| is_element(node, "html"))
    }

    #[must_use]
    pub fn head(&self) -> Option<Handle> {
        self.html_child("head")
    }

    #[must_use]
    pub fn body(&self) -> Option<Handle> {
        self.html_child("body")
    }

    fn html_child(&self, tag: &str) -> Option<Handle> {
        self.html_element().and_then(|html| {
            element_children(&html)
                .into_iter()
                .find(|node| is_element(node, tag))
        })
    }

    /// All elements matching `selector`, in document order
    #[must_use]
    pub fn select(&self, selector: &Selector) -> Vec<Handle> {
        selector::select(&self.root, selector)
    }

    /// Independent copy of the whole tree
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            root: deep_clone(&self.root),
        }
    }

    /// Independent copy plus a map from every copied node to its original
    #[must_use]
    pub fn deep_clone_mapped(&self) -> (Self, NodeMap) {
        let (root, origins) = deep_clone_mapped(&self.root);
        (Self { root }, origins)
    }

    /// Serialize the document back to HTML
    pub fn to_html(&self) -> Result<String> {
        inner_html(&self.root)
    }

    /// Concatenated text of every text node
    #[must_use]
    pub fn text(&self) -> String {
        text_content(&self.root)
    }
}

// --- Inspection ---

/// Lowercase tag name of an element node
#[must_use]
pub fn tag_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(&*name.local),
        _ => None,
    }
}

#[must_use]
pub fn is_element(node: &Handle, tag: &str) -> bool {
    tag_name(node).is_some_and(|name| name.eq_ignore_ascii_case(tag))
}

#[must_use]
pub fn attr(node: &Handle, name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| (*attr.name.local).eq_ignore_ascii_case(name))
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

#[must_use]
pub fn has_attr(node: &Handle, name: &str) -> bool {
    attr(node, name).is_some()
}

/// Contents of a text node
#[must_use]
pub fn text_of(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Text { ref contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// Whitespace-only text node
#[must_use]
pub fn is_blank_text(node: &Handle) -> bool {
    text_of(node).is_some_and(|text| text.trim().is_empty())
}

#[must_use]
pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

/// Parents from the nearest up to the document node
pub fn ancestors(node: &Handle) -> impl Iterator<Item = Handle> + use<> {
    std::iter::successors(parent(node), parent)
}

#[must_use]
pub fn children(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

#[must_use]
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| tag_name(child).is_some())
        .cloned()
        .collect()
}

/// Every node below `node` in document order, `node` itself excluded
#[must_use]
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(next) = stack.pop() {
        stack.extend(next.children.borrow().iter().rev().cloned());
        found.push(next);
    }
    found
}

/// Element siblings after `node`, nearest first
#[must_use]
pub fn next_element_siblings(node: &Handle) -> Vec<Handle> {
    following_siblings(node)
        .into_iter()
        .filter(|sibling| tag_name(sibling).is_some())
        .collect()
}

/// All sibling nodes after `node`, nearest first
#[must_use]
pub fn following_siblings(node: &Handle) -> Vec<Handle> {
    let Some(parent) = parent(node) else {
        return Vec::new();
    };
    let siblings = parent.children.borrow();
    siblings
        .iter()
        .position(|child| Rc::ptr_eq(child, node))
        .map(|index| siblings[index + 1..].to_vec())
        .unwrap_or_default()
}

/// All sibling nodes before `node`, nearest first
#[must_use]
pub fn preceding_siblings(node: &Handle) -> Vec<Handle> {
    let Some(parent) = parent(node) else {
        return Vec::new();
    };
    let siblings = parent.children.borrow();
    siblings
        .iter()
        .position(|child| Rc::ptr_eq(child, node))
        .map(|index| siblings[..index].iter().rev().cloned().collect())
        .unwrap_or_default()
}

#[must_use]
pub fn text_content(node: &Handle) -> String {
    if let Some(text) = text_of(node) {
        return text;
    }
    descendants(node)
        .iter()
        .filter_map(text_of)
        .collect::<String>()
}

/// Readable text of a subtree: a line break before every `div`/`p` after the
/// first and before every `br`, trimmed, with runs of line breaks squashed.
/// Works on a copy, `node` is left untouched.
#[must_use]
pub fn block_text(node: &Handle) -> String {
    let copy = deep_clone(node);
    let blocks = descendants(&copy)
        .into_iter()
        .filter(|child| is_element(child, "div") || is_element(child, "p"));
    for (index, block) in blocks.enumerate() {
        if index > 0 {
            insert_before(&block, create_text("\n"));
        }
    }
    for line_break in descendants(&copy)
        .into_iter()
        .filter(|child| is_element(child, "br"))
    {
        insert_before(&line_break, create_text("\n"));
    }
    LINE_BREAKS
        .replace_all(text_content(&copy).trim(), "\n")
        .into_owned()
}

// --- Serialization ---

fn serialize_node(node: &Handle, traversal_scope: TraversalScope) -> Result<String> {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope,
        ..SerializeOpts::default()
    };
    serialize(&mut bytes, &SerializableHandle::from(node.clone()), opts)
        .map_err(|e| ParseError::Serialize(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ParseError::Serialize(e.to_string()))
}

/// HTML of the node including its own tag
pub fn outer_html(node: &Handle) -> Result<String> {
    match node.data {
        NodeData::Document => inner_html(node),
        _ => serialize_node(node, TraversalScope::IncludeNode),
    }
}

/// HTML of the node's children
pub fn inner_html(node: &Handle) -> Result<String> {
    serialize_node(node, TraversalScope::ChildrenOnly(None))
}

// --- Construction ---

fn new_attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

/// Detached HTML element
#[must_use]
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(
            attrs
                .iter()
                .map(|(name, value)| new_attribute(name, value))
                .collect(),
        ),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Detached text node
#[must_use]
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// Detached copy of a subtree sharing nothing with the original
#[must_use]
pub fn deep_clone(node: &Handle) -> Handle {
    clone_tree(node, None)
}

/// Copy of a subtree together with the way back to its originals
#[must_use]
pub fn deep_clone_mapped(node: &Handle) -> (Handle, NodeMap) {
    let mut origins = NodeMap::default();
    let copy = clone_tree(node, Some(&mut origins));
    (copy, origins)
}

/// Maps nodes of a copy made by [`deep_clone_mapped`] to their originals
///
/// Keys are node addresses, so lookups are only meaningful while the copy
/// is alive.
#[derive(Default)]
pub struct NodeMap {
    origins: HashMap<*const Node, Handle>,
}

impl NodeMap {
    /// The node `copy` was cloned from
    #[must_use]
    pub fn original(&self, copy: &Handle) -> Option<&Handle> {
        self.origins.get(&Rc::as_ptr(copy))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

// Explicit work stack: mail bodies can nest far deeper than the call stack allows.
fn clone_tree(node: &Handle, mut origins: Option<&mut NodeMap>) -> Handle {
    let root = clone_node(node);
    let mut pending = vec![(node.clone(), root.clone())];
    while let Some((source, copy)) = pending.pop() {
        for child in source.children.borrow().iter() {
            let child_copy = clone_node(child);
            append(&copy, child_copy.clone());
            pending.push((child.clone(), child_copy));
        }
        if let Some(map) = origins.as_deref_mut() {
            map.origins.insert(Rc::as_ptr(&copy), source);
        }
    }
    root
}

/// Copy of the node alone, without children
fn clone_node(node: &Handle) -> Handle {
    let data = match node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            ref name,
            ref public_id,
            ref system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { ref contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { ref contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            ref name,
            ref attrs,
            ref template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(
                template_contents.borrow().as_ref().map(deep_clone),
            ),
            mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction {
            ref target,
            ref contents,
        } => NodeData::ProcessingInstruction {
            target: target.clone(),
            contents: contents.clone(),
        },
    };
    Node::new(data)
}

// --- Mutation ---

pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs
            .iter_mut()
            .find(|attr| (*attr.name.local).eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.value = StrTendril::from_slice(value),
            None => attrs.push(new_attribute(name, value)),
        }
    }
}

pub fn remove_attr(node: &Handle, name: &str) -> Option<String> {
    let NodeData::Element { ref attrs, .. } = node.data else {
        return None;
    };
    let mut attrs = attrs.borrow_mut();
    let index = attrs
        .iter()
        .position(|attr| (*attr.name.local).eq_ignore_ascii_case(name))?;
    Some(attrs.remove(index).value.to_string())
}

/// Replace the contents of a text node
pub fn set_text(node: &Handle, text: &str) {
    if let NodeData::Text { ref contents } = node.data {
        *contents.borrow_mut() = StrTendril::from_slice(text);
    }
}

/// Remove a node (and its subtree) from its parent
pub fn detach(node: &Handle) {
    if let Some(parent) = parent(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// Move `child` to the end of `parent`'s children
pub fn append(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Move `child` to the front of `parent`'s children
pub fn prepend(parent: &Handle, child: Handle) {
    let first = parent.children.borrow().first().cloned();
    match first {
        Some(first) => insert_before(&first, child),
        None => append(parent, child),
    }
}

/// Move `node` directly before `reference`; no-op when `reference` is detached
pub fn insert_before(reference: &Handle, node: Handle) {
    let Some(parent) = parent(reference) else {
        return;
    };
    detach(&node);
    let mut siblings = parent.children.borrow_mut();
    let index = siblings
        .iter()
        .position(|child| Rc::ptr_eq(child, reference))
        .unwrap_or(siblings.len());
    node.parent.set(Some(Rc::downgrade(&parent)));
    siblings.insert(index, node);
}

/// Put `replacement` where `node` is and detach `node`
pub fn replace_with(node: &Handle, replacement: Handle) {
    insert_before(node, replacement);
    detach(node);
}

/// Move `nodes` into `wrapper`, which takes the place of the first node
pub fn wrap_all(nodes: &[Handle], wrapper: Handle) -> Handle {
    if let Some(first) = nodes.first() {
        insert_before(first, wrapper.clone());
    }
    for node in nodes {
        append(&wrapper, node.clone());
    }
    wrapper
}
