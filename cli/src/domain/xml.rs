//! Small helpers over `xmltree` shared by the record types.
//!
//! Pure functions only. Parsing and serialization work on in-memory strings;
//! reading and writing files is the store's job.

use xmltree::{Element, EmitterConfig, XMLNode};

/// Parse an XML document from a string.
///
/// # Errors
///
/// Returns an error if the text is not well-formed XML.
pub fn parse(text: &str) -> Result<Element, xmltree::ParseError> {
    Element::parse(text.as_bytes())
}

/// Serialize an element as an indented document with an XML declaration.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn to_pretty_string(root: &Element) -> Result<String, xmltree::Error> {
    let mut buf = Vec::new();
    root.write_with_config(
        &mut buf,
        EmitterConfig {
            perform_indent: true,
            ..Default::default()
        },
    )?;
    buf.push(b'\n');
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Re-parse and pretty-print a document, dropping insignificant whitespace.
///
/// # Errors
///
/// Returns an error if the text is not well-formed XML.
pub fn normalize(text: &str) -> anyhow::Result<String> {
    let root = parse(text)?;
    Ok(to_pretty_string(&root)?)
}

/// Attribute value by name.
#[must_use]
pub fn attr<'a>(el: &'a Element, name: &str) -> Option<&'a str> {
    el.attributes.get(name).map(String::as_str)
}

/// Set `name` to `value`, or remove it when `value` is `None`.
pub fn set_opt_attr(el: &mut Element, name: &str, value: Option<&str>) {
    match value {
        Some(v) => {
            el.attributes.insert(name.to_string(), v.to_string());
        }
        None => {
            el.attributes.remove(name);
        }
    }
}

/// Child elements with the given tag name, in document order.
pub fn children_named<'a>(el: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    el.children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(move |c| c.name == name)
}

/// Follow a path of child element names, taking the first match at each step.
pub fn descend_mut<'a>(el: &'a mut Element, path: &[&str]) -> Option<&'a mut Element> {
    path.iter().try_fold(el, |cur, name| cur.get_mut_child(*name))
}

/// Read-only variant of [`descend_mut`].
#[must_use]
pub fn descend<'a>(el: &'a Element, path: &[&str]) -> Option<&'a Element> {
    path.iter().try_fold(el, |cur, name| cur.get_child(*name))
}

/// Replace an element's content with a single text node.
pub fn set_text(el: &mut Element, text: &str) {
    el.children = vec![XMLNode::Text(text.to_string())];
}

/// Element text content, trimmed.
#[must_use]
pub fn text(el: &Element) -> Option<String> {
    el.get_text().map(|t| t.trim().to_string())
}

/// New element with the given attributes.
#[must_use]
pub fn element_with_attrs(name: &str, attrs: &[(&str, &str)]) -> Element {
    let mut el = Element::new(name);
    for (k, v) in attrs {
        el.attributes.insert((*k).to_string(), (*v).to_string());
    }
    el
}

/// Append a child element.
pub fn push_child(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}
