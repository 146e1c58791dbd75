//! DrugBank XML loader using quick-xml
//!
//! Reads the whole document into an element tree with namespaces resolved.
//! Lookups match on (namespace, local name), so `<db:drug>` and a default
//! `xmlns` declaration resolve to the same element.

use anyhow::{Context, Result, bail};
use quick_xml::{Decoder, NsReader};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

/// Namespace every DrugBank element lives in
pub const DRUGBANK_NS: &str = "http://www.drugbank.ca";

/// Deepest element nesting accepted; the tree is built recursively.
pub const MAX_DEPTH: usize = 256;

/// One XML element with its attributes, direct text, and children.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Whether this is the DrugBank element `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(DRUGBANK_NS)
    }

    /// Direct DrugBank children called `name`, in document order.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// First direct DrugBank child called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(name))
    }

    /// All descendants reached by following `path` one level per segment,
    /// in document order. `["targets", "target"]` is `targets/target`.
    pub fn find_all(&self, path: &[&str]) -> Vec<&Element> {
        let mut current = vec![self];
        for segment in path {
            current = current
                .into_iter()
                .flat_map(|el| el.children.iter().filter(|c| c.is(segment)))
                .collect();
        }
        current
    }

    /// Unprefixed attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content; `None` when empty.
    pub fn text(&self) -> Option<&str> {
        let t = self.text.trim();
        (!t.is_empty()).then_some(t)
    }

    /// Trimmed text of the first child `name`; `None` when the child is
    /// missing or empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Element::text)
    }
}

/// Parsed DrugBank export.
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Top-level `<drug>` elements in document order.
    pub fn drugs(&self) -> impl Iterator<Item = &Element> {
        self.root.children_named("drug")
    }
}

/// Parse a complete XML document.
///
/// Any syntax error, mismatched or unclosed tag, undeclared prefix, nesting
/// deeper than [`MAX_DEPTH`], or a document without a root element is an
/// error.
pub fn parse_document(xml: &str) -> Result<Document> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<Element> = None;

    loop {
        let (ns, event) = reader.read_resolved_event().context("XML parse error")?;
        let namespace = resolve_namespace(ns)?;
        match event {
            Event::Start(e) => {
                if root.is_some() {
                    bail!("multiple root elements");
                }
                let mut element = element_from_start(namespace, &e, reader.decoder())?;
                read_children(&mut reader, &mut element, 1)?;
                root = Some(element);
            }
            Event::Empty(e) => {
                if root.is_some() {
                    bail!("multiple root elements");
                }
                root = Some(element_from_start(namespace, &e, reader.decoder())?);
            }
            Event::Text(e) => {
                if !e.unescape()?.trim().is_empty() {
                    bail!("text outside the root element");
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let root = root.context("document has no root element")?;
    log::debug!(
        "Parsed root <{}> with {} children",
        root.name,
        root.children.len()
    );
    Ok(Document { root })
}

fn resolve_namespace(ns: ResolveResult) -> Result<Option<String>> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Ok(Some(String::from_utf8_lossy(uri).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => {
            bail!(
                "undeclared namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            )
        }
    }
}

fn element_from_start(
    namespace: Option<String>,
    e: &BytesStart,
    decoder: Decoder,
) -> Result<Element> {
    let mut element = Element {
        namespace,
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        ..Default::default()
    };

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

/// Fill `parent`, sitting at `depth`, until its end tag.
fn read_children(reader: &mut NsReader<&[u8]>, parent: &mut Element, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        bail!("elements nested deeper than {MAX_DEPTH} levels at <{}>", parent.name);
    }
    loop {
        let (ns, event) = reader.read_resolved_event().context("XML parse error")?;
        let namespace = resolve_namespace(ns)?;
        match event {
            Event::Start(e) => {
                let mut child = element_from_start(namespace, &e, reader.decoder())?;
                read_children(reader, &mut child, depth + 1)?;
                parent.children.push(child);
            }
            Event::Empty(e) => {
                let child = element_from_start(namespace, &e, reader.decoder())?;
                parent.children.push(child);
            }
            Event::Text(e) => parent.text.push_str(&e.unescape()?),
            Event::CData(e) => parent
                .text
                .push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(_) => return Ok(()),
            Event::Eof => bail!("unexpected end of document inside <{}>", parent.name),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_namespace() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<drugbank xmlns="http://www.drugbank.ca" version="5.1">
  <drug type="biotech">
    <drugbank-id primary="true">DB00001</drugbank-id>
    <name>Lepirudin</name>
  </drug>
</drugbank>"#;

        let doc = parse_document(xml).unwrap();
        assert!(doc.root.is("drugbank"));
        assert_eq!(doc.root.attr("version"), Some("5.1"));

        let drugs: Vec<_> = doc.drugs().collect();
        assert_eq!(drugs.len(), 1);
        assert_eq!(drugs[0].attr("type"), Some("biotech"));
        assert_eq!(drugs[0].child_text("name"), Some("Lepirudin"));
        assert_eq!(
            drugs[0].child("drugbank-id").and_then(|e| e.attr("primary")),
            Some("true")
        );
    }

    #[test]
    fn parse_prefixed_namespace() {
        let xml = r#"<db:drugbank xmlns:db="http://www.drugbank.ca">
  <db:drug><db:name>Aspirin</db:name></db:drug>
</db:drugbank>"#;

        let doc = parse_document(xml).unwrap();
        let drug = doc.drugs().next().unwrap();
        assert_eq!(drug.child_text("name"), Some("Aspirin"));
    }

    #[test]
    fn foreign_namespace_is_ignored() {
        let xml = r#"<drugbank xmlns="http://www.drugbank.ca" xmlns:x="urn:other">
  <x:drug><x:name>Ghost</x:name></x:drug>
  <drug><name>Real</name></drug>
</drugbank>"#;

        let doc = parse_document(xml).unwrap();
        let names: Vec<_> = doc.drugs().filter_map(|d| d.child_text("name")).collect();
        assert_eq!(names, vec!["Real"]);
    }

    #[test]
    fn unnamespaced_document_has_no_drugs() {
        let xml = "<drugbank><drug><name>Plain</name></drug></drugbank>";
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.drugs().count(), 0);
    }

    #[test]
    fn find_all_follows_path_in_order() {
        let xml = r#"<drug xmlns="http://www.drugbank.ca">
  <references><articles>
    <article><pubmed-id>1</pubmed-id></article>
    <article><pubmed-id>2</pubmed-id></article>
  </articles></references>
  <references><articles>
    <article><pubmed-id>3</pubmed-id></article>
  </articles></references>
</drug>"#;

        let doc = parse_document(xml).unwrap();
        let ids: Vec<_> = doc
            .root
            .find_all(&["references", "articles", "article", "pubmed-id"])
            .into_iter()
            .filter_map(Element::text)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(doc.root.find_all(&["targets", "target"]).is_empty());
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let xml = r#"<drug xmlns="http://www.drugbank.ca">
  <name>A &amp; B</name>
  <value><![CDATA[C1=CC=CC=C1<O>]]></value>
</drug>"#;

        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.root.child_text("name"), Some("A & B"));
        assert_eq!(doc.root.child_text("value"), Some("C1=CC=CC=C1<O>"));
    }

    #[test]
    fn empty_and_whitespace_text_is_none() {
        let xml = r#"<drug xmlns="http://www.drugbank.ca"><name>   </name><gene-name/></drug>"#;
        let doc = parse_document(xml).unwrap();
        assert!(doc.root.child("name").is_some());
        assert_eq!(doc.root.child_text("name"), None);
        assert_eq!(doc.root.child_text("gene-name"), None);
    }

    #[test]
    fn mismatched_end_tag_is_error() {
        let xml = r#"<drugbank xmlns="http://www.drugbank.ca"><drug></name></drugbank>"#;
        assert!(parse_document(xml).is_err());
    }

    #[test]
    fn truncated_document_is_error() {
        let xml = r#"<drugbank xmlns="http://www.drugbank.ca"><drug><name>Cut"#;
        assert!(parse_document(xml).is_err());
    }

    #[test]
    fn undeclared_prefix_is_error() {
        let xml = r#"<drugbank><db:drug/></drugbank>"#;
        let err = parse_document(xml).unwrap_err();
        assert!(format!("{err:#}").contains("db"));
    }

    #[test]
    fn empty_input_is_error() {
        assert!(parse_document("").is_err());
        assert!(parse_document(r#"<?xml version="1.0"?>"#).is_err());
    }

    #[test]
    fn child_outlives_name_argument() {
        let doc = parse_document(r#"<drug xmlns="http://www.drugbank.ca"><name>Kept</name></drug>"#)
            .unwrap();
        let name = {
            let key = String::from("name");
            doc.root.child(&key)
        };
        assert_eq!(name.and_then(Element::text), Some("Kept"));
    }

    #[test]
    fn nesting_at_limit_is_accepted() {
        let depth = MAX_DEPTH;
        let xml = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        assert!(parse_document(&xml).is_ok());
    }

    #[test]
    fn nesting_past_limit_is_error() {
        let depth = MAX_DEPTH * 40;
        let xml = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let err = parse_document(&xml).unwrap_err();
        assert!(format!("{err:#}").contains("nested deeper"));
    }

    #[test]
    fn second_root_is_error() {
        assert!(parse_document("<a/><b/>").is_err());
    }
}
