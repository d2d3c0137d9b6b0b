use crate::core::{MergeError, MergeResult};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;

/// A child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    /// Processing instruction body, e.g. `xml-stylesheet href="a.xsl"`
    Instruction(String),
    /// `<!DOCTYPE ...>` body. Only found in the prolog.
    DocType(String),
}

/// One declaration node: tag name, attributes in document order, children.
///
/// Attribute names are kept as written, so `android:name` and `xmlns:android`
/// are ordinary entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Element) -> Self {
        self.append_child(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove every attribute matching `predicate`, returning the removed names
    pub fn remove_attributes_where<F>(&mut self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut removed = Vec::new();
        self.attributes.retain(|(name, _)| {
            if predicate(name) {
                removed.push(name.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |e| e.name == tag)
    }

    pub fn first_child(&self, tag: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == tag)
    }

    pub fn first_child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(e) if e.name == tag => Some(e),
            _ => None,
        })
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Concatenated text content of direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// The `<?xml ... ?>` prolog, reproduced on write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("utf-8".to_string()),
            standalone: Some("no".to_string()),
        }
    }
}

/// An AndroidManifest.xml held in memory. Always has exactly one root.
///
/// Comments, processing instructions and the doctype ahead of the root are
/// kept in `prolog`. Anything after the root other than whitespace is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    pub declaration: Option<XmlDeclaration>,
    pub prolog: Vec<Node>,
    pub root: Element,
}

impl ManifestDocument {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: Some(XmlDeclaration::default()),
            prolog: Vec::new(),
            root,
        }
    }

    /// Load and parse a manifest file. A file that is not UTF-8 text (e.g. a
    /// binary manifest that was never decoded) is a parse error.
    pub fn load(path: &Path) -> MergeResult<Self> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| MergeError::Parse {
            path: path.to_path_buf(),
            message: format!("not a text XML file ({})", e.utf8_error()),
        })?;
        Self::parse(&content, path)
    }

    /// Parse manifest markup. `origin` is only used in error messages.
    pub fn parse(xml: &str, origin: &Path) -> MergeResult<Self> {
        parse_document(xml).map_err(|message| MergeError::Parse {
            path: origin.to_path_buf(),
            message,
        })
    }

    /// Serialize to markup
    pub fn to_xml(&self) -> MergeResult<String> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(serialize_error)?;
            writer
                .write_event(Event::Text(BytesText::from_escaped("\n")))
                .map_err(serialize_error)?;
        }

        for node in &self.prolog {
            write_node(&mut writer, node)?;
            writer
                .write_event(Event::Text(BytesText::from_escaped("\n")))
                .map_err(serialize_error)?;
        }

        write_element(&mut writer, &self.root)?;
        writer
            .write_event(Event::Text(BytesText::from_escaped("\n")))
            .map_err(serialize_error)?;

        String::from_utf8(writer.into_inner()).map_err(serialize_error)
    }

    /// Write the document to `path`, replacing any existing file
    pub fn save(&self, path: &Path) -> MergeResult<()> {
        let xml = self.to_xml()?;
        fs::write(path, xml)?;
        Ok(())
    }
}

fn serialize_error<E: std::fmt::Display>(e: E) -> MergeError {
    MergeError::Serialize(e.to_string())
}

fn parse_document(xml: &str) -> Result<ManifestDocument, String> {
    let mut reader = Reader::from_str(xml);
    let mut declaration = None;
    let mut prolog = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{} (at byte {})", e, reader.buffer_position()))?;

        match event {
            Event::Decl(decl) => {
                declaration = Some(read_declaration(&decl)?);
            }
            Event::Start(start) => {
                stack.push(read_element(&start)?);
            }
            Event::Empty(start) => {
                let element = read_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?.into_owned();
                push_text(&mut stack, text)?;
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                push_text(&mut stack, text)?;
            }
            Event::Comment(comment) => {
                let text = String::from_utf8_lossy(&comment.into_inner()).into_owned();
                push_misc(&mut stack, &root, &mut prolog, Node::Comment(text));
            }
            Event::PI(pi) => {
                let text = String::from_utf8_lossy(&pi.into_inner()).into_owned();
                push_misc(&mut stack, &root, &mut prolog, Node::Instruction(text));
            }
            Event::DocType(doctype) => {
                let text = String::from_utf8_lossy(&doctype.into_inner()).into_owned();
                push_misc(&mut stack, &root, &mut prolog, Node::DocType(text));
            }
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }

    let root = root.ok_or_else(|| "document has no root element".to_string())?;
    Ok(ManifestDocument {
        declaration,
        prolog,
        root,
    })
}

/// Place a comment, instruction or doctype: inside the open element, in the
/// prolog before the root, or nowhere after it.
fn push_misc(stack: &mut [Element], root: &Option<Element>, prolog: &mut Vec<Node>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        prolog.push(node);
    }
}

fn read_declaration(decl: &BytesDecl<'_>) -> Result<XmlDeclaration, String> {
    let version = decl.version().map_err(|e| e.to_string())?;
    let encoding = decl
        .encoding()
        .transpose()
        .map_err(|e| e.to_string())?
        .map(|v| String::from_utf8_lossy(&v).into_owned());
    let standalone = decl
        .standalone()
        .transpose()
        .map_err(|e| e.to_string())?
        .map(|v| String::from_utf8_lossy(&v).into_owned());

    Ok(XmlDeclaration {
        version: String::from_utf8_lossy(&version).into_owned(),
        encoding,
        standalone,
    })
}

fn read_element(start: &BytesStart<'_>) -> Result<Element, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| format!("invalid element name: {}", e))?
        .to_string();

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("in <{}>: {}", element.name, e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| format!("invalid attribute name: {}", e))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("in <{}>: {}", element.name, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.append_child(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(format!(
            "more than one root element (found <{}> after the root)",
            element.name
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text outside the root element".to_string()),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> MergeResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(serialize_error)?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(serialize_error)?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(serialize_error)?;
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> MergeResult<()> {
    let event = match node {
        Node::Element(e) => return write_element(writer, e),
        Node::Text(t) => Event::Text(BytesText::from_escaped(partial_escape(t))),
        Node::Comment(c) => Event::Comment(BytesText::from_escaped(c.as_str())),
        Node::Instruction(pi) => Event::PI(BytesPI::new(pi.as_str())),
        Node::DocType(d) => Event::DocType(BytesText::from_escaped(d.as_str())),
    };
    writer.write_event(event).map_err(serialize_error)
}
