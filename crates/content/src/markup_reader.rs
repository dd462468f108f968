//! Markup document reading.
//!
//! ```xml
//! <vsml>
//!   <meta>
//!     <style src="theme.vss"/>
//!     <style> txt { font-size: 48px } </style>
//!   </meta>
//!   <cont resolution="1920x1080" fps="30">
//!     <seq>
//!       <vid src="intro.mp4"/>
//!       <txt>Hello<br/>world</txt>
//!     </seq>
//!   </cont>
//! </vsml>
//! ```
//!
//! Stylesheets are concatenated in document order. Element tags are checked
//! against the closed [`Tag`] set here, so later stages never see an
//! unknown tag.

use std::path::{Path, PathBuf};

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{MarkupNode, RenderContext, Resolution, Tag};
use clipweave_style::Stylesheet;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// A parsed document, ready for the content builder.
#[derive(Debug, Clone)]
pub struct Document {
    /// Directory that relative `src` attributes resolve against.
    pub base_dir: PathBuf,
    pub context: RenderContext,
    pub stylesheet: Stylesheet,
    pub root: MarkupNode,
}

impl Document {
    /// Resolve a `src` attribute against the document directory.
    pub fn locate(&self, src: &str) -> PathBuf {
        self.base_dir.join(src)
    }
}

/// Read and parse a document from disk.
pub fn read_document(path: &Path) -> ClipweaveResult<Document> {
    if !path.exists() {
        return Err(ClipweaveError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(path = %path.display(), bytes = text.len(), "Read markup document");
    parse_document(&text, &base_dir)
}

/// Parse document text; `base_dir` locates external stylesheets and media.
pub fn parse_document(text: &str, base_dir: &Path) -> ClipweaveResult<Document> {
    let root = parse_xml(text)?;
    if root.name != "vsml" {
        return Err(ClipweaveError::schema(format!(
            "expected <vsml> document root, found <{}>",
            root.name
        )));
    }
    reject_text(&root)?;

    let mut stylesheet = Stylesheet::new();
    let mut content = None;
    for child in root.elements() {
        match child.name.as_str() {
            "meta" if content.is_none() => {
                reject_text(child)?;
                for style in child.elements() {
                    if style.name != "style" {
                        return Err(ClipweaveError::schema(format!(
                            "unexpected <{}> inside <meta>",
                            style.name
                        )));
                    }
                    stylesheet.extend(read_style_element(style, base_dir)?);
                }
            }
            "cont" if content.is_none() => content = Some(child),
            other => {
                return Err(ClipweaveError::schema(format!(
                    "unexpected <{other}> inside <vsml>"
                )))
            }
        }
    }

    let content = content.ok_or_else(|| ClipweaveError::schema("missing <cont> element"))?;
    let resolution = content
        .attr("resolution")
        .ok_or_else(|| ClipweaveError::schema("<cont> requires a `resolution` attribute"))?
        .parse::<Resolution>()
        .map_err(|e| ClipweaveError::schema(e.to_string()))?;
    let fps = content
        .attr("fps")
        .ok_or_else(|| ClipweaveError::schema("<cont> requires an `fps` attribute"))?;
    let fps = fps
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .ok_or_else(|| ClipweaveError::schema(format!("invalid fps `{fps}`")))?;

    Ok(Document {
        base_dir: base_dir.to_path_buf(),
        context: RenderContext::new(resolution, fps),
        stylesheet,
        root: to_markup(content)?,
    })
}

fn read_style_element(element: &XmlElement, base_dir: &Path) -> ClipweaveResult<Stylesheet> {
    match element.attr("src").filter(|src| !src.is_empty()) {
        Some(src) => {
            let path = base_dir.join(src);
            let text = std::fs::read_to_string(&path).map_err(|e| {
                ClipweaveError::stylesheet(format!("cannot read {}: {e}", path.display()))
            })?;
            Stylesheet::parse(&text)
        }
        None => Stylesheet::parse(&element.text()),
    }
}

fn to_markup(element: &XmlElement) -> ClipweaveResult<MarkupNode> {
    let tag = Tag::from_name(&element.name)
        .ok_or_else(|| ClipweaveError::schema(format!("unknown tag <{}>", element.name)))?;
    let mut node = MarkupNode::new(tag);
    node.attributes = element.attributes.clone();

    match tag {
        Tag::Txt => node.text = Some(text_body(element)?),
        Tag::Vid | Tag::Aud | Tag::Img => {
            if element.attr("src").map_or(true, str::is_empty) {
                return Err(ClipweaveError::schema(format!(
                    "<{tag}> requires a `src` attribute"
                )));
            }
            if !element.children.is_empty() && !is_blank(element) {
                return Err(ClipweaveError::schema(format!("<{tag}> must be empty")));
            }
        }
        _ => {
            reject_text(element)?;
            for child in element.elements() {
                node.children.push(to_markup(child)?);
            }
        }
    }
    Ok(node)
}

/// Text body of a `txt` element. Source line breaks and the indentation
/// after them are dropped; `<br/>` is the only line break.
fn text_body(element: &XmlElement) -> ClipweaveResult<String> {
    let mut body = String::new();
    for child in &element.children {
        match child {
            XmlNode::Text(text) => {
                let mut lines = text.split('\n');
                if let Some(first) = lines.next() {
                    body.push_str(first);
                }
                for line in lines {
                    body.push_str(line.trim_start());
                }
            }
            XmlNode::Element(e) if e.name == "br" => body.push('\n'),
            XmlNode::Element(e) => {
                return Err(ClipweaveError::schema(format!(
                    "unexpected <{}> inside <txt>",
                    e.name
                )))
            }
        }
    }
    Ok(body.trim().to_string())
}

fn is_blank(element: &XmlElement) -> bool {
    element
        .children
        .iter()
        .all(|child| matches!(child, XmlNode::Text(text) if text.trim().is_empty()))
}

fn reject_text(element: &XmlElement) -> ClipweaveResult<()> {
    let stray = element.children.iter().find_map(|child| match child {
        XmlNode::Text(text) if !text.trim().is_empty() => Some(text.trim()),
        _ => None,
    });
    match stray {
        Some(text) => Err(ClipweaveError::schema(format!(
            "unexpected text `{text}` inside <{}>",
            element.name
        ))),
        None => Ok(()),
    }
}

#[derive(Debug)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

#[derive(Debug)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

fn xml_error(reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> ClipweaveError {
    ClipweaveError::schema(format!(
        "malformed markup at byte {}: {err}",
        reader.buffer_position()
    ))
}

fn start_element(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> ClipweaveResult<XmlElement> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| xml_error(reader, err))?
        .to_string();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(reader, err))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| xml_error(reader, err))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(reader, err))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> ClipweaveResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(ClipweaveError::schema("multiple document roots")),
    }
    Ok(())
}

/// Parse XML into a plain element tree.
fn parse_xml(text: &str) -> ClipweaveResult<XmlElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = start_element(&reader, &e)?;
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(&reader, &e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ClipweaveError::schema("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| xml_error(&reader, err))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|err| xml_error(&reader, err))?
                    .to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error(&reader, err)),
        }
    }

    if let Some(open) = stack.last() {
        return Err(ClipweaveError::schema(format!("unclosed <{}>", open.name)));
    }
    root.ok_or_else(|| ClipweaveError::schema("empty document"))
}
