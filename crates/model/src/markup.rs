//! Parsed markup elements, before any style is applied.

use serde::Serialize;

use crate::tag::Tag;

/// One element of the content tree as written in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkupNode {
    pub tag: Tag,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
    /// Text body (`txt` only), with line breaks as `\n`.
    pub text: Option<String>,
}

impl MarkupNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whitespace-separated `class` attribute.
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|classes| classes.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }
}
