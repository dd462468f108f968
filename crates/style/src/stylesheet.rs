//! Stylesheet parsing.
//!
//! ```text
//! /* comment */
//! seq .title, #intro txt {
//!     font-size: 48px;
//!     time-margin: 1s 0.5s;
//! }
//! ```
//!
//! Rules keep their insertion order; that order alone decides precedence.

use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, ParseErrorKind, Parser, ParserInput,
    ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

use crate::selector::{Selector, TagInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

impl Rule {
    pub fn matches(&self, info: &TagInfo<'_>) -> bool {
        self.selectors.iter().any(|selector| selector.matches(info))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> ClipweaveResult<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();
        for rule in StyleSheetParser::new(&mut parser, &mut RuleParser) {
            let rule = rule.map_err(|(error, slice)| syntax_error(error, slice))?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append every rule of `other` after this sheet's rules.
    pub fn extend(&mut self, other: Stylesheet) {
        self.rules.extend(other.rules);
    }

    /// Declarations of every rule matching `info`, in insertion order.
    pub fn matching_declarations<'s>(&'s self, info: &TagInfo<'_>) -> Vec<&'s Declaration> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(info))
            .flat_map(|rule| rule.declarations.iter())
            .collect()
    }
}

/// Parse an inline `style` attribute. Malformed entries are skipped.
pub fn parse_inline(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut body = DeclarationListParser;
    RuleBodyParser::new(&mut parser, &mut body)
        .filter_map(|entry| match entry {
            Ok(declaration) => Some(declaration),
            Err((_, slice)) => {
                tracing::debug!(entry = slice.trim(), "Skipping malformed inline declaration");
                None
            }
        })
        .collect()
}

fn syntax_error(error: ParseError<'_, String>, slice: &str) -> ClipweaveError {
    let line = error.location.line + 1;
    match error.kind {
        ParseErrorKind::Custom(message) => {
            ClipweaveError::stylesheet(format!("{message} (line {line})"))
        }
        ParseErrorKind::Basic(kind) => ClipweaveError::stylesheet(format!(
            "unexpected input `{}` (line {line}): {kind:?}",
            slice.trim()
        )),
    }
}

/// Top level: `selectors { declarations }` blocks. At-rules are rejected.
struct RuleParser;

impl<'i> AtRuleParser<'i> for RuleParser {
    type Prelude = ();
    type AtRule = Rule;
    type Error = String;
}

impl<'i> QualifiedRuleParser<'i> for RuleParser {
    type Prelude = Vec<Selector>;
    type QualifiedRule = Rule;
    type Error = String;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let text = input.slice_from(start);
        text.split(',')
            .map(|selector| selector.parse::<Selector>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| input.new_custom_error(message))
    }

    fn parse_block<'t>(
        &mut self,
        selectors: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut body = DeclarationListParser;
        let mut declarations = Vec::new();
        let mut malformed = None;
        for entry in RuleBodyParser::new(input, &mut body) {
            match entry {
                Ok(declaration) => declarations.push(declaration),
                Err((_, slice)) => {
                    malformed = Some(slice.trim().to_string());
                    break;
                }
            }
        }
        if let Some(slice) = malformed {
            return Err(input.new_custom_error(format!("malformed declaration `{slice}`")));
        }
        Ok(Rule {
            selectors,
            declarations,
        })
    }
}

/// `property: value` entries of a block or an inline style attribute.
/// Values are kept as raw text for the property grammars.
struct DeclarationListParser;

impl<'i> DeclarationParser<'i> for DeclarationListParser {
    type Declaration = Declaration;
    type Error = String;

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let property = name.to_ascii_lowercase();
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let value = input.slice_from(start).trim();
        if value.is_empty() {
            return Err(input.new_custom_error(format!("`{property}` has no value")));
        }
        Ok(Declaration::new(property, value))
    }
}

impl<'i> AtRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = String;
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = String;
}

impl<'i> RuleBodyItemParser<'i, Declaration, String> for DeclarationListParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}
