//! Selector parsing.
//!
//! A selector string is first split into compound tokens on top-level
//! combinators (`tokenize`), then each token is scanned by a small state
//! machine (`parse_compound_selector`): an optional tag, followed by any
//! number of `.class`, `#id`, `[attr]` and `:pseudo` fragments.
//!
//! Two shapes are built from the tokens:
//! - `parse_selector` returns the preview chain (`SelectorNode`s, target
//!   first), which drives fragment synthesis.
//! - `parse_complex_selector` returns a `ComplexSelector` used to match
//!   stylesheet rules against a fragment.

use log::debug;
use std::iter::Peekable;
use std::str::Chars;

/// Tag used when a token names no usable element.
pub const DEFAULT_TAG: &str = "div";

/// Pseudo-classes that mirror an element attribute (`:disabled` → `disabled="disabled"`).
pub const STATE_PSEUDO_CLASSES: &[&str] = &["checked", "disabled", "enabled", "read-only", "required"];

/// Supported combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (a space).
    Descendant,
    /// Child combinator (`>`).
    Child,
    /// Adjacent sibling combinator (`+`).
    AdjacentSibling,
}

/// Supported attribute selector operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr="value"]
    Exact,
    /// [attr~="value"]
    Includes,
    /// [attr|="value"]
    DashMatch,
    /// [attr^="value"]
    Prefix,
    /// [attr$="value"]
    Suffix,
    /// [attr*="value"]
    Substring,
}

/// Represents one attribute condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: Option<AttributeOperator>, // None means only existence check
    pub value: Option<String>,
}

/// A compound selector: optional tag, id, classes, attribute conditions and pseudo fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Lowercased type selector; `None` when absent or `*`.
    pub tag: Option<String>,
    /// Whether the token started with `*`.
    pub universal: bool,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<String>,
    /// `:not(...)`, `:is(...)` and `:where(...)` with their parsed arguments.
    pub logical_pseudo_classes: Vec<LogicalPseudoClass>,
    pub pseudo_element: Option<String>,
}

/// Pseudo-classes taking a selector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalKind {
    Not,
    Is,
    Where,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPseudoClass {
    pub kind: LogicalKind,
    pub arguments: Vec<ComplexSelector>,
}

/// A complex selector composed of a key compound selector and a list of ancestor parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub key: CompoundSelector,
    /// Ancestors with their combinators, in right-to-left order.
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
}

/// One compound token and the combinator that precedes it in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorToken {
    /// `None` for the first token.
    pub combinator: Option<Combinator>,
    pub text: String,
}

/// One step of a parsed preview chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorNode {
    pub tag_name: String,
    /// The selector fragment this node was parsed from.
    pub raw_selector: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    /// Preceding siblings in document order (from `+`), never ancestors.
    pub siblings: Vec<SelectorNode>,
}

impl SelectorNode {
    /// A plain node for `tag`, as if parsed from the bare tag name.
    pub fn new(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        SelectorNode {
            raw_selector: tag.clone(),
            tag_name: if tag.is_empty() { DEFAULT_TAG.to_string() } else { tag },
            ..Default::default()
        }
    }

    /// Builds a node from a single compound token, e.g. `li.a#b[title="x"]:disabled`.
    pub fn from_token(token: &str) -> Self {
        let raw = token.trim();
        // A bare `*` is a placeholder for "some element".
        if raw == "*" {
            return SelectorNode {
                tag_name: DEFAULT_TAG.to_string(),
                raw_selector: raw.to_string(),
                ..Default::default()
            };
        }

        let compound = parse_compound_selector(raw);
        let tag_name = match (&compound.tag, compound.universal) {
            (Some(tag), _) => tag.clone(),
            (None, true) => "*".to_string(),
            (None, false) => DEFAULT_TAG.to_string(),
        };

        let mut attributes: Vec<(String, String)> = Vec::new();
        if let Some(id) = &compound.id {
            set_pair(&mut attributes, "id", id);
        }
        for attr in &compound.attributes {
            // Only an exact match tells us what value to synthesize.
            let value = match attr.operator {
                Some(AttributeOperator::Exact) => attr.value.clone().unwrap_or_default(),
                _ => String::new(),
            };
            set_pair(&mut attributes, &attr.name, &value);
        }
        for pseudo in &compound.pseudo_classes {
            if STATE_PSEUDO_CLASSES.contains(&pseudo.as_str()) {
                set_pair(&mut attributes, pseudo, pseudo);
            }
        }

        SelectorNode {
            tag_name,
            raw_selector: raw.to_string(),
            classes: compound.classes,
            attributes,
            siblings: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a selector into its preview chain: the target at index 0, then each
/// enclosing ancestor level. Never fails; garbage degrades to defaults.
pub fn parse_selector(selector: &str) -> Vec<SelectorNode> {
    let selector = first_selector(selector);
    let mut levels: Vec<SelectorNode> = Vec::new();

    for token in tokenize(selector) {
        let mut node = SelectorNode::from_token(&token.text);
        if token.combinator == Some(Combinator::AdjacentSibling) {
            if let Some(mut previous) = levels.pop() {
                let mut siblings = std::mem::take(&mut previous.siblings);
                siblings.push(previous);
                node.siblings = siblings;
            }
        }
        levels.push(node);
    }

    levels.reverse();
    debug!("parsed selector {:?} into {} level(s)", selector, levels.len());
    levels
}

/// Parse a complex selector string (e.g. "div.red > p#header + span.foo") into a ComplexSelector.
pub fn parse_complex_selector(selector: &str) -> Option<ComplexSelector> {
    let tokens = tokenize(first_selector(selector));
    let (last, rest) = tokens.split_last()?;
    let key = parse_compound_selector(&last.text);

    let mut ancestors = Vec::with_capacity(rest.len());
    let mut combinator = last.combinator;
    for token in rest.iter().rev() {
        ancestors.push((
            combinator.unwrap_or(Combinator::Descendant),
            parse_compound_selector(&token.text),
        ));
        combinator = token.combinator;
    }
    Some(ComplexSelector { key, ancestors })
}

/// Returns the first selector of a comma-separated list.
pub fn first_selector(selector: &str) -> &str {
    split_selector_list(selector).into_iter().next().unwrap_or("")
}

/// Splits a comma-separated selector list on top-level commas.
pub fn split_selector_list(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(selector[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim());
    parts
}

/// Splits a selector into compound tokens on top-level combinators.
///
/// Whitespace inside `[...]`, `(...)` and quotes does not split. Runs of
/// whitespace around an explicit combinator collapse into it. Any combinator
/// other than `>` and `+` is read as a descendant combinator.
pub fn tokenize(selector: &str) -> Vec<SelectorToken> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut pending: Option<Combinator> = None;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in selector.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if depth == 0 && c.is_whitespace() => {
                flush_token(&mut tokens, &mut current, &mut pending);
                pending.get_or_insert(Combinator::Descendant);
            }
            '>' | '+' | '~' if depth == 0 => {
                flush_token(&mut tokens, &mut current, &mut pending);
                pending = Some(match ch {
                    '>' => Combinator::Child,
                    '+' => Combinator::AdjacentSibling,
                    _ => {
                        debug!("unsupported combinator {:?}, reading it as descendant", ch);
                        Combinator::Descendant
                    }
                });
            }
            _ => current.push(ch),
        }
    }
    flush_token(&mut tokens, &mut current, &mut pending);
    tokens
}

fn flush_token(
    tokens: &mut Vec<SelectorToken>,
    current: &mut String,
    pending: &mut Option<Combinator>,
) {
    if current.is_empty() {
        return;
    }
    let combinator = if tokens.is_empty() {
        None
    } else {
        Some(pending.unwrap_or(Combinator::Descendant))
    };
    tokens.push(SelectorToken {
        combinator,
        text: std::mem::take(current),
    });
    *pending = None;
}

/// Parse a compound selector string, e.g. "div.red#header[disabled][data-type~=\"main\"]:hover".
pub fn parse_compound_selector(selector: &str) -> CompoundSelector {
    let mut compound = CompoundSelector::default();
    let mut chars = selector.trim().chars().peekable();

    // If first char is an identifier start or '*' assume tag.
    match chars.peek() {
        Some('*') => {
            chars.next();
            compound.universal = true;
        }
        Some(&ch) if is_ident_char(ch) => {
            let tag = read_ident(&mut chars);
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        _ => {}
    }

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                let class = read_ident(&mut chars);
                if !class.is_empty() && !compound.classes.contains(&class) {
                    compound.classes.push(class);
                }
            }
            '#' => {
                let id = read_ident(&mut chars);
                if !id.is_empty() {
                    compound.id = Some(id);
                }
            }
            '[' => {
                if let Some(attr) = read_attribute(&mut chars) {
                    compound.attributes.push(attr);
                }
            }
            ':' => {
                let is_element = chars.peek() == Some(&':');
                if is_element {
                    chars.next();
                }
                let name = read_ident(&mut chars).to_ascii_lowercase();
                let arguments = if chars.peek() == Some(&'(') {
                    Some(read_parenthesized(&mut chars))
                } else {
                    None
                };
                if name.is_empty() {
                    continue;
                }
                let logical = match name.as_str() {
                    "not" => Some(LogicalKind::Not),
                    "is" | "matches" | "any" => Some(LogicalKind::Is),
                    "where" => Some(LogicalKind::Where),
                    _ => None,
                };
                if let (Some(kind), Some(arguments)) = (logical, &arguments) {
                    compound.logical_pseudo_classes.push(LogicalPseudoClass {
                        kind,
                        arguments: split_selector_list(arguments)
                            .into_iter()
                            .filter_map(parse_complex_selector)
                            .collect(),
                    });
                } else if is_element {
                    compound.pseudo_element = Some(name);
                } else {
                    compound.pseudo_classes.push(name);
                }
            }
            // Anything else is noise; skip it.
            _ => {}
        }
    }

    compound
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut buffer = String::new();
    while let Some(&ch) = chars.peek() {
        if !is_ident_char(ch) {
            break;
        }
        buffer.push(ch);
        chars.next();
    }
    buffer
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|ch| ch.is_whitespace()) {
        chars.next();
    }
}

/// Reads a `(...)` group and returns its inner text; the `(` is still pending.
fn read_parenthesized(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut inner = String::new();
    let mut depth = 0usize;
    for ch in chars.by_ref() {
        match ch {
            '(' => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        inner.push(ch);
    }
    inner
}

/// Reads an attribute selector body; the opening `[` is already consumed.
fn read_attribute(chars: &mut Peekable<Chars<'_>>) -> Option<AttributeSelector> {
    skip_whitespace(chars);
    let mut name = String::new();
    while let Some(&ch) = chars.peek() {
        if ch == ']' || ch == '=' || ch.is_whitespace() || "~|^$*".contains(ch) {
            break;
        }
        name.push(ch);
        chars.next();
    }
    skip_whitespace(chars);

    let mut operator = None;
    let mut value = None;
    if let Some(&ch) = chars.peek() {
        if "=~|^$*".contains(ch) {
            let mut op = String::new();
            op.push(ch);
            chars.next();
            if ch != '=' && chars.peek() == Some(&'=') {
                op.push('=');
                chars.next();
            }
            operator = match op.as_str() {
                "=" => Some(AttributeOperator::Exact),
                "~=" => Some(AttributeOperator::Includes),
                "|=" => Some(AttributeOperator::DashMatch),
                "^=" => Some(AttributeOperator::Prefix),
                "$=" => Some(AttributeOperator::Suffix),
                "*=" => Some(AttributeOperator::Substring),
                _ => None,
            };
            skip_whitespace(chars);
            value = Some(read_attribute_value(chars));
        }
    }

    // Skip flags and anything else until ']'.
    for ch in chars.by_ref() {
        if ch == ']' {
            break;
        }
    }

    if name.is_empty() {
        return None;
    }
    Some(AttributeSelector {
        name: name.to_ascii_lowercase(),
        operator,
        value,
    })
}

fn read_attribute_value(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut buffer = String::new();
    match chars.peek() {
        Some(&q) if q == '"' || q == '\'' => {
            chars.next();
            for ch in chars.by_ref() {
                if ch == q {
                    break;
                }
                buffer.push(ch);
            }
        }
        _ => {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == ']' {
                    break;
                }
                buffer.push(ch);
                chars.next();
            }
        }
    }
    buffer
}

fn set_pair(pairs: &mut Vec<(String, String)>, name: &str, value: &str) {
    match pairs.iter_mut().find(|(k, _)| k == name) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((name.to_string(), value.to_string())),
    }
}
