//! Format definitions and their application to a preview fragment.

use crate::dom::dom_tree::{Fragment, NodePath, SynthesizedElement};
use crate::error::ValueError;
use crate::parser::selector::parse_selector;
use crate::parser::structure::{synthesize, synthesize_subtree};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Tag previewed when a format names no usable element.
pub const FALLBACK_FORMAT_TAG: &str = "span";

/// A deferred value: evaluated against the editing context at apply time.
/// `Ok(None)` means "leave this property unset".
pub type ValueProvider =
    Arc<dyn Fn(&EvaluationContext) -> Result<Option<String>, ValueError> + Send + Sync>;

/// The value of one style or attribute entry.
#[derive(Clone)]
pub enum ValueSource {
    Literal(String),
    Computed(ValueProvider),
}

impl ValueSource {
    pub fn computed<F>(provider: F) -> Self
    where
        F: Fn(&EvaluationContext) -> Result<Option<String>, ValueError> + Send + Sync + 'static,
    {
        ValueSource::Computed(Arc::new(provider))
    }

    /// Resolves the value for property `name`. Provider failures, including
    /// panics, resolve to `None` so one bad entry cannot abort a preview.
    pub fn resolve(&self, name: &str, context: &EvaluationContext) -> Option<String> {
        match self {
            ValueSource::Literal(value) => {
                let value = replace_vars(value, context);
                (!value.is_empty()).then_some(value)
            }
            ValueSource::Computed(provider) => {
                match panic::catch_unwind(AssertUnwindSafe(|| provider(context))) {
                    Ok(Ok(value)) => value,
                    Ok(Err(err)) => {
                        warn!("value provider for {:?} failed: {}", name, err);
                        None
                    }
                    Err(_) => {
                        warn!("value provider for {:?} panicked", name);
                        None
                    }
                }
            }
        }
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ValueSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for ValueSource {
    fn from(value: &str) -> Self {
        ValueSource::Literal(value.to_string())
    }
}

impl From<String> for ValueSource {
    fn from(value: String) -> Self {
        ValueSource::Literal(value)
    }
}

/// What computed values and `%name` placeholders are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub vars: HashMap<String, String>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

/// Substitutes `%name` placeholders from the context; unresolved ones are removed.
pub fn replace_vars(value: &str, context: &EvaluationContext) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if !(next.is_alphanumeric() || next == '_') {
                break;
            }
            name.push(next);
            chars.next();
        }
        if name.is_empty() {
            out.push('%');
        } else if let Some(var) = context.vars.get(&name) {
            out.push_str(var);
        }
    }
    out
}

/// The element a format produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatKind {
    Inline(String),
    Block(String),
    Selector(String),
}

/// Which properties a format's preview reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewStyles {
    /// Use the configured allowlist.
    #[default]
    Inherit,
    /// Read exactly these properties, in order.
    Only(Vec<String>),
    /// The format has no preview.
    Disabled,
}

/// A text-formatting rule.
#[derive(Debug, Clone)]
pub struct FormatDefinition {
    pub kind: FormatKind,
    pub classes: Vec<String>,
    pub styles: Vec<(String, ValueSource)>,
    pub attributes: Vec<(String, ValueSource)>,
    pub preview: PreviewStyles,
}

impl FormatDefinition {
    pub fn new(kind: FormatKind) -> Self {
        FormatDefinition {
            kind,
            classes: Vec::new(),
            styles: Vec::new(),
            attributes: Vec::new(),
            preview: PreviewStyles::Inherit,
        }
    }

    pub fn inline(tag: &str) -> Self {
        Self::new(FormatKind::Inline(tag.to_string()))
    }

    pub fn block(tag: &str) -> Self {
        Self::new(FormatKind::Block(tag.to_string()))
    }

    pub fn selector(selector: &str) -> Self {
        Self::new(FormatKind::Selector(selector.to_string()))
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_style(mut self, name: &str, value: impl Into<ValueSource>) -> Self {
        self.styles.push((name.to_string(), value.into()));
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<ValueSource>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn with_preview(mut self, preview: PreviewStyles) -> Self {
        self.preview = preview;
        self
    }
}

/// Named formats, as the host editor registers them. A name may map to several
/// definitions; the first one is the one previewed.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: HashMap<String, Vec<FormatDefinition>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the common editor formats.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("bold", FormatDefinition::inline("strong"));
        registry.register("italic", FormatDefinition::inline("em"));
        registry.register(
            "underline",
            FormatDefinition::inline("span").with_style("text-decoration", "underline"),
        );
        registry.register("strikethrough", FormatDefinition::inline("s"));
        registry.register("code", FormatDefinition::inline("code"));
        registry.register("subscript", FormatDefinition::inline("sub"));
        registry.register("superscript", FormatDefinition::inline("sup"));
        for block in ["p", "h1", "h2", "h3", "h4", "h5", "h6", "div", "pre", "blockquote", "address"] {
            registry.register(block, FormatDefinition::block(block));
        }
        registry
    }

    pub fn register(&mut self, name: &str, format: FormatDefinition) {
        self.formats.entry(name.to_string()).or_default().push(format);
    }

    pub fn get(&self, name: &str) -> Option<&FormatDefinition> {
        self.formats.get(name).and_then(|defs| defs.first())
    }
}

/// Applies `format` to `fragment` and returns the path of the styled node.
///
/// Selector formats rebuild the fragment from their selector. Inline and block
/// formats reuse the current target when its tag already matches, otherwise
/// they attach a new element (with any required parents) below it.
pub fn apply_format(
    fragment: &mut Fragment,
    format: &FormatDefinition,
    context: &EvaluationContext,
) -> NodePath {
    let path = match &format.kind {
        FormatKind::Selector(selector) => {
            *fragment = synthesize(&parse_selector(selector));
            match fragment.target.clone() {
                Some(path) => path,
                None => attach_target(fragment, FALLBACK_FORMAT_TAG),
            }
        }
        FormatKind::Inline(tag) | FormatKind::Block(tag) => attach_target(fragment, tag),
    };

    if let Some(target) = fragment.node_mut(&path) {
        apply_properties(target, format, context);
    }
    path
}

/// Finds or creates the innermost element tagged `tag`; updates `fragment.target`.
fn attach_target(fragment: &mut Fragment, tag: &str) -> NodePath {
    let tag = match tag.trim().to_ascii_lowercase() {
        t if t.is_empty() => FALLBACK_FORMAT_TAG.to_string(),
        t => t,
    };

    // The sandbox root itself is never a target.
    let innermost = fragment.target.clone().filter(|path| !path.is_empty());
    if let Some(path) = &innermost {
        if fragment.node(path).is_some_and(|node| node.tag == tag) {
            return path.clone();
        }
    }

    let mut host_path = innermost.unwrap_or_default();
    if fragment.node(&host_path).is_none() {
        // Stale target; attach to the root instead.
        host_path.clear();
    }
    let (subtree, sub_path) = synthesize_subtree(&tag);
    if let Some(host) = fragment.node_mut(&host_path) {
        host_path.push(host.children.len());
        host.children.push(subtree);
    }
    host_path.extend(sub_path);

    debug!("attached <{}> at {:?}", tag, host_path);
    fragment.target = Some(host_path.clone());
    host_path
}

fn apply_properties(target: &mut SynthesizedElement, format: &FormatDefinition, context: &EvaluationContext) {
    for (name, source) in &format.styles {
        if let Some(value) = source.resolve(name, context) {
            target.set_style(name, &value);
        }
    }
    for (name, source) in &format.attributes {
        if let Some(value) = source.resolve(name, context) {
            target.set_attribute(name, &value);
        }
    }
    for class in &format.classes {
        for class in replace_vars(class, context).split_whitespace() {
            target.add_class(class);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inline_attaches_below_sandbox_root() {
        let mut fragment = Fragment::new();
        let format = FormatDefinition::inline("b").with_style("color", "#ff0000");
        let path = apply_format(&mut fragment, &format, &EvaluationContext::new());
        assert_eq!(path, vec![0]);
        assert_eq!(fragment.outer_html(), r#"<div><b style="color: #ff0000;"></b></div>"#);
    }

    #[test]
    fn test_block_div_is_not_the_sandbox_root() {
        let mut fragment = Fragment::new();
        let path = apply_format(&mut fragment, &FormatDefinition::block("div"), &EvaluationContext::new());
        assert_eq!(path, vec![0]);
        assert_eq!(fragment.outer_html(), "<div><div></div></div>");
    }

    #[test]
    fn test_inline_reuses_matching_target() {
        let mut fragment = synthesize(&parse_selector("p > em.x"));
        let path = apply_format(
            &mut fragment,
            &FormatDefinition::inline("em").with_class("x").with_class("y"),
            &EvaluationContext::new(),
        );
        assert_eq!(path, vec![0, 0]);
        assert_eq!(fragment.outer_html(), r#"<div><p><em class="x y"></em></p></div>"#);
    }

    #[test]
    fn test_inline_nests_inside_other_target() {
        let mut fragment = synthesize(&parse_selector("table td"));
        let path = apply_format(&mut fragment, &FormatDefinition::inline("strong"), &EvaluationContext::new());
        assert_eq!(fragment.node(&path).map(|n| n.tag.as_str()), Some("strong"));
        assert_eq!(
            fragment.outer_html(),
            "<div><table><tbody><tr><td><strong></strong></td></tr></tbody></table></div>"
        );
    }

    #[test]
    fn test_block_list_item_gets_required_parent() {
        let mut fragment = Fragment::new();
        let path = apply_format(&mut fragment, &FormatDefinition::block("li"), &EvaluationContext::new());
        assert_eq!(path, vec![0, 0]);
        assert_eq!(fragment.outer_html(), "<div><ul><li></li></ul></div>");
    }

    #[test]
    fn test_selector_rebuilds_fragment_and_unions_classes() {
        let mut fragment = synthesize(&parse_selector("span"));
        let format = FormatDefinition::selector(r#"ol.someClass > li#someId[title="someTitle"]"#)
            .with_class("preview")
            .with_class("preview");
        let path = apply_format(&mut fragment, &format, &EvaluationContext::new());
        assert_eq!(path, vec![0, 0]);
        assert_eq!(
            fragment.outer_html(),
            r#"<div><ol class="someClass"><li class="preview" id="someId" title="someTitle"></li></ol></div>"#
        );
    }

    #[test]
    fn test_empty_selector_falls_back_to_span() {
        let mut fragment = Fragment::new();
        let path = apply_format(&mut fragment, &FormatDefinition::selector("  "), &EvaluationContext::new());
        assert_eq!(path, vec![0]);
        assert_eq!(fragment.outer_html(), "<div><span></span></div>");
    }

    #[test]
    fn test_computed_values() {
        let format = FormatDefinition::inline("span")
            .with_style("color", "#00ff00")
            .with_attribute("lang", "%value")
            .with_attribute("data-mce-lang", ValueSource::computed(|_| Ok(None)))
            .with_attribute(
                "dir",
                ValueSource::computed(|ctx| Ok(ctx.vars.get("dir").cloned())),
            );
        let context = EvaluationContext::new().with_var("dir", "rtl");
        let mut fragment = Fragment::new();
        let path = apply_format(&mut fragment, &format, &context);
        let target = fragment.node(&path).unwrap();
        assert_eq!(target.attributes, vec![("dir".to_string(), "rtl".to_string())]);
        assert_eq!(target.styles, vec![("color".to_string(), "#00ff00".to_string())]);
    }

    #[test]
    fn test_failing_provider_does_not_block_other_properties() {
        let format = FormatDefinition::inline("span")
            .with_class("kept")
            .with_style("color", ValueSource::computed(|_| panic!("provider bug")))
            .with_style("font-size", ValueSource::computed(|_| Err("no editor".into())))
            .with_style("font-weight", "bold")
            .with_attribute("title", "ok");
        let mut fragment = Fragment::new();
        let path = apply_format(&mut fragment, &format, &EvaluationContext::new());
        let target = fragment.node(&path).unwrap();
        assert_eq!(target.styles, vec![("font-weight".to_string(), "bold".to_string())]);
        assert_eq!(target.attribute("title").as_deref(), Some("ok"));
        assert_eq!(target.classes, vec!["kept"]);
    }

    #[test]
    fn test_replace_vars() {
        let context = EvaluationContext::new().with_var("value", "en");
        assert_eq!(replace_vars("%value", &context), "en");
        assert_eq!(replace_vars("x-%missing-y", &context), "x--y");
        assert_eq!(replace_vars("100%", &context), "100%");
    }

    #[test]
    fn test_registry_returns_first_definition() {
        let mut registry = FormatRegistry::with_builtins();
        registry.register("alignleft", FormatDefinition::selector("p").with_style("text-align", "left"));
        registry.register("alignleft", FormatDefinition::selector("img"));
        assert_eq!(
            registry.get("alignleft").map(|f| f.kind.clone()),
            Some(FormatKind::Selector("p".to_string()))
        );
        assert_eq!(
            registry.get("bold").map(|f| f.kind.clone()),
            Some(FormatKind::Inline("strong".to_string()))
        );
        assert!(registry.get("missing").is_none());
    }
}
