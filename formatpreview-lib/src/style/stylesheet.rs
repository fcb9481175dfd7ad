//! Stylesheet loading: lightningcss parses CSS text, and the result is copied
//! into the owned types of `owned_css` so it can outlive the source string.

use crate::error::PreviewError;
use crate::style::owned_css::{OwnedDeclaration, OwnedRule, OwnedStylesheet, StyleOrigin};
use lightningcss::declaration::DeclarationBlock;
use lightningcss::printer::PrinterOptions;
use lightningcss::properties::{Property, PropertyId};
use lightningcss::rules::{style::StyleRule, CssRule, CssRuleList};
use lightningcss::stylesheet::{ParserOptions, StyleAttribute, StyleSheet as LightningStyleSheet};
use lightningcss::traits::ToCss;
use log::{debug, warn};

/// Default presentation of the elements formats commonly produce.
pub const USER_AGENT_CSS: &str = r#"
body { margin: 8px; }
p, dl, pre { margin: 1em 0; }
blockquote { margin: 1em 40px; }
ul, ol, menu { margin: 1em 0; padding: 0 0 0 40px; }
h1 { font-size: 2em; font-weight: bold; margin: 0.67em 0; }
h2 { font-size: 1.5em; font-weight: bold; margin: 0.83em 0; }
h3 { font-size: 1.17em; font-weight: bold; margin: 1em 0; }
h4 { font-weight: bold; margin: 1.33em 0; }
h5 { font-size: 0.83em; font-weight: bold; margin: 1.67em 0; }
h6 { font-size: 0.67em; font-weight: bold; margin: 2.33em 0; }
b, strong, th { font-weight: bold; }
i, em, cite, var, dfn, address { font-style: italic; }
u, ins { text-decoration: underline; }
s, strike, del { text-decoration: line-through; }
code, kbd, samp, pre, tt { font-family: monospace; }
small, sub, sup { font-size: smaller; }
big { font-size: larger; }
a { color: #0000ee; text-decoration: underline; }
mark { background-color: yellow; color: black; }
td, th { padding: 1px; }
"#;

/// Parse a raw CSS string (LightningCSS) and convert it to a fully-owned stylesheet.
pub fn parse_and_own_css(css_text: &str, origin: StyleOrigin) -> Result<OwnedStylesheet, PreviewError> {
    let sheet = LightningStyleSheet::parse(css_text, ParserOptions::default())
        .map_err(|e| PreviewError::Stylesheet(e.to_string()))?;

    let mut rules = Vec::new();
    collect_rules(&sheet.rules, &mut rules);
    debug!("loaded {} {:?} rule(s)", rules.len(), origin);
    Ok(OwnedStylesheet { origin, rules })
}

/// Parses inline style text (`color: red; font-size: 12px`) into declarations.
/// Unparseable text yields no declarations.
pub fn parse_inline_style(style_text: &str) -> Vec<OwnedDeclaration> {
    if style_text.trim().is_empty() {
        return Vec::new();
    }
    match StyleAttribute::parse(style_text, ParserOptions::default()) {
        Ok(style) => convert_declarations(&style.declarations),
        Err(e) => {
            warn!("ignoring unparseable inline style {:?}: {}", style_text, e);
            Vec::new()
        }
    }
}

fn collect_rules(list: &CssRuleList<'_>, out: &mut Vec<OwnedRule>) {
    for rule in &list.0 {
        match rule {
            CssRule::Style(style_rule) => out.push(convert_style_rule(style_rule)),
            // Previews render for screen; media conditions are not evaluated.
            CssRule::Media(media_rule) => collect_rules(&media_rule.rules, out),
            _ => debug!("skipping unsupported at-rule"),
        }
    }
}

/// Helper to copy a single StyleRule's selectors + declarations into OwnedRule.
fn convert_style_rule(style_rule: &StyleRule<'_>) -> OwnedRule {
    let mut selectors = Vec::new();
    for selector in &style_rule.selectors.0 {
        match selector.to_css_string(PrinterOptions::default()) {
            Ok(text) => selectors.push(text),
            Err(e) => warn!("dropping unprintable selector: {}", e),
        }
    }

    OwnedRule {
        selectors,
        declarations: convert_declarations(&style_rule.declarations),
    }
}

fn convert_declarations(block: &DeclarationBlock<'_>) -> Vec<OwnedDeclaration> {
    let normal = block.declarations.iter().map(|p| (p, false));
    let important = block.important_declarations.iter().map(|p| (p, true));

    let mut declarations = Vec::new();
    for (property, important) in normal.chain(important) {
        push_longhands(property, important, &mut declarations);
    }
    declarations
}

/// Pushes `property` as longhand declarations. Shorthands are split with
/// lightningcss's own longhand expansion; a shorthand set to a CSS-wide
/// keyword (`margin: inherit`) passes the keyword to every longhand.
fn push_longhands(property: &Property<'_>, important: bool, out: &mut Vec<OwnedDeclaration>) {
    let id = property.property_id();
    if let Some(longhands) = id.longhands() {
        let expanded: Vec<Property<'_>> = longhands.iter().filter_map(|lh| property.longhand(lh)).collect();
        if !expanded.is_empty() && expanded.len() == longhands.len() {
            for longhand in &expanded {
                push_longhands(longhand, important, out);
            }
            return;
        }
    }

    let name = id.name().to_string();
    let value = match property.value_to_css_string(PrinterOptions::default()) {
        Ok(value) => value,
        Err(e) => {
            warn!("dropping declaration {:?}: {}", name, e);
            return;
        }
    };

    if id.longhands().is_some() {
        if is_wide_keyword(&value) {
            for longhand in leaf_longhands(&id) {
                out.push(OwnedDeclaration {
                    property: longhand,
                    value: value.clone(),
                    important,
                });
            }
            return;
        }
        debug!("keeping unexpanded shorthand {}: {}", name, value);
    }
    out.push(OwnedDeclaration {
        property: name,
        value,
        important,
    });
}

fn leaf_longhands(id: &PropertyId<'_>) -> Vec<String> {
    match id.longhands() {
        Some(longhands) => longhands.iter().flat_map(leaf_longhands).collect(),
        None => vec![id.name().to_string()],
    }
}

fn is_wide_keyword(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "inherit" | "initial" | "unset" | "revert" | "revert-layer"
    )
}
