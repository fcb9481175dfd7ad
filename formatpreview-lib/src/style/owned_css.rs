// Fully-owned stylesheet types, detached from the lightningcss parse lifetimes.
use std::fmt;

/// Where a stylesheet comes from; decides cascade precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StyleOrigin {
    UserAgent,
    Author,
}

/// A fully-owned CSS stylesheet: style rules only (@media contents flattened).
#[derive(Debug, Clone)]
pub struct OwnedStylesheet {
    pub origin: StyleOrigin,
    pub rules: Vec<OwnedRule>,
}

#[derive(Debug, Clone)]
pub struct OwnedRule {
    /// e.g. "ol .preview", "li#someId"
    pub selectors: Vec<String>,
    pub declarations: Vec<OwnedDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDeclaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl OwnedDeclaration {
    pub fn new(property: &str, value: &str) -> Self {
        OwnedDeclaration {
            property: property.to_string(),
            value: value.to_string(),
            important: false,
        }
    }
}

impl fmt::Display for OwnedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.selectors.join(", "))?;
        for decl in &self.declarations {
            let important = if decl.important { " !important" } else { "" };
            writeln!(f, "  {}: {}{};", decl.property, decl.value, important)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_display() {
        let rule = OwnedRule {
            selectors: vec!["ol .preview".into(), "ul".into()],
            declarations: vec![
                OwnedDeclaration::new("color", "blue"),
                OwnedDeclaration {
                    important: true,
                    ..OwnedDeclaration::new("margin", "0")
                },
            ],
        };
        assert_eq!(
            rule.to_string(),
            "ol .preview, ul {\n  color: blue;\n  margin: 0 !important;\n}"
        );
    }
}
