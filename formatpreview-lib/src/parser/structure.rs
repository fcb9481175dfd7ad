//! Fragment synthesis from a parsed selector chain.
//!
//! Browsers normalize some elements into required parents (a `td` lives in a
//! `tr`, which lives in a `tbody`, which lives in a `table`). The preview
//! fragment rebuilds that structure so inherited styles resolve the way they
//! would in a document.

use crate::dom::dom_tree::{Fragment, NodePath, SynthesizedElement};
use crate::parser::selector::{SelectorNode, DEFAULT_TAG};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Accepted parents per child tag; the first entry is the one synthesized
/// when no explicit ancestor satisfies the rule.
const REQUIRED_PARENTS: &[(&str, &[&str])] = &[
    ("li", &["ul", "ol", "menu"]),
    ("dt", &["dl"]),
    ("dd", &["dl"]),
    ("td", &["tr"]),
    ("th", &["tr"]),
    ("tr", &["tbody", "thead", "tfoot"]),
    ("tbody", &["table"]),
    ("thead", &["table"]),
    ("tfoot", &["table"]),
    ("caption", &["table"]),
    ("colgroup", &["table"]),
    ("col", &["colgroup"]),
    ("option", &["select", "datalist", "optgroup"]),
    ("optgroup", &["select"]),
    ("legend", &["fieldset"]),
    ("figcaption", &["figure"]),
    ("summary", &["details"]),
    ("area", &["map"]),
    ("param", &["object"]),
];

static RULES: Lazy<StructuralRules> = Lazy::new(|| StructuralRules {
    parents: REQUIRED_PARENTS.iter().copied().collect(),
});

/// Process-wide, read-only table of required parents.
#[derive(Debug)]
pub struct StructuralRules {
    parents: HashMap<&'static str, &'static [&'static str]>,
}

impl StructuralRules {
    pub fn global() -> &'static StructuralRules {
        &RULES
    }

    /// The parents `tag` may live in, default first. Empty when unconstrained.
    pub fn accepted_parents(&self, tag: &str) -> &'static [&'static str] {
        self.parents.get(tag).copied().unwrap_or(&[])
    }

    /// The parent to use for `tag`: `candidate` if the rule accepts it,
    /// otherwise the rule's default. `None` when `tag` has no rule.
    pub fn required_parent<'a>(&self, tag: &str, candidate: Option<&'a str>) -> Option<&'a str> {
        let accepted = self.accepted_parents(tag);
        let default = *accepted.first()?;
        match candidate {
            Some(candidate) if accepted.contains(&candidate) => Some(candidate),
            _ => Some(default),
        }
    }

    /// The full implied ancestor chain for `tag`, innermost first
    /// (`td` → `[tr, tbody, table]`).
    pub fn implied_ancestors(&self, tag: &str) -> Vec<&'static str> {
        let mut chain = Vec::new();
        let mut current = tag;
        while let Some(&parent) = self.accepted_parents(current).first() {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

/// Builds a preview fragment for a parsed chain (target first).
///
/// The result is always rooted at a sandbox `div`; its `target` addresses the
/// element built from `chain[0]`. An empty chain yields an empty sandbox.
pub fn synthesize(chain: &[SelectorNode]) -> Fragment {
    let mut fragment = Fragment::new();
    let Some((first, ancestors)) = chain.split_first() else {
        return fragment;
    };

    // Indices are collected innermost first while wrapping.
    let mut reversed_path = Vec::new();
    let built = wrap_in_structure(
        create_element(first),
        ancestors,
        &first.siblings,
        &mut reversed_path,
    );
    fragment.root.children.push(built);
    reversed_path.push(0);
    reversed_path.reverse();
    fragment.target = Some(reversed_path);

    debug!("synthesized fragment {}", fragment.outer_html());
    fragment
}

/// Wraps a single tag in its implied structure (`li` → `ul > li`), returning
/// the outermost element and the path from it down to the tag's element.
pub fn synthesize_subtree(tag: &str) -> (SynthesizedElement, NodePath) {
    let mut reversed_path = Vec::new();
    let built = wrap_in_structure(SynthesizedElement::new(tag), &[], &[], &mut reversed_path);
    reversed_path.reverse();
    (built, reversed_path)
}

/// Creates the element described by a selector node (without its siblings).
pub fn create_element(node: &SelectorNode) -> SynthesizedElement {
    let mut element = SynthesizedElement::new(node.tag_name.as_str());
    for class in &node.classes {
        element.add_class(class);
    }
    for (name, value) in &node.attributes {
        element.set_attribute(name, value);
    }
    element
}

enum ParentCandidate<'a> {
    Explicit(&'a SelectorNode),
    Implied(&'a str),
}

fn wrap_in_structure(
    element: SynthesizedElement,
    ancestors: &[SelectorNode],
    siblings: &[SelectorNode],
    reversed_path: &mut Vec<usize>,
) -> SynthesizedElement {
    let rules = StructuralRules::global();
    let ancestor = ancestors.first();
    let ancestor_tag = ancestor.map(|a| a.tag_name.as_str());

    let (candidate, remaining) = match (rules.required_parent(&element.tag, ancestor_tag), ancestor) {
        (Some(required), Some(explicit)) if explicit.tag_name == required => {
            (ParentCandidate::Explicit(explicit), &ancestors[1..])
        }
        (Some(required), _) => {
            debug!("inserting implied <{}> above <{}>", required, element.tag);
            (ParentCandidate::Implied(required), ancestors)
        }
        (None, Some(explicit)) => (ParentCandidate::Explicit(explicit), &ancestors[1..]),
        (None, None) if siblings.is_empty() => return element,
        (None, None) => (ParentCandidate::Implied(DEFAULT_TAG), ancestors),
    };

    let (mut parent, parent_siblings) = match candidate {
        ParentCandidate::Explicit(node) => (create_element(node), node.siblings.as_slice()),
        ParentCandidate::Implied(tag) => (SynthesizedElement::new(tag), &[][..]),
    };

    for sibling in siblings {
        parent.children.push(create_element(sibling));
    }
    reversed_path.push(parent.children.len());
    parent.children.push(element);

    wrap_in_structure(parent, remaining, parent_siblings, reversed_path)
}

/// Renders a selector straight to HTML; handy for diagnostics.
pub fn selector_to_html(selector: &str) -> String {
    synthesize(&crate::parser::selector::parse_selector(selector)).outer_html()
}
