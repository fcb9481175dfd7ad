use crate::dom::dom_tree::{node_at, SynthesizedElement};
use crate::parser::selector::{
    parse_complex_selector, AttributeOperator, Combinator, ComplexSelector, CompoundSelector, LogicalKind,
    STATE_PSEUDO_CLASSES,
};
use crate::style::owned_css::{OwnedDeclaration, OwnedStylesheet, StyleOrigin};
use log::debug;
use std::collections::{HashMap, HashSet};

/// ------------------------------
/// 1. Compiled rules & specificity
/// ------------------------------

/// Specificity as (id_count, class+attribute+pseudo-class count, tag count).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

/// Inline style declarations outrank every selector.
const INLINE_SPECIFICITY: Specificity = Specificity(u32::MAX, 0, 0);

/// One selector of a stylesheet rule, ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub selector: ComplexSelector,
    pub specificity: Specificity,
    pub declarations: Vec<OwnedDeclaration>,
    pub origin: StyleOrigin,
    pub source_order: u32,
}

/// Splits each rule's selector list into individually matchable rules.
/// `next_order` continues across stylesheets so later sheets win ties.
pub fn compile_rules(sheet: &OwnedStylesheet, next_order: &mut u32) -> Vec<CompiledRule> {
    let mut compiled = Vec::new();
    for rule in &sheet.rules {
        for selector_text in &rule.selectors {
            let Some(selector) = parse_complex_selector(selector_text) else {
                debug!("ignoring empty selector in rule {}", rule);
                continue;
            };
            compiled.push(CompiledRule {
                specificity: compute_complex_specificity(&selector),
                selector,
                declarations: rule.declarations.clone(),
                origin: sheet.origin,
                source_order: *next_order,
            });
        }
        *next_order += 1;
    }
    compiled
}

/// Compute specificity for a compound selector.
/// `:not()`/`:is()` count as their most specific argument; `:where()` counts zero.
pub fn compute_specificity(compound: &CompoundSelector) -> Specificity {
    let id_count = u32::from(compound.id.is_some());
    // Attributes and pseudo-classes count as class-level selectors.
    let class_count = (compound.classes.len()
        + compound.attributes.len()
        + compound.pseudo_classes.len()) as u32;
    let tag_count = u32::from(compound.tag.is_some()) + u32::from(compound.pseudo_element.is_some());

    let mut spec = Specificity(id_count, class_count, tag_count);
    for logical in &compound.logical_pseudo_classes {
        if logical.kind == LogicalKind::Where {
            continue;
        }
        let max = logical
            .arguments
            .iter()
            .map(compute_complex_specificity)
            .max()
            .unwrap_or_default();
        spec.0 += max.0;
        spec.1 += max.1;
        spec.2 += max.2;
    }
    spec
}

/// Compute specificity for a complex selector by summing key and ancestors.
pub fn compute_complex_specificity(selector: &ComplexSelector) -> Specificity {
    let mut spec = compute_specificity(&selector.key);
    for (_, compound) in &selector.ancestors {
        let anc_spec = compute_specificity(compound);
        spec.0 += anc_spec.0;
        spec.1 += anc_spec.1;
        spec.2 += anc_spec.2;
    }
    spec
}

/// ------------------------------
/// 2. Selector Matching
/// ------------------------------

/// Returns true if the element at `path` below `root` matches the compound selector.
pub fn matches_compound(root: &SynthesizedElement, path: &[usize], compound: &CompoundSelector) -> bool {
    let Some(elem) = node_at(root, path) else {
        return false;
    };
    if let Some(ref tag) = compound.tag {
        if !elem.tag.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(ref id_val) = compound.id {
        if elem.attribute("id").as_deref() != Some(id_val.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| elem.has_class(class)) {
        return false;
    }
    for attr_sel in &compound.attributes {
        let Some(actual_val) = elem.attribute(&attr_sel.name) else {
            return false;
        };
        let Some(expected) = &attr_sel.value else {
            continue;
        };
        let matched = match attr_sel.operator {
            Some(AttributeOperator::Exact) => &actual_val == expected,
            Some(AttributeOperator::Includes) => actual_val.split_whitespace().any(|w| w == expected),
            Some(AttributeOperator::DashMatch) => {
                actual_val == *expected || actual_val.starts_with(&format!("{}-", expected))
            }
            Some(AttributeOperator::Prefix) => actual_val.starts_with(expected.as_str()),
            Some(AttributeOperator::Suffix) => actual_val.ends_with(expected.as_str()),
            Some(AttributeOperator::Substring) => actual_val.contains(expected.as_str()),
            None => true,
        };
        if !matched {
            return false;
        }
    }
    if compound.pseudo_element.is_some() {
        // Generated content is never part of a preview.
        return false;
    }
    let logical_ok = compound.logical_pseudo_classes.iter().all(|logical| {
        let any = logical
            .arguments
            .iter()
            .any(|argument| matches_complex_selector(root, path, argument));
        match logical.kind {
            LogicalKind::Not => !any,
            LogicalKind::Is | LogicalKind::Where => any,
        }
    });
    logical_ok
        && compound
            .pseudo_classes
            .iter()
            .all(|pseudo| matches_pseudo_class(root, path, elem, pseudo))
}

fn matches_pseudo_class(root: &SynthesizedElement, path: &[usize], elem: &SynthesizedElement, pseudo: &str) -> bool {
    if STATE_PSEUDO_CLASSES.contains(&pseudo) {
        return elem.attribute(pseudo).is_some();
    }
    let sibling_count = match path.split_last() {
        Some((_, parent)) => node_at(root, parent).map_or(1, |p| p.children.len()),
        None => 1,
    };
    let index = path.last().copied().unwrap_or(0);
    match pseudo {
        "root" => path.is_empty(),
        "first-child" => index == 0,
        "last-child" => index + 1 == sibling_count,
        "only-child" => sibling_count == 1,
        "empty" => elem.children.is_empty(),
        // Interaction states (:hover, :focus, ...) are never active in a preview.
        "hover" | "focus" | "focus-within" | "focus-visible" | "active" | "visited" | "target" => false,
        _ => {
            debug!("pseudo-class :{} is not supported; rule does not match", pseudo);
            false
        }
    }
}

/// Matches a ComplexSelector against the element at `path` below `root`.
/// The matching proceeds right-to-left, backtracking over descendant combinators.
pub fn matches_complex_selector(root: &SynthesizedElement, path: &[usize], complex: &ComplexSelector) -> bool {
    if !matches_compound(root, path, &complex.key) {
        return false;
    }
    let mut matcher = AncestorMatcher {
        root,
        ancestors: &complex.ancestors,
        failed: HashSet::new(),
    };
    matcher.matches_from(path, 0)
}

/// Right-to-left ancestor matching. Failed (element, selector position)
/// pairs are remembered so each pair is tried at most once.
struct AncestorMatcher<'a> {
    root: &'a SynthesizedElement,
    ancestors: &'a [(Combinator, CompoundSelector)],
    failed: HashSet<(Vec<usize>, usize)>,
}

impl AncestorMatcher<'_> {
    fn matches_from(&mut self, path: &[usize], position: usize) -> bool {
        let Some((combinator, compound)) = self.ancestors.get(position) else {
            return true;
        };
        if self.failed.contains(&(path.to_vec(), position)) {
            return false;
        }

        let matched = match combinator {
            Combinator::Child => match path.split_last() {
                Some((_, parent)) => {
                    matches_compound(self.root, parent, compound) && self.matches_from(parent, position + 1)
                }
                None => false,
            },
            Combinator::Descendant => {
                let mut found = false;
                for len in (0..path.len()).rev() {
                    let ancestor = &path[..len];
                    if matches_compound(self.root, ancestor, compound) && self.matches_from(ancestor, position + 1) {
                        found = true;
                        break;
                    }
                }
                found
            }
            Combinator::AdjacentSibling => match path.split_last() {
                Some((&index, parent)) if index > 0 => {
                    let mut sibling = parent.to_vec();
                    sibling.push(index - 1);
                    matches_compound(self.root, &sibling, compound) && self.matches_from(&sibling, position + 1)
                }
                _ => false,
            },
        };

        if !matched {
            self.failed.insert((path.to_vec(), position));
        }
        matched
    }
}

/// Every compiled rule matching the element at `path`.
pub fn matching_rules<'a>(rules: &'a [CompiledRule], root: &SynthesizedElement, path: &[usize]) -> Vec<&'a CompiledRule> {
    rules
        .iter()
        .filter(|rule| matches_complex_selector(root, path, &rule.selector))
        .collect()
}

/// ------------------------------
/// 3. Cascade
/// ------------------------------

/// Cascade layer of a declaration; higher layers win.
fn cascade_layer(origin: StyleOrigin, inline: bool, important: bool) -> u8 {
    match (origin, inline, important) {
        (StyleOrigin::UserAgent, _, false) => 0,
        (StyleOrigin::Author, false, false) => 1,
        (StyleOrigin::Author, true, false) => 2,
        (StyleOrigin::Author, false, true) => 3,
        (StyleOrigin::Author, true, true) => 4,
        (StyleOrigin::UserAgent, _, true) => 5,
    }
}

/// Merges matched rules and inline declarations into the element's declared
/// values, ordered by cascade layer, specificity and source order.
/// Declarations arrive as longhands (see `stylesheet`).
pub fn cascade_declarations(
    matched_rules: &[&CompiledRule],
    inline: &[OwnedDeclaration],
) -> HashMap<String, String> {
    let mut entries: Vec<((u8, Specificity, u32), &OwnedDeclaration)> = Vec::new();
    for rule in matched_rules {
        for decl in &rule.declarations {
            let layer = cascade_layer(rule.origin, false, decl.important);
            entries.push(((layer, rule.specificity, rule.source_order), decl));
        }
    }
    for decl in inline {
        let layer = cascade_layer(StyleOrigin::Author, true, decl.important);
        entries.push(((layer, INLINE_SPECIFICITY, u32::MAX), decl));
    }
    // Stable sort keeps declaration order within a rule.
    entries.sort_by_key(|(key, _)| *key);

    let mut declared = HashMap::new();
    for (_, decl) in entries {
        declared.insert(decl.property.clone(), decl.value.clone());
    }
    declared
}
