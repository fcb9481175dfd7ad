use crate::dom::dom_tree::Fragment;
use crate::error::PreviewError;
use crate::render::RenderingCapability;
use log::trace;

/// Properties read when no allowlist is given.
pub const DEFAULT_PREVIEW_STYLES: &[&str] = &[
    "background-color",
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "line-height",
    "text-decoration",
    "border",
    "border-radius",
    "padding",
    "margin",
    "box-shadow",
    "letter-spacing",
];

pub fn default_preview_styles() -> Vec<String> {
    DEFAULT_PREVIEW_STYLES.iter().map(|s| s.to_string()).collect()
}

/// Reads the computed style of `target` through `renderer` and serializes it
/// as `name:value` pairs joined by `;`, in allowlist order.
///
/// Default-looking values are kept; only properties the renderer reports as
/// absent are skipped.
pub fn extract_css_text<R: RenderingCapability + ?Sized>(
    fragment: &Fragment,
    target: &[usize],
    renderer: &R,
    allowlist: Option<&[String]>,
) -> Result<String, PreviewError> {
    let defaults;
    let properties = match allowlist {
        Some(list) => list,
        None => {
            defaults = default_preview_styles();
            defaults.as_slice()
        }
    };

    let computed = renderer.compute_style(fragment, target, properties)?;
    let pairs: Vec<String> = properties
        .iter()
        .filter_map(|name| {
            let value = computed
                .iter()
                .find(|(computed_name, _)| computed_name == name)
                .and_then(|(_, value)| value.as_ref());
            if value.is_none() {
                trace!("skipping absent property {}", name);
            }
            value.map(|value| format!("{}:{}", name, value))
        })
        .collect();
    Ok(pairs.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::selector::parse_selector;
    use crate::parser::structure::synthesize;
    use pretty_assertions::assert_eq;

    /// Fixed styles per tag; anything else is absent.
    struct TagStyles;

    impl RenderingCapability for TagStyles {
        fn compute_style(
            &self,
            fragment: &Fragment,
            target: &[usize],
            property_names: &[String],
        ) -> Result<Vec<(String, Option<String>)>, PreviewError> {
            let tag = fragment.node(target).map(|n| n.tag.clone()).unwrap_or_default();
            Ok(property_names
                .iter()
                .map(|name| {
                    let value = match (tag.as_str(), name.as_str()) {
                        ("b", "font-weight") => Some("700"),
                        (_, "font-weight") => Some("400"),
                        (_, "color") => Some("rgb(0, 0, 0)"),
                        (_, "background-color") => Some("rgba(0, 0, 0, 0)"),
                        (_, "text-decoration") => Some("none"),
                        _ => None,
                    };
                    (name.clone(), value.map(str::to_string))
                })
                .collect())
        }
    }

    struct Unavailable;

    impl RenderingCapability for Unavailable {
        fn compute_style(
            &self,
            _fragment: &Fragment,
            _target: &[usize],
            _property_names: &[String],
        ) -> Result<Vec<(String, Option<String>)>, PreviewError> {
            Err(PreviewError::RenderingUnavailable("no surface".into()))
        }
    }

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_allowlist_order_is_kept() {
        let fragment = synthesize(&parse_selector("b"));
        let allowlist = list(&["text-decoration", "font-weight", "color"]);
        let css = extract_css_text(&fragment, &[0], &TagStyles, Some(&allowlist)).unwrap();
        assert_eq!(css, "text-decoration:none;font-weight:700;color:rgb(0, 0, 0)");

        let allowlist = list(&["color", "font-weight"]);
        let css = extract_css_text(&fragment, &[0], &TagStyles, Some(&allowlist)).unwrap();
        assert_eq!(css, "color:rgb(0, 0, 0);font-weight:700");
    }

    #[test]
    fn test_default_allowlist_skips_absent_properties() {
        let fragment = synthesize(&parse_selector("i"));
        let css = extract_css_text(&fragment, &[0], &TagStyles, None).unwrap();
        assert_eq!(
            css,
            "background-color:rgba(0, 0, 0, 0);color:rgb(0, 0, 0);font-weight:400;text-decoration:none"
        );
    }

    #[test]
    fn test_empty_allowlist_gives_empty_text() {
        let fragment = synthesize(&parse_selector("b"));
        assert_eq!(extract_css_text(&fragment, &[0], &TagStyles, Some(&[])).unwrap(), "");
    }

    #[test]
    fn test_renderer_failure_propagates() {
        let fragment = synthesize(&parse_selector("b"));
        let dyn_renderer: &dyn RenderingCapability = &Unavailable;
        let err = extract_css_text(&fragment, &[0], dyn_renderer, None).unwrap_err();
        assert!(matches!(err, PreviewError::RenderingUnavailable(_)));
    }
}
