//! The preview entry point: format → fragment → computed CSS text.

use crate::dom::dom_tree::{Fragment, NodePath};
use crate::error::PreviewError;
use crate::extract::{default_preview_styles, extract_css_text};
use crate::format::{apply_format, EvaluationContext, FormatDefinition, FormatRegistry, PreviewStyles};
use crate::render::RenderingCapability;
use log::{debug, warn};

/// Engine-wide preview settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    /// Properties read for every format without its own list. Empty disables
    /// previews altogether.
    pub preview_styles: Vec<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            preview_styles: default_preview_styles(),
        }
    }
}

impl PreviewConfig {
    /// Parses a space-separated property list such as `"color font-size"`.
    pub fn from_preview_styles(list: &str) -> Self {
        PreviewConfig {
            preview_styles: list.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.preview_styles.is_empty()
    }
}

/// A format to preview: looked up by name, or given directly.
#[derive(Debug, Clone, Copy)]
pub enum FormatRef<'f> {
    Named(&'f str),
    Definition(&'f FormatDefinition),
}

impl<'f> From<&'f str> for FormatRef<'f> {
    fn from(name: &'f str) -> Self {
        FormatRef::Named(name)
    }
}

impl<'f> From<&'f FormatDefinition> for FormatRef<'f> {
    fn from(format: &'f FormatDefinition) -> Self {
        FormatRef::Definition(format)
    }
}

pub struct PreviewEngine<'a, R: RenderingCapability + ?Sized> {
    renderer: &'a R,
    registry: &'a FormatRegistry,
    config: PreviewConfig,
}

impl<'a, R: RenderingCapability + ?Sized> PreviewEngine<'a, R> {
    pub fn new(renderer: &'a R, registry: &'a FormatRegistry) -> Self {
        Self::with_config(renderer, registry, PreviewConfig::default())
    }

    pub fn with_config(renderer: &'a R, registry: &'a FormatRegistry, config: PreviewConfig) -> Self {
        PreviewEngine {
            renderer,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Resolves a format reference against the registry.
    fn resolve<'s>(&'s self, format: FormatRef<'s>) -> Option<&'s FormatDefinition> {
        match format {
            FormatRef::Definition(def) => Some(def),
            FormatRef::Named(name) => {
                let found = self.registry.get(name);
                if found.is_none() {
                    warn!("no format named {:?}; preview is empty", name);
                }
                found
            }
        }
    }

    /// The property list a format's preview reads, or `None` when the format
    /// has no preview.
    fn properties_for<'p>(&'p self, format: &'p FormatDefinition) -> Option<&'p [String]> {
        if self.config.is_disabled() {
            return None;
        }
        match &format.preview {
            PreviewStyles::Disabled => None,
            PreviewStyles::Only(list) if !list.is_empty() => Some(list.as_slice()),
            PreviewStyles::Only(_) | PreviewStyles::Inherit => Some(self.config.preview_styles.as_slice()),
        }
    }

    /// Builds the preview fragment of a format and returns it with its target.
    /// `None` when the format cannot be resolved.
    pub fn preview_fragment<'f>(
        &self,
        format: impl Into<FormatRef<'f>>,
        extra_classes: &[&str],
        context: &EvaluationContext,
    ) -> Option<(Fragment, NodePath)> {
        let format = self.resolve(format.into())?;
        Some(build_fragment(format, extra_classes, context))
    }

    /// Computed CSS text of a format's preview element.
    ///
    /// Returns an empty string when previews are disabled, the format has no
    /// preview, or the named format is unknown. The only error is a renderer
    /// that cannot produce styles.
    pub fn preview_css<'f>(
        &self,
        format: impl Into<FormatRef<'f>>,
        extra_classes: &[&str],
        context: &EvaluationContext,
    ) -> Result<String, PreviewError> {
        let Some(format) = self.resolve(format.into()) else {
            return Ok(String::new());
        };
        let Some(properties) = self.properties_for(format) else {
            debug!("preview disabled for {:?}", format.kind);
            return Ok(String::new());
        };

        let (fragment, target) = build_fragment(format, extra_classes, context);
        debug!("previewing {}", fragment.outer_html());
        extract_css_text(&fragment, &target, self.renderer, Some(properties))
    }
}

fn build_fragment(format: &FormatDefinition, extra_classes: &[&str], context: &EvaluationContext) -> (Fragment, NodePath) {
    let mut fragment = Fragment::new();
    let target = apply_format(&mut fragment, format, context);
    if let Some(node) = fragment.node_mut(&target) {
        for class in extra_classes.iter().flat_map(|c| c.split_whitespace()) {
            node.add_class(class);
        }
    }
    (fragment, target)
}

/// One-shot preview with the default configuration.
pub fn get_preview_css<'f, R: RenderingCapability + ?Sized>(
    renderer: &R,
    registry: &FormatRegistry,
    format: impl Into<FormatRef<'f>>,
) -> Result<String, PreviewError> {
    let engine = PreviewEngine::new(renderer, registry);
    engine.preview_css(format, &[], &EvaluationContext::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records what was asked; answers `tag:property` for every property.
    #[derive(Default)]
    struct Echo {
        calls: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl RenderingCapability for Echo {
        fn compute_style(
            &self,
            fragment: &Fragment,
            target: &[usize],
            property_names: &[String],
        ) -> Result<Vec<(String, Option<String>)>, PreviewError> {
            let tag = fragment.node(target).map(|n| n.tag.clone()).unwrap_or_default();
            self.calls.borrow_mut().push((fragment.outer_html(), property_names.to_vec()));
            Ok(property_names
                .iter()
                .map(|p| (p.clone(), Some(tag.clone())))
                .collect())
        }
    }

    #[test]
    fn test_config_parsing() {
        let config = PreviewConfig::from_preview_styles("  color   font-size ");
        assert_eq!(config.preview_styles, vec!["color", "font-size"]);
        assert!(PreviewConfig::from_preview_styles("").is_disabled());
        assert_eq!(PreviewConfig::default().preview_styles.len(), 14);
    }

    #[test]
    fn test_named_and_unknown_formats() {
        let renderer = Echo::default();
        let registry = FormatRegistry::with_builtins();
        let engine = PreviewEngine::with_config(&renderer, &registry, PreviewConfig::from_preview_styles("color"));
        let ctx = EvaluationContext::new();
        assert_eq!(engine.preview_css("bold", &[], &ctx).unwrap(), "color:strong");
        assert_eq!(engine.preview_css("no-such-format", &[], &ctx).unwrap(), "");
        assert_eq!(renderer.calls.borrow().len(), 1);
    }

    #[test]
    fn test_disabled_previews_never_render() {
        let renderer = Echo::default();
        let registry = FormatRegistry::new();
        let ctx = EvaluationContext::new();

        let engine = PreviewEngine::with_config(&renderer, &registry, PreviewConfig::from_preview_styles(""));
        assert_eq!(engine.preview_css(&FormatDefinition::inline("b"), &[], &ctx).unwrap(), "");

        let engine = PreviewEngine::new(&renderer, &registry);
        let format = FormatDefinition::inline("b").with_preview(PreviewStyles::Disabled);
        assert_eq!(engine.preview_css(&format, &[], &ctx).unwrap(), "");
        assert!(renderer.calls.borrow().is_empty());
    }

    #[test]
    fn test_format_property_list_overrides_config() {
        let renderer = Echo::default();
        let registry = FormatRegistry::new();
        let engine = PreviewEngine::new(&renderer, &registry);
        let format = FormatDefinition::inline("b").with_preview(PreviewStyles::Only(vec!["font-size".into()]));
        let css = engine.preview_css(&format, &[], &EvaluationContext::new()).unwrap();
        assert_eq!(css, "font-size:b");
    }

    #[test]
    fn test_extra_classes_are_unioned() {
        let renderer = Echo::default();
        let registry = FormatRegistry::new();
        let engine = PreviewEngine::new(&renderer, &registry);
        let format = FormatDefinition::selector("p.a");
        let (fragment, target) = engine
            .preview_fragment(&format, &["a b", "c"], &EvaluationContext::new())
            .unwrap();
        assert_eq!(target, vec![0]);
        assert_eq!(fragment.outer_html(), r#"<div><p class="a b c"></p></div>"#);
    }

    #[test]
    fn test_one_shot_helper() {
        let renderer = Echo::default();
        let registry = FormatRegistry::with_builtins();
        let css = get_preview_css(&renderer, &registry, "h2").unwrap();
        assert!(css.starts_with("background-color:h2;color:h2;"));
    }
}
