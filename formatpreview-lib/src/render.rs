use crate::dom::dom_tree::{node_at, Fragment, SynthesizedElement};
use crate::error::PreviewError;
use crate::style::computed::{compute_style, ComputedStyle};
use crate::style::css_matcher::{cascade_declarations, compile_rules, matching_rules, CompiledRule};
use crate::style::owned_css::StyleOrigin;
use crate::style::stylesheet::{parse_and_own_css, parse_inline_style, USER_AGENT_CSS};
use log::{debug, trace};
use std::cell::Cell;

/// Something that can compute cascade-resolved styles for a fragment node.
///
/// `compute_style` returns one entry per requested property, in request order;
/// `None` means the property is unknown to the renderer.
pub trait RenderingCapability {
    fn compute_style(
        &self,
        fragment: &Fragment,
        target: &[usize],
        property_names: &[String],
    ) -> Result<Vec<(String, Option<String>)>, PreviewError>;
}

/// Renders fragments against a fixed set of stylesheets (user-agent + author).
///
/// Owns a single detached surface; it is acquired for the duration of one
/// `compute_style` call.
#[derive(Debug)]
pub struct StyleSheetRenderer {
    rules: Vec<CompiledRule>,
    surface_in_use: Cell<bool>,
}

impl StyleSheetRenderer {
    /// A renderer using the user-agent sheet plus one author stylesheet.
    pub fn new(author_css: &str) -> Result<Self, PreviewError> {
        Self::with_stylesheets(&[author_css])
    }

    /// A renderer using the user-agent sheet plus the author stylesheets, in
    /// order; later sheets win ties.
    pub fn with_stylesheets(author_sheets: &[&str]) -> Result<Self, PreviewError> {
        let mut next_order = 0;
        let user_agent = parse_and_own_css(USER_AGENT_CSS, StyleOrigin::UserAgent)?;
        let mut rules = compile_rules(&user_agent, &mut next_order);
        for css in author_sheets {
            let sheet = parse_and_own_css(css, StyleOrigin::Author)?;
            rules.extend(compile_rules(&sheet, &mut next_order));
        }
        debug!("renderer ready with {} compiled rule(s)", rules.len());
        Ok(StyleSheetRenderer {
            rules,
            surface_in_use: Cell::new(false),
        })
    }

    /// Takes the rendering surface, failing if it is already held.
    pub fn acquire_surface(&self) -> Result<RenderSurface<'_>, PreviewError> {
        if self.surface_in_use.replace(true) {
            return Err(PreviewError::RenderingUnavailable(
                "rendering surface is already in use".to_string(),
            ));
        }
        trace!("rendering surface acquired");
        Ok(RenderSurface {
            renderer: self,
            document: None,
        })
    }
}

impl RenderingCapability for StyleSheetRenderer {
    fn compute_style(
        &self,
        fragment: &Fragment,
        target: &[usize],
        property_names: &[String],
    ) -> Result<Vec<(String, Option<String>)>, PreviewError> {
        let mut surface = self.acquire_surface()?;
        surface.attach(fragment);
        let style = surface.computed_style(target).ok_or_else(|| {
            PreviewError::RenderingUnavailable(format!("no node at {:?} in the attached fragment", target))
        })?;

        Ok(property_names
            .iter()
            .map(|name| {
                let value = style.get(name);
                trace!("{} = {:?}", name, value);
                (name.clone(), value)
            })
            .collect())
    }
}

/// A held rendering surface. Dropping it detaches the document and frees the
/// surface for the next caller.
pub struct RenderSurface<'r> {
    renderer: &'r StyleSheetRenderer,
    document: Option<SynthesizedElement>,
}

impl RenderSurface<'_> {
    /// Attaches a copy of the fragment as the only content of `html > body`.
    pub fn attach(&mut self, fragment: &Fragment) {
        let mut body = SynthesizedElement::new("body");
        body.children.push(fragment.root.clone());
        let mut html = SynthesizedElement::new("html");
        html.children.push(body);
        self.document = Some(html);
    }

    /// Computed style of the node at `target` (relative to the fragment root),
    /// resolving every ancestor on the way down for inheritance.
    pub fn computed_style(&self, target: &[usize]) -> Option<ComputedStyle> {
        let document = self.document.as_ref()?;
        // html > body > fragment root
        let mut full_path = vec![0, 0];
        full_path.extend_from_slice(target);
        node_at(document, &full_path)?;

        let mut style: Option<ComputedStyle> = None;
        for depth in 0..=full_path.len() {
            let path = &full_path[..depth];
            let node = node_at(document, path)?;
            let matched = matching_rules(&self.renderer.rules, document, path);
            let inline = parse_inline_style(&node.style_text());
            let declared = cascade_declarations(&matched, &inline);
            style = Some(compute_style(&declared, style.as_ref()));
        }
        style
    }
}

impl Drop for RenderSurface<'_> {
    fn drop(&mut self) {
        self.document = None;
        self.renderer.surface_in_use.set(false);
        trace!("rendering surface released");
    }
}
