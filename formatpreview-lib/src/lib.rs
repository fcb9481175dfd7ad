//! Format preview engine: turns a text-formatting rule into the computed CSS a
//! host editor shows in its format menus.
//!
//! The pipeline is selector parsing (`parser::selector`), structural synthesis
//! (`parser::structure`), format application (`format`) and style extraction
//! (`extract`) through a `render::RenderingCapability`.

pub mod dom;
pub mod error;
pub mod extract;
pub mod format;
pub mod parser;
pub mod preview;
pub mod render;
pub mod style;

pub use dom::dom_tree::{Fragment, NodePath, SynthesizedElement};
pub use error::{PreviewError, ValueError};
pub use extract::{extract_css_text, DEFAULT_PREVIEW_STYLES};
pub use format::{
    apply_format, EvaluationContext, FormatDefinition, FormatKind, FormatRegistry, PreviewStyles, ValueSource,
};
pub use parser::selector::{parse_selector, SelectorNode};
pub use parser::structure::{synthesize, StructuralRules};
pub use preview::{get_preview_css, FormatRef, PreviewConfig, PreviewEngine};
pub use render::{RenderingCapability, StyleSheetRenderer};
