//! Declared values → computed values.
//!
//! Mirrors what a browser reports from `getComputedStyle` for the properties
//! previews read: colors as `rgb()`/`rgba()`, font sizes in px, numeric font
//! weights, inherited properties copied from the parent, and initial values
//! for anything never declared.

use std::collections::HashMap;

/// Root font size used for `rem` and the `medium` keyword.
pub const BASE_FONT_SIZE_PX: f32 = 16.0;

/// Properties that inherit from the parent when not declared.
pub const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "cursor",
    "direction",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "letter-spacing",
    "line-height",
    "list-style-type",
    "text-align",
    "text-indent",
    "text-shadow",
    "text-transform",
    "visibility",
    "white-space",
    "word-spacing",
];

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const CORNERS: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

/// Length-valued properties resolved to px. Percentages and keywords such as
/// `auto` are kept as declared.
const LENGTH_PROPERTIES: &[&str] = &[
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "border-top-left-radius",
    "border-top-right-radius",
    "border-bottom-right-radius",
    "border-bottom-left-radius",
    "letter-spacing",
    "word-spacing",
    "text-indent",
    "outline-width",
    "text-decoration-thickness",
];

/// Initial value of a property, or `None` when the renderer knows nothing about it.
pub fn initial_value(property: &str) -> Option<&'static str> {
    let value = match property {
        "color" => "rgb(0, 0, 0)",
        "border-top-color" | "border-right-color" | "border-bottom-color" | "border-left-color"
        | "outline-color" | "text-decoration-color" => "currentcolor",
        "background-color" => "rgba(0, 0, 0, 0)",
        "background-image" | "box-shadow" | "text-shadow" | "text-transform" | "text-decoration-line"
        | "outline-style" | "max-width" | "max-height" => "none",
        "border-top-style" | "border-right-style" | "border-bottom-style" | "border-left-style" => "none",
        "border-top-width" | "border-right-width" | "border-bottom-width" | "border-left-width" => "medium",
        "text-decoration-style" => "solid",
        "text-decoration-thickness" => "auto",
        "font-family" => "serif",
        "font-size" => "16px",
        "font-style" | "font-variant" | "font-variant-caps" | "font-stretch" | "line-height" | "letter-spacing"
        | "white-space" => "normal",
        "font-weight" => "400",
        "word-spacing" | "text-indent" | "outline-width" => "0px",
        "border-top-left-radius" | "border-top-right-radius" | "border-bottom-right-radius"
        | "border-bottom-left-radius" => "0px",
        "margin-top" | "margin-right" | "margin-bottom" | "margin-left" => "0px",
        "padding-top" | "padding-right" | "padding-bottom" | "padding-left" => "0px",
        "text-align" => "start",
        "vertical-align" => "baseline",
        "display" => "inline",
        "visibility" => "visible",
        "opacity" => "1",
        "direction" => "ltr",
        "list-style-type" => "disc",
        "cursor" | "width" | "height" => "auto",
        _ => return None,
    };
    Some(value)
}

/// Final set of CSS properties an element gets.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    pub properties: HashMap<String, String>,
}

impl ComputedStyle {
    pub fn new() -> Self {
        ComputedStyle {
            properties: HashMap::new(),
        }
    }

    /// Reads a property the way `getComputedStyle` would: explicit value,
    /// a shorthand composed from its longhands, or the initial value.
    pub fn get(&self, property: &str) -> Option<String> {
        if let Some(value) = self.properties.get(property) {
            return Some(value.clone());
        }
        match property {
            "margin" | "padding" => Some(self.compose_box(SIDES.map(|side| format!("{}-{}", property, side)))),
            "border-width" | "border-style" | "border-color" => {
                let part = &property["border-".len()..];
                Some(self.compose_box(SIDES.map(|side| format!("border-{}-{}", side, part))))
            }
            // The top side stands for the whole border.
            "border" => Some(format!(
                "{} {} {}",
                self.get_or_initial("border-top-width"),
                self.get_or_initial("border-top-style"),
                self.get_or_initial("border-top-color"),
            )),
            "border-radius" => Some(self.compose_box(CORNERS.map(|corner| format!("border-{}-radius", corner)))),
            "text-decoration" => self.get("text-decoration-line"),
            "outline" => Some(format!(
                "{} {} {}",
                self.get_or_initial("outline-color"),
                self.get_or_initial("outline-style"),
                self.get_or_initial("outline-width"),
            )),
            _ => match initial_value(property)? {
                initial if is_current_color(initial) => self.get("color"),
                initial => Some(initial.to_string()),
            },
        }
    }

    fn get_or_initial(&self, property: &str) -> String {
        self.get(property).unwrap_or_default()
    }

    fn compose_box(&self, names: [String; 4]) -> String {
        let [top, right, bottom, left] = names.map(|name| self.get_or_initial(&name));
        if top == right && right == bottom && bottom == left {
            top
        } else if top == bottom && right == left {
            format!("{} {}", top, right)
        } else if right == left {
            format!("{} {} {}", top, right, bottom)
        } else {
            format!("{} {} {} {}", top, right, bottom, left)
        }
    }

    fn font_size_px(&self) -> f32 {
        self.properties
            .get("font-size")
            .and_then(|v| parse_px(v))
            .unwrap_or(BASE_FONT_SIZE_PX)
    }
}

/// Resolves an element's declared values against its parent's computed style.
pub fn compute_style(declared: &HashMap<String, String>, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut computed = ComputedStyle::new();

    if let Some(parent) = parent {
        for property in INHERITED_PROPERTIES {
            if let Some(value) = parent.properties.get(*property) {
                computed.properties.insert((*property).to_string(), value.clone());
            }
        }
    }

    // Explicit keywords first, so later steps see concrete values.
    for (property, value) in declared {
        let inherited = INHERITED_PROPERTIES.contains(&property.as_str());
        let resolved = match value.trim().to_ascii_lowercase().as_str() {
            "inherit" => parent.and_then(|p| p.get(property)),
            "initial" => initial_value(property).map(str::to_string),
            "unset" | "revert" | "revert-layer" if inherited => parent.and_then(|p| p.get(property)),
            "unset" | "revert" | "revert-layer" => initial_value(property).map(str::to_string),
            _ => Some(value.clone()),
        };
        match resolved {
            Some(v) => computed.properties.insert(property.clone(), v),
            None => computed.properties.remove(property),
        };
    }

    let parent_font_size = parent.map_or(BASE_FONT_SIZE_PX, ComputedStyle::font_size_px);
    if let Some(size) = declared.get("font-size").and(computed.properties.get("font-size")) {
        if let Some(px) = resolve_font_size(size, parent_font_size) {
            computed.properties.insert("font-size".into(), format_px(px));
        }
    }
    let font_size = computed.font_size_px();

    if let Some(weight) = declared.get("font-weight").and(computed.properties.get("font-weight")) {
        let parent_weight = parent
            .and_then(|p| p.properties.get("font-weight"))
            .and_then(|w| w.parse::<u32>().ok())
            .unwrap_or(400);
        let weight = resolve_font_weight(weight, parent_weight);
        computed.properties.insert("font-weight".into(), weight);
    }

    for property in LENGTH_PROPERTIES {
        if let Some(value) = computed.properties.get(*property) {
            let value = resolve_lengths(value, font_size);
            computed.properties.insert((*property).to_string(), value);
        }
    }

    if let Some(height) = declared.get("line-height").and(computed.properties.get("line-height")) {
        let height = match split_number_unit(height) {
            Some((number, "%")) => format_px(number / 100.0 * font_size),
            Some((_, "")) => height.trim().to_string(),
            _ => resolve_lengths(height, font_size),
        };
        computed.properties.insert("line-height".into(), height);
    }

    for side in SIDES {
        let style = computed.get(&format!("border-{}-style", side)).unwrap_or_default();
        let name = format!("border-{}-width", side);
        let width = if matches!(style.as_str(), "none" | "hidden") {
            "0px".to_string()
        } else {
            let width = computed.get(&name).unwrap_or_default();
            match width.trim() {
                "thin" => "1px".to_string(),
                "medium" => "3px".to_string(),
                "thick" => "5px".to_string(),
                _ => resolve_lengths(&width, font_size),
            }
        };
        computed.properties.insert(name, width);
    }

    // `color` first: `currentcolor` elsewhere refers to it.
    let parent_color = parent.and_then(|p| p.get("color")).unwrap_or_else(|| "rgb(0, 0, 0)".to_string());
    if let Some(color) = computed.properties.get("color").cloned() {
        let color = if is_current_color(&color) { parent_color } else { normalize_color(&color) };
        computed.properties.insert("color".into(), color);
    }
    let own_color = computed.get("color").unwrap_or_default();
    let color_properties: Vec<String> = computed
        .properties
        .keys()
        .filter(|name| name.ends_with("-color"))
        .cloned()
        .collect();
    for name in color_properties {
        if let Some(value) = computed.properties.get(&name) {
            let value = if is_current_color(value) { own_color.clone() } else { normalize_color(value) };
            computed.properties.insert(name, value);
        }
    }

    computed
}

fn is_current_color(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("currentcolor")
}

/// Normalizes any parseable color to `rgb(r, g, b)` or `rgba(r, g, b, a)`.
/// Unparseable values are returned unchanged.
pub fn normalize_color(value: &str) -> String {
    match csscolorparser::parse(value.trim()) {
        Ok(color) => {
            let [r, g, b, a] = color.to_rgba8();
            if a == 255 {
                format!("rgb({}, {}, {})", r, g, b)
            } else {
                let alpha = (f32::from(a) / 255.0 * 100.0).round() / 100.0;
                format!("rgba({}, {}, {}, {})", r, g, b, alpha)
            }
        }
        Err(_) => value.to_string(),
    }
}

fn parse_px(value: &str) -> Option<f32> {
    value.trim().strip_suffix("px")?.trim().parse().ok()
}

fn format_px(px: f32) -> String {
    format!("{}px", (px * 100.0).round() / 100.0)
}

fn split_number_unit(value: &str) -> Option<(f32, &str)> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let number = value[..split].parse::<f32>().ok()?;
    Some((number, &value[split..]))
}

/// Resolves a font size to px against the parent's size.
pub fn resolve_font_size(value: &str, parent_px: f32) -> Option<f32> {
    let keyword = match value.trim().to_ascii_lowercase().as_str() {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(BASE_FONT_SIZE_PX),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "xxx-large" => Some(48.0),
        "smaller" => Some(parent_px / 1.2),
        "larger" => Some(parent_px * 1.2),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }

    let (number, unit) = split_number_unit(value)?;
    match unit.to_ascii_lowercase().as_str() {
        "px" | "" => Some(number),
        "em" => Some(number * parent_px),
        "%" => Some(number / 100.0 * parent_px),
        "rem" => Some(number * BASE_FONT_SIZE_PX),
        "pt" => Some(number * 4.0 / 3.0),
        "pc" => Some(number * 16.0),
        "in" => Some(number * 96.0),
        "cm" => Some(number * 96.0 / 2.54),
        "mm" => Some(number * 96.0 / 25.4),
        _ => None,
    }
}

/// Resolves one length to px. `em` is relative to the element's own font
/// size. Returns `None` for percentages, keywords and unknown units.
pub fn resolve_length(value: &str, font_size_px: f32) -> Option<f32> {
    let (number, unit) = split_number_unit(value)?;
    match unit.to_ascii_lowercase().as_str() {
        "px" => Some(number),
        "" if number == 0.0 => Some(0.0),
        "em" => Some(number * font_size_px),
        "ex" | "ch" => Some(number * font_size_px / 2.0),
        "rem" => Some(number * BASE_FONT_SIZE_PX),
        "pt" => Some(number * 4.0 / 3.0),
        "pc" => Some(number * 16.0),
        "in" => Some(number * 96.0),
        "cm" => Some(number * 96.0 / 2.54),
        "mm" => Some(number * 96.0 / 25.4),
        "q" => Some(number * 96.0 / 101.6),
        _ => None,
    }
}

/// Resolves every space-separated length in `value` (corner radii carry two),
/// keeping the tokens that are not lengths.
fn resolve_lengths(value: &str, font_size_px: f32) -> String {
    value
        .split_whitespace()
        .map(|token| match resolve_length(token, font_size_px) {
            Some(px) => format_px(px),
            None => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a font weight keyword to its numeric form.
pub fn resolve_font_weight(value: &str, parent_weight: u32) -> String {
    let weight = match value.trim().to_ascii_lowercase().as_str() {
        "normal" => 400,
        "bold" => 700,
        "bolder" => match parent_weight {
            0..=349 => 400,
            350..=549 => 700,
            _ => 900,
        },
        "lighter" => match parent_weight {
            0..=549 => 100,
            550..=749 => 400,
            _ => 700,
        },
        other => return other.to_string(),
    };
    weight.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_colors_are_normalized() {
        let style = compute_style(
            &declared(&[("color", "#ff0000"), ("background-color", "transparent")]),
            None,
        );
        assert_eq!(style.get("color").as_deref(), Some("rgb(255, 0, 0)"));
        assert_eq!(style.get("background-color").as_deref(), Some("rgba(0, 0, 0, 0)"));
        assert_eq!(normalize_color("not-a-color"), "not-a-color");
        assert_eq!(normalize_color("rgba(0, 0, 255, 0.5)"), "rgba(0, 0, 255, 0.5)");
    }

    #[test]
    fn test_inheritance_and_current_color() {
        let parent = compute_style(&declared(&[("color", "blue"), ("margin-top", "4px")]), None);
        let child = compute_style(&declared(&[("border-top-color", "currentColor")]), Some(&parent));
        assert_eq!(child.get("color").as_deref(), Some("rgb(0, 0, 255)"));
        assert_eq!(child.get("border-top-color").as_deref(), Some("rgb(0, 0, 255)"));
        // Not inherited.
        assert_eq!(child.get("margin-top").as_deref(), Some("0px"));

        let inherit = compute_style(&declared(&[("margin-top", "inherit")]), Some(&parent));
        assert_eq!(inherit.get("margin-top").as_deref(), Some("4px"));
    }

    #[test]
    fn test_font_size_resolution() {
        let parent = compute_style(&declared(&[("font-size", "20px")]), None);
        let child = compute_style(&declared(&[("font-size", "1.5em")]), Some(&parent));
        assert_eq!(child.get("font-size").as_deref(), Some("30px"));
        let child = compute_style(&declared(&[("font-size", "50%")]), Some(&parent));
        assert_eq!(child.get("font-size").as_deref(), Some("10px"));
        let h3 = compute_style(&declared(&[("font-size", "1.17em")]), None);
        assert_eq!(h3.get("font-size").as_deref(), Some("18.72px"));
        // Inherited sizes are already absolute.
        let grandchild = compute_style(&declared(&[]), Some(&parent));
        assert_eq!(grandchild.get("font-size").as_deref(), Some("20px"));
    }

    #[test]
    fn test_font_weight_resolution() {
        let bold = compute_style(&declared(&[("font-weight", "bold")]), None);
        assert_eq!(bold.get("font-weight").as_deref(), Some("700"));
        let bolder = compute_style(&declared(&[("font-weight", "bolder")]), Some(&bold));
        assert_eq!(bolder.get("font-weight").as_deref(), Some("900"));
        assert_eq!(resolve_font_weight("600", 400), "600");
    }

    #[test]
    fn test_shorthands_compose_from_longhands() {
        let mut longhands = declared(&[
            ("margin-top", "1px"),
            ("margin-right", "2px"),
            ("margin-bottom", "1px"),
            ("margin-left", "2px"),
            ("border-top-left-radius", "4px"),
        ]);
        for side in ["top", "right", "bottom", "left"] {
            longhands.insert(format!("border-{}-width", side), "1px".into());
            longhands.insert(format!("border-{}-style", side), "solid".into());
            longhands.insert(format!("border-{}-color", side), "red".into());
        }
        let style = compute_style(&longhands, None);
        assert_eq!(style.get("margin").as_deref(), Some("1px 2px"));
        assert_eq!(style.get("padding").as_deref(), Some("0px"));
        assert_eq!(style.get("border").as_deref(), Some("1px solid rgb(255, 0, 0)"));
        assert_eq!(style.get("border-style").as_deref(), Some("solid"));
        assert_eq!(style.get("border-radius").as_deref(), Some("4px 0px 0px"));
        assert_eq!(style.get("text-decoration").as_deref(), Some("none"));
    }

    #[test]
    fn test_lengths_resolve_to_px() {
        let style = compute_style(
            &declared(&[
                ("font-size", "20px"),
                ("margin-top", "1em"),
                ("margin-right", "0"),
                ("margin-bottom", "12pt"),
                ("margin-left", "auto"),
                ("padding-left", "10%"),
                ("letter-spacing", "0.1em"),
                ("border-top-left-radius", "1rem 2px"),
                ("line-height", "150%"),
            ]),
            None,
        );
        assert_eq!(style.get("margin-top").as_deref(), Some("20px"));
        assert_eq!(style.get("margin-right").as_deref(), Some("0px"));
        assert_eq!(style.get("margin-bottom").as_deref(), Some("16px"));
        assert_eq!(style.get("margin-left").as_deref(), Some("auto"));
        assert_eq!(style.get("padding-left").as_deref(), Some("10%"));
        assert_eq!(style.get("letter-spacing").as_deref(), Some("2px"));
        assert_eq!(style.get("border-top-left-radius").as_deref(), Some("16px 2px"));
        assert_eq!(style.get("line-height").as_deref(), Some("30px"));
        assert_eq!(resolve_length("1.5", 16.0), None);

        let unitless = compute_style(&declared(&[("line-height", "1.5")]), None);
        assert_eq!(unitless.get("line-height").as_deref(), Some("1.5"));
    }

    #[test]
    fn test_border_widths_follow_style() {
        let style = compute_style(
            &declared(&[
                ("border-top-style", "solid"),
                ("border-right-style", "dashed"),
                ("border-right-width", "thin"),
                ("border-bottom-width", "4px"),
            ]),
            None,
        );
        assert_eq!(style.get("border-top-width").as_deref(), Some("3px"));
        assert_eq!(style.get("border-right-width").as_deref(), Some("1px"));
        // No style, no width.
        assert_eq!(style.get("border-bottom-width").as_deref(), Some("0px"));
        assert_eq!(style.get("border-width").as_deref(), Some("3px 1px 0px 0px"));
    }

    #[test]
    fn test_initial_decoration_colors_follow_color() {
        let link = compute_style(&declared(&[("color", "#0000ee")]), None);
        assert_eq!(link.get("border").as_deref(), Some("0px none rgb(0, 0, 238)"));
        assert_eq!(link.get("outline-color").as_deref(), Some("rgb(0, 0, 238)"));
        assert_eq!(link.get("text-decoration-color").as_deref(), Some("rgb(0, 0, 238)"));

        let reset = compute_style(&declared(&[("color", "red"), ("border-left-color", "initial")]), None);
        assert_eq!(reset.get("border-left-color").as_deref(), Some("rgb(255, 0, 0)"));
    }

    #[test]
    fn test_unknown_properties_are_absent() {
        let style = compute_style(&declared(&[]), None);
        assert_eq!(style.get("font-style").as_deref(), Some("normal"));
        assert_eq!(style.get("made-up-property"), None);
    }
}
