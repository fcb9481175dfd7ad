pub mod dom_tree {
    use std::fmt::Write as _;

    /// Elements serialized without a closing tag.
    pub const VOID_ELEMENTS: &[&str] = &[
        "meta", "img", "br", "hr", "input", "link", "area", "base", "col", "embed", "param",
        "source", "track", "wbr",
    ];

    /// Child indices leading from a fragment's root to one of its nodes.
    /// The empty path addresses the root itself.
    pub type NodePath = Vec<usize>;

    /// One element of a synthesized preview fragment.
    ///
    /// Children are owned; a fragment is a plain tree.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SynthesizedElement {
        pub tag: String,
        /// Ordered set: insertion order kept, duplicates rejected by `add_class`.
        pub classes: Vec<String>,
        pub attributes: Vec<(String, String)>,
        /// Inline style declarations, serialized into the `style` attribute.
        pub styles: Vec<(String, String)>,
        pub children: Vec<SynthesizedElement>,
    }

    impl SynthesizedElement {
        pub fn new(tag: impl Into<String>) -> Self {
            SynthesizedElement {
                tag: tag.into(),
                classes: Vec::new(),
                attributes: Vec::new(),
                styles: Vec::new(),
                children: Vec::new(),
            }
        }

        /// Adds a class unless it is already present. Returns whether it was added.
        pub fn add_class(&mut self, class: &str) -> bool {
            if class.is_empty() || self.has_class(class) {
                return false;
            }
            self.classes.push(class.to_string());
            true
        }

        pub fn has_class(&self, class: &str) -> bool {
            self.classes.iter().any(|c| c == class)
        }

        /// Sets an attribute, replacing an existing value in place.
        pub fn set_attribute(&mut self, name: &str, value: &str) {
            set_entry(&mut self.attributes, name, value);
        }

        /// Sets an inline style declaration, replacing an existing value in place.
        pub fn set_style(&mut self, name: &str, value: &str) {
            set_entry(&mut self.styles, name, value);
        }

        /// Attribute lookup as seen by selector matching: `class` and `style`
        /// are derived from the dedicated fields.
        pub fn attribute(&self, name: &str) -> Option<String> {
            if name.eq_ignore_ascii_case("class") {
                return (!self.classes.is_empty()).then(|| self.classes.join(" "));
            }
            if name.eq_ignore_ascii_case("style") && !self.styles.is_empty() {
                return Some(self.style_text());
            }
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        }

        /// The inline style as a declaration list, e.g. `color: red; font-size: 12px`.
        /// An explicit `style` attribute comes first so that `styles` wins.
        pub fn style_text(&self) -> String {
            let mut parts = Vec::new();
            if let Some((_, raw)) = self
                .attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("style"))
            {
                let raw = raw.trim().trim_end_matches(';');
                if !raw.is_empty() {
                    parts.push(raw.to_string());
                }
            }
            for (k, v) in &self.styles {
                parts.push(format!("{}: {}", k, v));
            }
            parts.join("; ")
        }

        /// Serializes this element and its subtree as HTML.
        pub fn outer_html(&self) -> String {
            let mut out = String::new();
            write_html(self, &mut out);
            out
        }
    }

    /// A synthesized preview fragment: a sandbox `div` root plus the node the
    /// format targets, if one has been established.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Fragment {
        pub root: SynthesizedElement,
        pub target: Option<NodePath>,
    }

    impl Fragment {
        /// An empty sandbox root with no target.
        pub fn new() -> Self {
            Fragment {
                root: SynthesizedElement::new("div"),
                target: None,
            }
        }

        pub fn node(&self, path: &[usize]) -> Option<&SynthesizedElement> {
            node_at(&self.root, path)
        }

        pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut SynthesizedElement> {
            let mut current = &mut self.root;
            for &index in path {
                current = current.children.get_mut(index)?;
            }
            Some(current)
        }

        pub fn target_node(&self) -> Option<&SynthesizedElement> {
            self.target.as_deref().and_then(|path| self.node(path))
        }

        pub fn outer_html(&self) -> String {
            self.root.outer_html()
        }
    }

    impl Default for Fragment {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Resolves a path below `root`.
    pub fn node_at<'a>(root: &'a SynthesizedElement, path: &[usize]) -> Option<&'a SynthesizedElement> {
        let mut current = root;
        for &index in path {
            current = current.children.get(index)?;
        }
        Some(current)
    }

    /// Renders an indented tree dump, one element per line.
    pub fn print_dom(node: &SynthesizedElement, indent: usize) -> String {
        let mut out = String::new();
        print_dom_into(node, indent, &mut out);
        out
    }

    fn print_dom_into(node: &SynthesizedElement, indent: usize, out: &mut String) {
        let indentation = " ".repeat(indent);
        out.push_str(&indentation);
        write_open_tag(node, out);
        out.push('\n');
        for child in &node.children {
            print_dom_into(child, indent + 2, out);
        }
    }

    fn write_html(node: &SynthesizedElement, out: &mut String) {
        write_open_tag(node, out);
        if VOID_ELEMENTS.contains(&node.tag.as_str()) {
            return;
        }
        for child in &node.children {
            write_html(child, out);
        }
        let _ = write!(out, "</{}>", node.tag);
    }

    fn write_open_tag(node: &SynthesizedElement, out: &mut String) {
        let _ = write!(out, "<{}", node.tag);
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_attr(&node.classes.join(" ")));
        }
        for (k, v) in &node.attributes {
            if k.eq_ignore_ascii_case("style") {
                continue;
            }
            let _ = write!(out, " {}=\"{}\"", k, escape_attr(v));
        }
        let style = node.style_text();
        if !style.is_empty() {
            let _ = write!(out, " style=\"{};\"", escape_attr(&style));
        }
        out.push('>');
    }

    fn escape_attr(value: &str) -> String {
        value
            .replace('&', "&amp;")
            .replace('"', "&quot;")
            .replace('<', "&lt;")
    }

    fn set_entry(entries: &mut Vec<(String, String)>, name: &str, value: &str) {
        match entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
    }
}
