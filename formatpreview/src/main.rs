use clap::{ArgGroup, Parser};
use formatpreview_lib::dom::dom_tree::print_dom;
use formatpreview_lib::format::{EvaluationContext, FormatDefinition, FormatRegistry};
use formatpreview_lib::preview::{FormatRef, PreviewConfig, PreviewEngine};
use formatpreview_lib::render::StyleSheetRenderer;
use log::debug;
use std::fs;

#[derive(Parser)]
#[command(name = "formatpreview")]
#[command(about = "Print the computed CSS a text format previews with")]
#[command(group(ArgGroup::new("format").required(true).args(["selector", "inline", "block", "name"])))]
struct Args {
    /// Stylesheet to render against; may be repeated.
    #[arg(long = "css", value_name = "FILE")]
    css: Vec<String>,

    /// Selector format, e.g. "ol > li.preview".
    #[arg(long)]
    selector: Option<String>,

    /// Inline format tag.
    #[arg(long, value_name = "TAG")]
    inline: Option<String>,

    /// Block format tag.
    #[arg(long, value_name = "TAG")]
    block: Option<String>,

    /// Built-in format name (bold, italic, h1, ...).
    #[arg(long = "format", value_name = "NAME")]
    name: Option<String>,

    /// Extra class for the previewed element; may be repeated.
    #[arg(long = "class", value_name = "C")]
    classes: Vec<String>,

    /// Inline style as name=value; may be repeated.
    #[arg(long = "style", value_name = "K=V", value_parser = parse_pair)]
    styles: Vec<(String, String)>,

    /// Attribute as name=value; may be repeated.
    #[arg(long = "attr", value_name = "K=V", value_parser = parse_pair)]
    attributes: Vec<(String, String)>,

    /// Space-separated list of properties to read.
    #[arg(long)]
    preview_styles: Option<String>,

    /// Also print the synthesized fragment.
    #[arg(long)]
    html: bool,
}

fn parse_pair(text: &str) -> Result<(String, String), String> {
    text.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected name=value, got {:?}", text))
}

fn main() {
    env_logger::init();

    // parse the args given in terminal
    let args: Args = Args::parse();

    let mut sheets = Vec::new();
    for path in &args.css {
        match fs::read_to_string(path) {
            Ok(css) => sheets.push(css),
            Err(e) => {
                eprintln!("Error reading stylesheet {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }
    let sheet_refs: Vec<&str> = sheets.iter().map(String::as_str).collect();
    let renderer = match StyleSheetRenderer::with_stylesheets(&sheet_refs) {
        Ok(renderer) => renderer,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let ad_hoc = if let Some(selector) = &args.selector {
        Some(FormatDefinition::selector(selector))
    } else if let Some(tag) = &args.inline {
        Some(FormatDefinition::inline(tag))
    } else {
        args.block.as_deref().map(FormatDefinition::block)
    };
    let ad_hoc = ad_hoc.map(|mut format| {
        for (name, value) in &args.styles {
            format = format.with_style(name, value.as_str());
        }
        for (name, value) in &args.attributes {
            format = format.with_attribute(name, value.as_str());
        }
        format
    });

    let format = match (&ad_hoc, &args.name) {
        (Some(def), _) => FormatRef::Definition(def),
        (None, Some(name)) => FormatRef::Named(name),
        (None, None) => {
            eprintln!("No format given.");
            std::process::exit(1);
        }
    };

    let registry = FormatRegistry::with_builtins();
    let config = match &args.preview_styles {
        Some(list) => PreviewConfig::from_preview_styles(list),
        None => PreviewConfig::default(),
    };
    let engine = PreviewEngine::with_config(&renderer, &registry, config);
    let classes: Vec<&str> = args.classes.iter().map(String::as_str).collect();
    let context = EvaluationContext::new();

    if args.html {
        match engine.preview_fragment(format, &classes, &context) {
            Some((fragment, target)) => {
                debug!("target path {:?}\n{}", target, print_dom(&fragment.root, 0));
                println!("{}", fragment.outer_html());
            }
            None => eprintln!("No such format."),
        }
    }

    match engine.preview_css(format, &classes, &context) {
        Ok(css) => println!("{}", css),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
