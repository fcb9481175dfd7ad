extern crate criterion;

use criterion::{criterion_group, criterion_main, Criterion};

use formatpreview_lib::format::{apply_format, EvaluationContext, FormatDefinition};
use formatpreview_lib::parser::selector::parse_selector;
use formatpreview_lib::parser::structure::synthesize;
use formatpreview_lib::dom::dom_tree::Fragment;

fn bench_parse_and_synthesize(c: &mut Criterion) {
    let selector = r#"div.wrapper > ul + ol.someClass > li#someId[title="someTitle"]:disabled"#;

    c.bench_function("parse_and_synthesize", |b| {
        b.iter(|| synthesize(&parse_selector(selector)))
    });
}

fn bench_deep_chain(c: &mut Criterion) {
    let mut selector = String::new();
    for _ in 0..200 {
        selector.push_str("div.level > ");
    }
    selector.push_str("td.cell");

    c.bench_function("deep_chain", |b| {
        b.iter(|| synthesize(&parse_selector(&selector)))
    });
}

fn bench_apply_format(c: &mut Criterion) {
    let format = FormatDefinition::selector("table tr > td.cell")
        .with_class("preview %kind")
        .with_style("color", "%color")
        .with_attribute("title", "cell");
    let context = EvaluationContext::new()
        .with_var("kind", "highlight")
        .with_var("color", "#ff0000");

    c.bench_function("apply_format", |b| {
        b.iter(|| {
            let mut fragment = Fragment::new();
            apply_format(&mut fragment, &format, &context)
        })
    });
}

criterion_group!(benches, bench_parse_and_synthesize, bench_deep_chain, bench_apply_format);
criterion_main!(benches);
