//! Two-column composition.

use std::collections::BTreeMap;

use chrono::Utc;
use winfetch::config::{Config, DisplayLayout};
use winfetch::render::{Cell, RenderedLine};
use winfetch::system::{FactKey, FactValue, SystemFacts};
use winfetch::theme::ThemeSpec;
use winfetch::ui::{GUTTER, compose, info_lines};

fn facts() -> SystemFacts {
    let mut values = BTreeMap::new();
    values.insert(FactKey::User, FactValue::Known("me@box".to_string()));
    values.insert(FactKey::Os, FactValue::Known("Windows 10".to_string()));
    values.insert(FactKey::Kernel, FactValue::Known("10.0.19045".to_string()));
    values.insert(FactKey::Memory, FactValue::Known("2.00 GiB / 8.00 GiB (25%)".to_string()));
    SystemFacts::new(values, Utc::now())
}

fn layout(keys: &[&str]) -> DisplayLayout {
    let mut layout = Config::default().layout();
    layout.info_display = keys.iter().map(|k| k.to_string()).collect();
    layout.color_blocks = false;
    layout
}

fn visual(rows: usize, width: usize) -> Vec<RenderedLine> {
    (0..rows)
        .map(|_| RenderedLine::new(vec![Cell::new('#', None); width]))
        .collect()
}

#[test]
fn unknown_keys_are_skipped() {
    let theme = ThemeSpec::default();
    let with_bogus = info_lines(&facts(), &layout(&["os", "foobar", "kernel"]), &theme, None);
    let without = info_lines(&facts(), &layout(&["os", "kernel"]), &theme, None);
    assert_eq!(with_bogus, without);

    let text: Vec<String> = with_bogus.iter().map(RenderedLine::text).collect();
    assert!(text.contains(&"OS: Windows 10".to_string()));
    assert!(text.contains(&"Kernel: 10.0.19045".to_string()));
    assert!(!text.iter().any(|line| line.contains("foobar")));
}

#[test]
fn short_visual_is_padded_not_truncated() {
    let lines = compose(&visual(2, 4), &facts(), &layout(&["os", "kernel", "memory"]), &ThemeSpec::default(), None);
    // title, rule, blank and three facts
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0].text(), format!("####{}me@box", " ".repeat(GUTTER)));
    assert_eq!(lines[5].text(), format!("{}Memory: 2.00 GiB / 8.00 GiB (25%)", " ".repeat(4 + GUTTER)));
}

#[test]
fn long_visual_keeps_every_row() {
    let lines = compose(&visual(10, 3), &facts(), &layout(&["os"]), &ThemeSpec::default(), None);
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[3].text(), format!("###{}OS: Windows 10", " ".repeat(GUTTER)));
    assert_eq!(lines[9].text(), "###");
}

#[test]
fn empty_visual_has_no_gutter() {
    let lines = compose(&[], &facts(), &layout(&["os"]), &ThemeSpec::default(), None);
    assert_eq!(lines[0].text(), "me@box");
}

#[test]
fn unknown_facts_show_the_sentinel() {
    let lines = info_lines(&facts(), &layout(&["gpu"]), &ThemeSpec::default(), None);
    assert_eq!(lines[3].text(), "GPU: Unknown");
}
