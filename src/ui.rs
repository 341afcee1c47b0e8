use std::io::{self, Write};
use std::time::Duration;

use crossterm::style::Color;
use tracing::warn;

use crate::config::DisplayLayout;
use crate::render::{Cell, RenderedLine};
use crate::system::{FactKey, SystemFacts};
use crate::theme::ThemeSpec;

/// Blank columns between the visual and the facts.
pub const GUTTER: usize = 2;

const BOX_LEFT_PAD: usize = 2;

// black, red, green, yellow, blue, magenta, cyan, white; then bright
const SWATCHES: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (170, 0, 0),
    (0, 170, 0),
    (170, 85, 0),
    (0, 0, 170),
    (170, 0, 170),
    (0, 170, 170),
    (170, 170, 170),
    (85, 85, 85),
    (255, 85, 85),
    (85, 255, 85),
    (255, 255, 85),
    (85, 85, 255),
    (255, 85, 255),
    (85, 255, 255),
    (255, 255, 255),
];

/// `Reset` means "terminal default", which a cell expresses as no colour.
fn paint(color: Color) -> Option<Color> {
    (color != Color::Reset).then_some(color)
}

fn fact_line(key: FactKey, facts: &SystemFacts, theme: &ThemeSpec) -> RenderedLine {
    let mut line = RenderedLine::default();
    line.push_str(&format!("{}:", key.label()), paint(theme.label));
    line.push(Cell::blank());
    line.push_str(facts.display(key), paint(theme.value));
    line
}

fn swatch_rows() -> Vec<RenderedLine> {
    SWATCHES
        .chunks(8)
        .map(|row| {
            let cells = row
                .iter()
                .flat_map(|&(r, g, b)| {
                    let cell = Cell {
                        ch: ' ',
                        fg: None,
                        bg: Some(Color::Rgb { r, g, b }),
                    };
                    [cell; 3]
                })
                .collect();
            RenderedLine::new(cells)
        })
        .collect()
}

fn horizontal(left: char, right: char, inner: usize, color: Option<Color>) -> RenderedLine {
    let mut line = RenderedLine::default();
    line.push(Cell::new(left, color));
    for _ in 0..inner {
        line.push(Cell::new('─', color));
    }
    line.push(Cell::new(right, color));
    line
}

/// Wraps `content` in `│  ... │`, padded to `inner` columns.
fn boxed(content: &RenderedLine, inner: usize, color: Option<Color>) -> RenderedLine {
    let mut line = RenderedLine::default();
    line.push(Cell::new('│', color));
    line.push_str(&" ".repeat(BOX_LEFT_PAD), None);
    line.extend(content);
    line.pad_to(inner + 1);
    line.push(Cell::new('│', color));
    line
}

fn timing_line(elapsed: Duration, theme: &ThemeSpec) -> RenderedLine {
    let mut line = RenderedLine::default();
    line.push_str("Executed in", paint(theme.label));
    line.push(Cell::blank());
    line.push_str(&format!("{:.2}s", elapsed.as_secs_f64()), paint(theme.value));
    line
}

/// The right-hand column: title, facts in `layout.info_display` order, the
/// run time when given, then the colour swatches. Unknown keys are skipped
/// with a warning.
pub fn info_lines(
    facts: &SystemFacts,
    layout: &DisplayLayout,
    theme: &ThemeSpec,
    elapsed: Option<Duration>,
) -> Vec<RenderedLine> {
    let title_text = facts.display(FactKey::User).to_string();
    let mut title = RenderedLine::default();
    title.push_str(&title_text, paint(theme.title));

    let body: Vec<RenderedLine> = layout
        .info_display
        .iter()
        .filter_map(|name| match name.parse::<FactKey>() {
            Ok(key) => Some(fact_line(key, facts, theme)),
            Err(e) => {
                warn!("info_display: {}, skipping", e);
                None
            }
        })
        .collect();

    let mut lines = Vec::new();
    if layout.info_box {
        let border = paint(theme.border);
        let content = body.iter().map(RenderedLine::width).chain([title.width()]).max().unwrap_or(0);
        let inner = content + BOX_LEFT_PAD + 1;

        let mut centered = RenderedLine::blank((content.saturating_sub(title.width())) / 2);
        centered.extend(&title);

        lines.push(horizontal('┌', '┐', inner, border));
        lines.push(boxed(&centered, inner, border));
        lines.push(horizontal('├', '┤', inner, border));
        lines.extend(body.iter().map(|line| boxed(line, inner, border)));
        lines.push(horizontal('└', '┘', inner, border));
    } else {
        let mut rule = RenderedLine::default();
        rule.push_str(&"-".repeat(title_text.chars().count()), paint(theme.border));
        lines.push(title);
        lines.push(rule);
        lines.push(RenderedLine::default());
        lines.extend(body);
    }

    if let Some(elapsed) = elapsed {
        lines.push(RenderedLine::default());
        lines.push(timing_line(elapsed, theme));
    }

    if layout.color_blocks {
        lines.push(RenderedLine::default());
        lines.extend(swatch_rows());
    }
    lines
}

/// Zips the visual block with the facts column row by row. The shorter side
/// is padded with blank cells; nothing is ever truncated.
pub fn compose(
    visual: &[RenderedLine],
    facts: &SystemFacts,
    layout: &DisplayLayout,
    theme: &ThemeSpec,
    elapsed: Option<Duration>,
) -> Vec<RenderedLine> {
    let info = info_lines(facts, layout, theme, elapsed);
    let visual_width = visual.iter().map(RenderedLine::width).max().unwrap_or(0);
    let rows = visual.len().max(info.len());

    (0..rows)
        .map(|i| {
            let mut line = visual.get(i).cloned().unwrap_or_default();
            line.pad_to(visual_width);
            if let Some(right) = info.get(i) {
                if visual_width > 0 {
                    line.pad_to(visual_width + GUTTER);
                }
                line.extend(right);
            }
            line
        })
        .collect()
}

/// Writes composed lines with ANSI colours.
pub fn display_output(lines: &[RenderedLine], out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    for line in lines {
        line.write_ansi(out)?;
        writeln!(out)?;
    }
    writeln!(out)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::system::FactValue;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn facts() -> SystemFacts {
        let mut values = BTreeMap::new();
        values.insert(FactKey::User, FactValue::Known("ada@engine".to_string()));
        values.insert(FactKey::Os, FactValue::Known("Windows 11 Pro".to_string()));
        values.insert(FactKey::Cpu, FactValue::Known("Ryzen".to_string()));
        SystemFacts::new(values, Utc::now())
    }

    fn layout(keys: &[&str]) -> DisplayLayout {
        let mut layout = Config::default().layout();
        layout.info_display = keys.iter().map(|k| k.to_string()).collect();
        layout.color_blocks = false;
        layout
    }

    #[test]
    fn header_then_facts_in_order() {
        let lines = info_lines(&facts(), &layout(&["cpu", "os", "gpu"]), &ThemeSpec::default(), None);
        let text: Vec<String> = lines.iter().map(RenderedLine::text).collect();
        assert_eq!(
            text,
            vec!["ada@engine", "----------", "", "CPU: Ryzen", "OS: Windows 11 Pro", "GPU: Unknown"]
        );
    }

    #[test]
    fn labels_and_values_use_their_own_colours() {
        let theme = ThemeSpec {
            value: Color::Yellow,
            ..ThemeSpec::default()
        };
        let lines = info_lines(&facts(), &layout(&["os"]), &theme, None);
        let os = &lines[3];
        assert_eq!(os.cells()[0].fg, Some(theme.label));
        assert_eq!(os.cells()[4].fg, Some(Color::Yellow));
    }

    #[test]
    fn box_lines_share_one_width() {
        let mut layout = layout(&["os", "cpu"]);
        layout.info_box = true;
        let lines = info_lines(&facts(), &layout, &ThemeSpec::default(), None);
        assert_eq!(lines.len(), 6);
        let width = lines[0].width();
        assert!(lines.iter().all(|l| l.width() == width));
        assert!(lines[1].text().contains("ada@engine"));
        assert!(lines[3].text().starts_with("│  OS: "));
    }

    #[test]
    fn swatches_are_appended() {
        let mut layout = layout(&[]);
        layout.color_blocks = true;
        let lines = info_lines(&facts(), &layout, &ThemeSpec::default(), None);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[4].width(), 24);
        assert_eq!(lines[5].cells()[0].bg, Some(Color::Rgb { r: 85, g: 85, b: 85 }));
    }

    #[test]
    fn run_time_sits_between_facts_and_swatches() {
        let mut layout = layout(&["os"]);
        layout.color_blocks = true;
        let lines = info_lines(&facts(), &layout, &ThemeSpec::default(), Some(Duration::from_millis(1234)));
        let text: Vec<String> = lines.iter().map(RenderedLine::text).collect();
        assert_eq!(text[4], "");
        assert_eq!(text[5], "Executed in 1.23s");
        assert_eq!(lines[5].cells()[0].fg, paint(ThemeSpec::default().label));
        assert_eq!(text[6], "");
        assert_eq!(lines[7].width(), 24);
    }

    #[test]
    fn display_output_ends_every_line() {
        let mut out = Vec::new();
        display_output(&[RenderedLine::blank(2), RenderedLine::blank(1)], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\n  \n \n\n");
    }
}
