//! Pixel grids and ASCII templates to coloured terminal cells

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crossterm::style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor};

use crate::picture::{PixelGrid, Rgba};
use crate::theme::ThemeSpec;

/// Rows used when neither height nor width is requested.
pub const DEFAULT_HEIGHT: u32 = 20;

/// Upper bound on any output width, requested or derived.
pub const MAX_WIDTH: u32 = 200;

/// Upper bound on any output height, requested or derived.
pub const MAX_HEIGHT: u32 = 200;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;

/// Averaged alpha below this renders as empty space.
const ALPHA_CUTOFF: u8 = 128;

const FULL_BLOCK: char = '█';
const UPPER_HALF: char = '▀';
const LOWER_HALF: char = '▄';
const BRAILLE_BASE: u32 = 0x2800;

/// Absorbs float error so uniform cells light every dot.
const LUMA_EPSILON: f64 = 1e-6;

/// Dot bit for sub-sample `[dy][dx]` of a 2x4 braille cell.
const BRAILLE_BITS: [[u32; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Block,
    HalfBlock,
    Braille,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(RenderMode::Block),
            "halfblock" | "half-block" | "half" => Ok(RenderMode::HalfBlock),
            "braille" => Ok(RenderMode::Braille),
            other => Err(format!("unknown render mode '{}'", other)),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderMode::Block => "block",
            RenderMode::HalfBlock => "halfblock",
            RenderMode::Braille => "braille",
        })
    }
}

/// One terminal cell. `None` colours leave the terminal default in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl Cell {
    pub const fn blank() -> Self {
        Self {
            ch: ' ',
            fg: None,
            bg: None,
        }
    }

    pub const fn new(ch: char, fg: Option<Color>) -> Self {
        Self { ch, fg, bg: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedLine {
    cells: Vec<Cell>,
}

impl RenderedLine {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn blank(width: usize) -> Self {
        Self {
            cells: vec![Cell::blank(); width],
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Appends `text` in one colour; spaces stay uncoloured.
    pub fn push_str(&mut self, text: &str, fg: Option<Color>) {
        for ch in text.chars() {
            if ch == ' ' {
                self.cells.push(Cell::blank());
            } else {
                self.cells.push(Cell::new(ch, fg));
            }
        }
    }

    pub fn extend(&mut self, other: &RenderedLine) {
        self.cells.extend_from_slice(&other.cells);
    }

    /// Right-pads with blank cells; never shortens.
    pub fn pad_to(&mut self, width: usize) {
        if self.cells.len() < width {
            self.cells.resize(width, Cell::blank());
        }
    }

    /// Characters only, without colour.
    pub fn text(&self) -> String {
        self.cells.iter().map(|cell| cell.ch).collect()
    }

    /// Writes the line with ANSI colour changes only where the colours change.
    pub fn write_ansi(&self, out: &mut impl Write) -> io::Result<()> {
        let mut current: (Option<Color>, Option<Color>) = (None, None);
        for cell in &self.cells {
            let wanted = (cell.fg, cell.bg);
            if wanted != current {
                write!(out, "{}", ResetColor)?;
                if let Some(fg) = cell.fg {
                    write!(out, "{}", SetForegroundColor(fg))?;
                }
                if let Some(bg) = cell.bg {
                    write!(out, "{}", SetBackgroundColor(bg))?;
                }
                current = wanted;
            }
            write!(out, "{}", cell.ch)?;
        }
        if current != (None, None) {
            write!(out, "{}", ResetColor)?;
        }
        Ok(())
    }
}

/// Requested output size. Missing dimensions are derived from the source
/// aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub max_width: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            height: None,
            width: None,
            max_width: MAX_WIDTH,
        }
    }
}

impl Geometry {
    pub fn new(height: Option<u32>, width: Option<u32>) -> Self {
        Self {
            height,
            width,
            ..Self::default()
        }
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width.clamp(1, MAX_WIDTH);
        self
    }

    /// Requested line count, clamped to `1..=MAX_HEIGHT`.
    pub fn rows(&self) -> Option<u32> {
        self.height.map(|h| h.clamp(1, MAX_HEIGHT))
    }

    /// `(columns, rows)` of the picture itself for a source of `src_w` x
    /// `src_h` pixels. Every dimension is clamped to `MAX_WIDTH`/`MAX_HEIGHT`.
    ///
    /// Both dimensions given: used as is. Height only: width follows the
    /// aspect ratio; if that exceeds `max_width` the picture is shrunk to fit
    /// and comes back shorter than [`Geometry::rows`]. Width only: height
    /// follows, narrowing the picture if it would pass `MAX_HEIGHT`. Neither:
    /// [`DEFAULT_HEIGHT`] rows, shrunk the same way.
    pub fn resolve(&self, src_w: u32, src_h: u32) -> (u32, u32) {
        let aspect = src_w.max(1) as f64 / src_h.max(1) as f64 * CELL_ASPECT;
        let cols_for = |rows: u32| (rows as f64 * aspect).round().clamp(1.0, u32::MAX as f64) as u32;
        let rows_for = |cols: u32| (cols as f64 / aspect).round().clamp(1.0, u32::MAX as f64) as u32;
        let cap = self.max_width.clamp(1, MAX_WIDTH);
        let fit = |rows: u32| {
            let cols = cols_for(rows);
            if cols > cap { (cap, rows_for(cap).min(rows)) } else { (cols, rows) }
        };

        match (self.width.map(|w| w.clamp(1, MAX_WIDTH)), self.rows()) {
            (Some(w), Some(h)) => (w, h),
            (None, Some(h)) => fit(h),
            (Some(w), None) => {
                let rows = rows_for(w);
                if rows > MAX_HEIGHT { (cols_for(MAX_HEIGHT).min(w), MAX_HEIGHT) } else { (w, rows) }
            }
            (None, None) => fit(DEFAULT_HEIGHT),
        }
    }
}

fn rgb(color: Rgba) -> Color {
    Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

fn visible(color: Rgba) -> bool {
    color.a >= ALPHA_CUTOFF
}

/// Area average of the source region behind each of `out_w` x `out_h`
/// samples, weighting colour by alpha. Regions are at least one pixel, so
/// upscaling repeats source pixels.
fn downsample(grid: &PixelGrid, out_w: u32, out_h: u32) -> Vec<Rgba> {
    let (src_w, src_h) = (grid.width() as u64, grid.height() as u64);
    let span = |i: u32, out: u32, src: u64| {
        let start = i as u64 * src / out as u64;
        let end = ((i as u64 + 1) * src / out as u64).max(start + 1).min(src);
        (start as u32, end as u32)
    };

    let mut samples = Vec::with_capacity(out_w as usize * out_h as usize);
    for oy in 0..out_h {
        let (y0, y1) = span(oy, out_h, src_h);
        for ox in 0..out_w {
            let (x0, x1) = span(ox, out_w, src_w);
            let (mut r, mut g, mut b, mut a) = (0u64, 0u64, 0u64, 0u64);
            let (mut pr, mut pg, mut pb) = (0u64, 0u64, 0u64);
            let mut count = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = grid.get(x, y);
                    let w = p.a as u64;
                    r += p.r as u64 * w;
                    g += p.g as u64 * w;
                    b += p.b as u64 * w;
                    a += w;
                    pr += p.r as u64;
                    pg += p.g as u64;
                    pb += p.b as u64;
                    count += 1;
                }
            }
            let avg = |weighted: u64, plain: u64| {
                if a > 0 {
                    ((weighted + a / 2) / a) as u8
                } else {
                    ((plain + count / 2) / count) as u8
                }
            };
            samples.push(Rgba::new(
                avg(r, pr),
                avg(g, pg),
                avg(b, pb),
                ((a + count / 2) / count) as u8,
            ));
        }
    }
    samples
}

/// Perceptual luminance (ITU-R BT.709 weights).
fn luminance(color: Rgba) -> f64 {
    0.2126 * color.r as f64 + 0.7152 * color.g as f64 + 0.0722 * color.b as f64
}

/// Renders `grid` to lines of exactly `cols` cells, where `(cols, rows)`
/// comes from `geometry`. A picture shrunk to fit the width cap is padded
/// with blank lines up to the requested row count. Deterministic for equal
/// inputs.
pub fn render_image(grid: &PixelGrid, mode: RenderMode, geometry: &Geometry) -> Vec<RenderedLine> {
    let (cols, rows) = geometry.resolve(grid.width(), grid.height());
    let mut lines = match mode {
        RenderMode::Block => render_block(grid, cols, rows),
        RenderMode::HalfBlock => render_half_block(grid, cols, rows),
        RenderMode::Braille => render_braille(grid, cols, rows),
    };
    let wanted = geometry.rows().unwrap_or(rows) as usize;
    while lines.len() < wanted {
        lines.push(RenderedLine::blank(cols as usize));
    }
    lines
}

// One colour sample per cell: fidelity is bounded by resolution only.
fn render_block(grid: &PixelGrid, cols: u32, rows: u32) -> Vec<RenderedLine> {
    let samples = downsample(grid, cols, rows);
    samples
        .chunks(cols as usize)
        .map(|row| {
            RenderedLine::new(
                row.iter()
                    .map(|&color| {
                        if visible(color) {
                            Cell::new(FULL_BLOCK, Some(rgb(color)))
                        } else {
                            Cell::blank()
                        }
                    })
                    .collect(),
            )
        })
        .collect()
}

fn render_half_block(grid: &PixelGrid, cols: u32, rows: u32) -> Vec<RenderedLine> {
    let samples = downsample(grid, cols, rows * 2);
    let stride = cols as usize;
    (0..rows as usize)
        .map(|row| {
            let upper = &samples[row * 2 * stride..(row * 2 + 1) * stride];
            let lower = &samples[(row * 2 + 1) * stride..(row * 2 + 2) * stride];
            let cells = upper
                .iter()
                .zip(lower)
                .map(|(&up, &down)| match (visible(up), visible(down)) {
                    (true, true) => Cell {
                        ch: UPPER_HALF,
                        fg: Some(rgb(up)),
                        bg: Some(rgb(down)),
                    },
                    (true, false) => Cell::new(UPPER_HALF, Some(rgb(up))),
                    (false, true) => Cell::new(LOWER_HALF, Some(rgb(down))),
                    (false, false) => Cell::blank(),
                })
                .collect();
            RenderedLine::new(cells)
        })
        .collect()
}

// Twice the horizontal and four times the vertical samples of block mode,
// one colour per cell.
fn render_braille(grid: &PixelGrid, cols: u32, rows: u32) -> Vec<RenderedLine> {
    let (sub_w, sub_h) = (cols.saturating_mul(2), rows.saturating_mul(4));
    let samples = downsample(grid, sub_w, sub_h);
    let at = |x: u32, y: u32| samples[y as usize * sub_w as usize + x as usize];

    (0..rows)
        .map(|row| {
            let cells = (0..cols)
                .map(|col| {
                    let dots: Vec<(u32, Rgba)> = (0..4)
                        .flat_map(|dy| (0..2).map(move |dx| (dx, dy)))
                        .map(|(dx, dy)| (BRAILLE_BITS[dy as usize][dx as usize], at(col * 2 + dx, row * 4 + dy)))
                        .filter(|(_, color)| visible(*color))
                        .collect();
                    if dots.is_empty() {
                        return Cell::blank();
                    }

                    // a dot is on when it is at least as bright as the cell mean
                    let mean = dots.iter().map(|(_, c)| luminance(*c)).sum::<f64>() / dots.len() as f64;
                    let lit: Vec<&(u32, Rgba)> = dots
                        .iter()
                        .filter(|(_, c)| luminance(*c) + LUMA_EPSILON >= mean)
                        .collect();
                    let bits: u32 = lit.iter().map(|(bit, _)| bit).sum();
                    let n = lit.len() as u32;
                    let channel = |f: fn(&Rgba) -> u8| {
                        ((lit.iter().map(|(_, c)| f(c) as u32).sum::<u32>() + n / 2) / n) as u8
                    };
                    let color = Rgba::opaque(channel(|c| c.r), channel(|c| c.g), channel(|c| c.b));
                    let glyph = char::from_u32(BRAILLE_BASE + bits).unwrap_or(' ');
                    Cell::new(glyph, Some(rgb(color)))
                })
                .collect();
            RenderedLine::new(cells)
        })
        .collect()
}

/// Colours an ASCII template. `$1`..`$9` switch to the theme palette entry,
/// `$0` back to the accent colour. Lines are padded to a common width and,
/// when `min_height` is larger than the template, blank lines are appended.
pub fn render_ascii(template: &str, theme: &ThemeSpec, min_height: Option<u32>) -> Vec<RenderedLine> {
    let mut lines: Vec<RenderedLine> = template
        .lines()
        .map(|source| {
            let mut line = RenderedLine::default();
            let mut color = theme.accent;
            let mut chars = source.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '$' {
                    if let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
                        chars.next();
                        color = if digit == 0 { theme.accent } else { theme.palette_color(digit as usize) };
                        continue;
                    }
                }
                match c {
                    '\t' => line.push_str("    ", None),
                    ' ' => line.push(Cell::blank()),
                    _ => line.push(Cell::new(c, Some(color))),
                }
            }
            line
        })
        .collect();

    let width = lines.iter().map(RenderedLine::width).max().unwrap_or(0);
    for line in &mut lines {
        line.pad_to(width);
    }
    let height = min_height.unwrap_or(0).min(MAX_HEIGHT) as usize;
    while lines.len() < height {
        lines.push(RenderedLine::blank(width));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: Rgba) -> PixelGrid {
        PixelGrid::from_fn(w, h, |_, _| color).unwrap()
    }

    #[test]
    fn geometry_derives_width_from_aspect() {
        let g = Geometry::new(Some(10), None);
        assert_eq!(g.resolve(100, 100), (20, 10));
        assert_eq!(g.resolve(200, 100), (40, 10));
    }

    #[test]
    fn geometry_caps_derived_width() {
        let g = Geometry::new(Some(20), None).with_max_width(30);
        assert_eq!(g.resolve(100, 100), (30, 15));

        let g = Geometry::default().with_max_width(20);
        assert_eq!(g.resolve(100, 100), (20, 10));
    }

    #[test]
    fn wide_source_is_shrunk_to_the_cap_not_squashed() {
        // 10:1 source wants 400 columns at 20 rows
        assert_eq!(Geometry::default().resolve(1000, 100), (MAX_WIDTH, 10));
        assert_eq!(Geometry::new(None, Some(100)).resolve(10, 1000), (4, MAX_HEIGHT));
    }

    #[test]
    fn capped_picture_keeps_aspect_and_requested_rows() {
        let grid = solid(100, 100, Rgba::opaque(0, 128, 0));
        let lines = render_image(&grid, RenderMode::Block, &Geometry::new(Some(20), None).with_max_width(30));
        assert_eq!(lines.len(), 20);
        assert!(lines.iter().all(|l| l.width() == 30));
        assert!(lines[..15].iter().all(|l| l.cells().iter().all(|c| c.ch == FULL_BLOCK)));
        assert!(lines[15..].iter().all(|l| l.cells().iter().all(|c| *c == Cell::blank())));
    }

    #[test]
    fn oversized_requests_are_clamped() {
        let grid = solid(1, 1, Rgba::opaque(255, 255, 255));
        let lines = render_image(&grid, RenderMode::Braille, &Geometry::new(Some(1), Some(3_000_000_000)));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width(), MAX_WIDTH as usize);

        let huge = Geometry::new(Some(u32::MAX), Some(u32::MAX));
        assert_eq!(huge.resolve(10, 10), (MAX_WIDTH, MAX_HEIGHT));
        let lines = render_image(&grid, RenderMode::Block, &huge);
        assert_eq!(lines.len(), MAX_HEIGHT as usize);

        let tall = Geometry::new(None, Some(1)).resolve(1, 1_000_000);
        assert_eq!(tall, (1, MAX_HEIGHT));

        let art = render_ascii("x", &ThemeSpec::default(), Some(u32::MAX));
        assert_eq!(art.len(), MAX_HEIGHT as usize);
    }

    #[test]
    fn geometry_defaults_to_twenty_rows() {
        assert_eq!(Geometry::default().resolve(64, 64), (40, DEFAULT_HEIGHT));
        assert_eq!(Geometry::new(None, Some(40)).resolve(100, 100), (40, 20));
        assert_eq!(Geometry::new(Some(3), Some(7)).resolve(100, 1), (7, 3));
    }

    #[test]
    fn downsample_averages_regions() {
        let grid = PixelGrid::from_fn(2, 1, |x, _| {
            if x == 0 { Rgba::opaque(0, 0, 0) } else { Rgba::opaque(200, 100, 50) }
        })
        .unwrap();
        assert_eq!(downsample(&grid, 1, 1), vec![Rgba::opaque(100, 50, 25)]);
    }

    #[test]
    fn transparent_pixels_do_not_darken_the_average() {
        let grid = PixelGrid::from_fn(2, 1, |x, _| {
            if x == 0 { Rgba::TRANSPARENT } else { Rgba::opaque(200, 0, 0) }
        })
        .unwrap();
        let sample = downsample(&grid, 1, 1)[0];
        assert_eq!((sample.r, sample.g, sample.b), (200, 0, 0));
        assert_eq!(sample.a, 128);
    }

    #[test]
    fn block_mode_leaves_transparent_cells_blank() {
        let grid = solid(4, 4, Rgba::TRANSPARENT);
        let lines = render_image(&grid, RenderMode::Block, &Geometry::new(Some(2), Some(3)));
        assert!(lines.iter().all(|l| l.cells().iter().all(|c| *c == Cell::blank())));
    }

    #[test]
    fn half_block_splits_rows() {
        let grid = PixelGrid::from_fn(1, 2, |_, y| {
            if y == 0 { Rgba::opaque(255, 0, 0) } else { Rgba::opaque(0, 0, 255) }
        })
        .unwrap();
        let lines = render_image(&grid, RenderMode::HalfBlock, &Geometry::new(Some(1), Some(1)));
        let cell = lines[0].cells()[0];
        assert_eq!(cell.ch, UPPER_HALF);
        assert_eq!(cell.fg, Some(Color::Rgb { r: 255, g: 0, b: 0 }));
        assert_eq!(cell.bg, Some(Color::Rgb { r: 0, g: 0, b: 255 }));
    }

    #[test]
    fn braille_lights_brighter_half() {
        // left column white, right column black
        let grid = PixelGrid::from_fn(2, 4, |x, _| {
            if x == 0 { Rgba::opaque(255, 255, 255) } else { Rgba::opaque(0, 0, 0) }
        })
        .unwrap();
        let lines = render_image(&grid, RenderMode::Braille, &Geometry::new(Some(1), Some(1)));
        let cell = lines[0].cells()[0];
        assert_eq!(cell.ch, '\u{2847}');
        assert_eq!(cell.fg, Some(Color::Rgb { r: 255, g: 255, b: 255 }));
    }

    #[test]
    fn braille_uniform_cell_is_fully_lit() {
        let grid = solid(2, 4, Rgba::opaque(10, 20, 30));
        let lines = render_image(&grid, RenderMode::Braille, &Geometry::new(Some(1), Some(1)));
        assert_eq!(lines[0].cells()[0].ch, '\u{28FF}');
    }

    #[test]
    fn ascii_markers_switch_palette_colors() {
        let theme = ThemeSpec::default();
        let lines = render_ascii("$1ab$2c\nd", &theme, Some(4));
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.width() == 3));
        assert_eq!(lines[0].text(), "abc");
        assert_eq!(lines[0].cells()[0].fg, Some(theme.palette_color(1)));
        assert_eq!(lines[0].cells()[2].fg, Some(theme.palette_color(2)));
        assert_eq!(lines[1].cells()[0].fg, Some(theme.accent));
        assert_eq!(lines[3].text(), "   ");
    }

    #[test]
    fn ascii_longer_than_height_is_kept() {
        let lines = render_ascii("a\nb\nc", &ThemeSpec::default(), Some(2));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn ansi_output_resets_after_colour() {
        let mut line = RenderedLine::default();
        line.push_str("hi", Some(Color::Red));
        let mut out = Vec::new();
        line.write_ansi(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hi"));
        assert!(text.ends_with(&ResetColor.to_string()));
    }
}
