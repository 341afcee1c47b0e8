//! One invocation: visual and facts in parallel, then composition.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::ascii;
use crate::cache::FactsCache;
use crate::config::{DisplayLayout, DisplayType};
use crate::error::{Error, Result};
use crate::picture::{self, BUILTIN_LOGO, PixelGrid};
use crate::platform::SystemProbe;
use crate::render::{self, RenderedLine};
use crate::system::{FactKey, FactsCollector, SystemFacts};
use crate::theme::ThemeSpec;
use crate::ui;

const BUILTIN_LOGO_SIZE: u32 = 128;

/// Everything a run needs besides the layout.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub no_cache: bool,
    pub cache_path: PathBuf,
    pub cache_max_age: Duration,
    pub fact_timeout: Duration,
    pub images_dir: PathBuf,
}

/// Read-through cache in front of the collector. With `no_cache` the cache
/// is not read but is still refreshed. A snapshot whose GPU is unknown is
/// collected again rather than served. Cache failures only cost the cache.
pub async fn fetch_facts<P: SystemProbe + 'static>(
    collector: &FactsCollector<P>,
    cache: &FactsCache,
    max_age: Duration,
    no_cache: bool,
) -> SystemFacts {
    if !no_cache {
        match cache.read(max_age) {
            Some(facts) if !facts.get(FactKey::Gpu).is_known() => {
                debug!("cached gpu is unknown, collecting again");
            }
            Some(facts) => {
                debug!(captured_at = %facts.captured_at(), "using cached facts");
                return facts;
            }
            None => {}
        }
    }
    let facts = collector.collect().await;
    if let Err(e) = cache.write(&facts) {
        warn!("{}", e);
    }
    facts
}

fn load_picture(name: Option<&str>, images_dir: &Path) -> Result<PixelGrid> {
    let name = name.unwrap_or(BUILTIN_LOGO);
    if name.eq_ignore_ascii_case(BUILTIN_LOGO) {
        return Ok(PixelGrid::windows_logo(BUILTIN_LOGO_SIZE));
    }
    let path = picture::resolve_image(name, images_dir).ok_or_else(|| Error::NotFound {
        path: PathBuf::from(name),
    })?;
    picture::decode(&path)
}

/// The left-hand column for `layout`.
pub fn render_visual(layout: &DisplayLayout, theme: &ThemeSpec, images_dir: &Path) -> Result<Vec<RenderedLine>> {
    match layout.display_type {
        DisplayType::Ascii => {
            let template = ascii::load_template(&layout.ascii_art);
            Ok(render::render_ascii(&template, theme, layout.geometry.height))
        }
        DisplayType::Image => {
            let grid = load_picture(layout.image.as_deref(), images_dir)?;
            Ok(render::render_image(&grid, layout.render_mode, &layout.geometry))
        }
    }
}

/// Decodes and renders on a blocking task while facts are collected, then
/// composes both with the time taken. Only an image that cannot be loaded
/// fails the run.
pub async fn run<P: SystemProbe + 'static>(
    probe: P,
    layout: &DisplayLayout,
    theme: &ThemeSpec,
    options: &RunOptions,
) -> Result<Vec<RenderedLine>> {
    let started = Instant::now();
    let cache = FactsCache::new(&options.cache_path);
    let collector = FactsCollector::new(probe).with_timeout(options.fact_timeout);

    let visual_task = {
        let layout = layout.clone();
        let theme = theme.clone();
        let images_dir = options.images_dir.clone();
        tokio::task::spawn_blocking(move || render_visual(&layout, &theme, &images_dir))
    };

    let (visual, facts) = tokio::join!(
        visual_task,
        fetch_facts(&collector, &cache, options.cache_max_age, options.no_cache)
    );
    let visual = visual.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))??;

    Ok(ui::compose(&visual, &facts, layout, theme, Some(started.elapsed())))
}
