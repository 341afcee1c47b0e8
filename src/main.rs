use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use winfetch::app::{self, RunOptions};
use winfetch::ascii;
use winfetch::cache::FactsCache;
use winfetch::config::Config;
use winfetch::picture;
use winfetch::platform::NativeProbe;
use winfetch::theme::{COLOR_NAMES, ThemeTable};
use winfetch::ui;

/// Share of the terminal width an image may take when no width is given.
const IMAGE_WIDTH_SHARE: f32 = 0.4;

#[derive(Parser, Debug)]
#[command(name = "winfetch", version, about = "System information splash for the terminal")]
struct Args {
    /// Path to a config.json
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show an image (name in the images folder or a path)
    #[arg(long, conflicts_with = "ascii")]
    image: Option<String>,

    /// Show an ASCII template (embedded name or a path)
    #[arg(long)]
    ascii: Option<String>,

    /// Colour theme, basic colour name or #RRGGBB
    #[arg(long)]
    theme: Option<String>,

    /// Image height in terminal rows
    #[arg(long)]
    height: Option<u32>,

    /// Image width in terminal columns
    #[arg(long)]
    width: Option<u32>,

    /// Image rendering: block, halfblock or braille
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// Ignore cached facts and query the system again
    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    list_themes: bool,

    #[arg(long)]
    list_ascii: bool,

    #[arg(long)]
    list_images: bool,

    /// Log debug output to stderr
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(image) = &self.image {
            config.image = Some(image.clone());
            config.display_type = Some("image".to_string());
        }
        if let Some(ascii) = &self.ascii {
            config.ascii_art = Some(ascii.clone());
            config.display_type = Some("ascii".to_string());
        }
        if let Some(theme) = &self.theme {
            config.theme = Some(theme.clone());
        }
        if self.height.is_some() {
            config.image_height = self.height;
        }
        if self.width.is_some() {
            config.image_width = self.width;
        }
        if let Some(mode) = &self.mode {
            config.render_mode = Some(mode.clone());
        }
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn image_width_cap() -> u32 {
    let columns = crossterm::terminal::size().map(|(cols, _)| cols).unwrap_or(80);
    ((columns as f32 * IMAGE_WIDTH_SHARE) as u32).max(1)
}

fn list_themes(themes: &ThemeTable) {
    println!("Available color themes:");
    for name in themes.names() {
        println!("  - {}", name);
    }
    println!("\nAny basic color also works:");
    for (name, _) in COLOR_NAMES {
        println!("  - {}", name);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let themes = ThemeTable::builtin().context("loading built-in themes")?;
    let images_dir = picture::default_images_dir();

    if args.list_themes {
        list_themes(&themes);
        return Ok(());
    }
    if args.list_ascii {
        println!("Available ASCII templates:");
        for name in ascii::builtin_names() {
            println!("  - {}", name);
        }
        return Ok(());
    }
    if args.list_images {
        println!("Images in {}:", images_dir.display());
        println!("  - {} (built in)", picture::BUILTIN_LOGO);
        for name in picture::list_images(&images_dir) {
            println!("  - {}", name);
        }
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);

    let mut layout = config.layout();
    layout.geometry = layout.geometry.with_max_width(image_width_cap());
    let theme = themes.resolve(&layout.theme);
    debug!(?layout, "resolved layout");

    let options = RunOptions {
        no_cache: args.no_cache,
        cache_path: FactsCache::default_path(),
        cache_max_age: config.cache_max_age(),
        fact_timeout: config.fact_timeout(),
        images_dir,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let result = runtime.block_on(app::run(NativeProbe::default(), &layout, &theme, &options));
    // a query stuck past its deadline must not hold up exit
    runtime.shutdown_background();

    let lines = result?;
    ui::display_output(&lines, &mut io::stdout().lock()).context("writing output")?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("winfetch: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
