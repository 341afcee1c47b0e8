use std::fs;
use std::path::Path;

use include_dir::{Dir, include_dir};
use tracing::{debug, warn};

static LOGOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/logos");

/// Template used when a requested one cannot be found.
pub const FALLBACK_TEMPLATE: &str = "windows";

/// Picks the embedded template matching the running OS.
pub const AUTO_TEMPLATE: &str = "auto";

/// Names of the embedded templates, sorted.
pub fn builtin_names() -> Vec<String> {
    let mut names: Vec<String> = LOGOS_DIR
        .files()
        .filter_map(|file| file.path().file_stem()?.to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

fn embedded(name: &str) -> Option<&'static str> {
    LOGOS_DIR
        .get_file(format!("{}.txt", name))
        .and_then(|file| file.contents_utf8())
}

/// Template name for the running OS, derived the same way as the distro id.
pub fn auto_template_name() -> &'static str {
    let os = os_info::get();
    match os.os_type() {
        os_info::Type::Windows => {
            // Windows 11 still reports 10.0, builds from 22000 on are 11
            let build = os
                .version()
                .to_string()
                .rsplit('.')
                .next()
                .and_then(|b| b.parse::<u32>().ok())
                .unwrap_or(0);
            if build >= 22000 { "windows_11" } else { "windows" }
        }
        os_info::Type::Macos => "macos",
        _ if cfg!(unix) => "linux",
        _ => FALLBACK_TEMPLATE,
    }
}

/// Loads a template by embedded name or file path. Unknown names and
/// unreadable files fall back to the embedded default.
pub fn load_template(name: &str) -> String {
    let name = if name.eq_ignore_ascii_case(AUTO_TEMPLATE) {
        auto_template_name()
    } else {
        name
    };

    if let Some(text) = embedded(name) {
        return text.to_string();
    }

    let path = Path::new(name);
    if path.is_file() {
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "loaded ascii template");
                return text;
            }
            Err(e) => warn!(path = %path.display(), "cannot read ascii template: {}", e),
        }
    } else {
        warn!(template = name, "unknown ascii template, using {}", FALLBACK_TEMPLATE);
    }
    embedded(FALLBACK_TEMPLATE).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_are_listed() {
        let names = builtin_names();
        for expected in ["linux", "macos", "windows", "windows_11"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn unknown_template_falls_back() {
        assert_eq!(load_template("definitely-not-here"), load_template(FALLBACK_TEMPLATE));
        assert!(!load_template(FALLBACK_TEMPLATE).is_empty());
    }

    #[test]
    fn auto_resolves_to_an_embedded_template() {
        assert!(embedded(auto_template_name()).is_some());
    }

    #[test]
    fn templates_load_from_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mine.txt");
        fs::write(&path, "hello\nworld\n").unwrap();
        assert_eq!(load_template(path.to_str().unwrap()), "hello\nworld\n");
    }
}
