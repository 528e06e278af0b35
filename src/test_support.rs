//! Helpers shared by tests that need a real TrueType font. Tests probing
//! the filesystem skip themselves when no usable font is installed.

use std::path::{Path, PathBuf};

const CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

pub(crate) fn find_system_font() -> Option<PathBuf> {
    for candidate in CANDIDATES {
        let path = PathBuf::from(candidate);
        if path.exists() && crate::font::Font::load(&path).is_ok() {
            return Some(path);
        }
    }
    scan_dir(Path::new("/usr/share/fonts"), 0)
}

fn scan_dir(dir: &Path, depth: usize) -> Option<PathBuf> {
    if depth > 3 {
        return None;
    }
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = scan_dir(&path, depth + 1) {
                return Some(found);
            }
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"))
            && crate::font::Font::load(&path).is_ok()
        {
            return Some(path);
        }
    }
    None
}
