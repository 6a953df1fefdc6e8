//! Page discovery on disk.
//!
//! # Responsibilities
//! - Walk the pages directory and collect page sources
//! - Decide each entry's prerender flag from the output mode
//! - Mark routes listed under `fragments` as fragments
//!
//! # Design Decisions
//! - Entries are returned sorted by relative path; that order is the
//!   declaration order used for tie-breaking
//! - Files and directories starting with `_` are private and skipped

use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::config::{PagesConfig, SiteConfig};
use crate::routing::route::{route_from_file, RouteEntry, RouteType};

/// Collect every page source below `config.dir`.
pub fn scan_pages(config: &PagesConfig, site: &SiteConfig) -> io::Result<Vec<RouteEntry>> {
    let mut files = walk(&config.dir, &config.extensions)?;
    files.sort();

    let entries = files
        .into_iter()
        .map(|file| {
            let prerender = !site.server_like() || config.prerender.contains(&route_from_file(&file));
            let route_type = if config.fragments.contains(&route_from_file(&file)) {
                RouteType::Fragment
            } else {
                RouteType::Page
            };
            RouteEntry::new(file, prerender).with_route_type(route_type)
        })
        .collect::<Vec<_>>();

    tracing::debug!(dir = %config.dir.display(), pages = entries.len(), "Scanned pages");
    Ok(entries)
}

/// True when `path` looks like a page source under the configured extensions.
pub fn is_page_file(path: &Path, extensions: &[String]) -> bool {
    let private = path
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('_'));
    let extension_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|allowed| allowed == e));
    extension_matches && !private
}

/// Page files below `root`, relative to it. Private entries are pruned
/// before descending.
fn walk(root: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("pages directory {} not found", root.display()),
        ));
    }

    let walker = WalkDir::new(root).process_read_dir(|_depth, _path, _state, children| {
        children.retain(|child| {
            child
                .as_ref()
                .map(|entry| !entry.file_name().to_string_lossy().starts_with('_'))
                .unwrap_or(true)
        });
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if is_page_file(relative, extensions) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use std::fs;

    fn touch(dir: &Path, file: &str) {
        let path = dir.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<h1>page</h1>").unwrap();
    }

    #[test]
    fn test_scan_pages() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "blog/[id].html");
        touch(dir.path(), "_partials/nav.html");
        touch(dir.path(), "notes.txt");

        let config = PagesConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let entries = scan_pages(&config, &SiteConfig::default()).unwrap();

        let files: Vec<PathBuf> = entries.iter().map(|e| e.file.clone()).collect();
        assert_eq!(files, vec![PathBuf::from("blog/[id].html"), PathBuf::from("index.html")]);
        assert!(entries.iter().all(|e| e.prerender));
    }

    #[test]
    fn test_server_output_prerender_list() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "about.html");
        touch(dir.path(), "cart.html");

        let config = PagesConfig {
            dir: dir.path().to_path_buf(),
            prerender: vec!["/about".into()],
            ..Default::default()
        };
        let site = SiteConfig {
            output: OutputMode::Server,
            ..Default::default()
        };
        let entries = scan_pages(&config, &site).unwrap();

        assert!(entries[0].prerender);
        assert!(!entries[1].prerender);
    }

    #[test]
    fn test_fragments_and_private_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "cards/item.html");
        touch(dir.path(), "_drafts/deep/post.html");

        let config = PagesConfig {
            dir: dir.path().to_path_buf(),
            fragments: vec!["/cards/item".into()],
            ..Default::default()
        };
        let entries = scan_pages(&config, &SiteConfig::default()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file, PathBuf::from("cards/item.html"));
        assert_eq!(entries[0].route_type, RouteType::Fragment);
        assert_eq!(entries[1].route_type, RouteType::Page);
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PagesConfig {
            dir: dir.path().join("nope"),
            ..Default::default()
        };
        let err = scan_pages(&config, &SiteConfig::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_is_page_file() {
        let extensions = vec!["html".to_string()];
        assert!(is_page_file(Path::new("blog/post.html"), &extensions));
        assert!(!is_page_file(Path::new("_draft.html"), &extensions));
        assert!(!is_page_file(Path::new("style.css"), &extensions));
    }
}
