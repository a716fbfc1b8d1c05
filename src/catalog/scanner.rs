use crate::state::data::{ImageRef, ProductFolder, SUPPORTED_EXTENSIONS};
use std::cmp::Ordering;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// List every product folder directly under `source_root`, images included.
///
/// Ordering is case-insensitive by name and identical across runs on the same
/// tree, which is what lets independent reviewers walk the catalog in lockstep.
/// A missing root yields an empty list; the caller decides how to report it.
pub fn list_products(source_root: &Path) -> Vec<ProductFolder> {
    if !source_root.is_dir() {
        log::warn!("Source folder not found: {}", source_root.display());
        return Vec::new();
    }

    let mut products: Vec<ProductFolder> = direct_children(source_root)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let name = utf8_name(&entry)?;
            let images = list_images(entry.path());
            Some(ProductFolder {
                name,
                path: entry.into_path(),
                images,
            })
        })
        .collect();

    products.sort_by(|a, b| name_order(&a.name, &b.name));
    log::debug!("Found {} product folders in {}", products.len(), source_root.display());
    products
}

/// List the supported image files directly inside one product folder.
///
/// Subdirectories and files with other extensions are skipped.
pub fn list_images(product_dir: &Path) -> Vec<ImageRef> {
    if !product_dir.is_dir() {
        return Vec::new();
    }

    let mut images: Vec<ImageRef> = direct_children(product_dir)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_supported_image(entry.path()))
        .filter_map(|entry| {
            let file_name = utf8_name(&entry)?;
            Some(ImageRef {
                file_name,
                path: entry.into_path(),
            })
        })
        .collect();

    images.sort_by(|a, b| name_order(&a.file_name, &b.file_name));
    images
}

/// Check a path's extension against the supported set (case-insensitive)
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Case-insensitive comparison; raw names break ties so the order is total
pub fn name_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn direct_children(dir: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
}

fn utf8_name(entry: &DirEntry) -> Option<String> {
    match entry.file_name().to_str() {
        Some(name) => Some(name.to_string()),
        None => {
            log::warn!("Skipping non UTF-8 name: {}", entry.path().display());
            None
        }
    }
}
