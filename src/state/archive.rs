use crate::error::ArchiveError;
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Download name for an export generated at `now`
pub fn archive_file_name(now: NaiveDateTime) -> String {
    format!("selected_reference_images_{}.zip", now.format("%Y%m%d_%H%M%S"))
}

/// Zip every file of every product directory under `output_root`.
///
/// Entries are named `<product>/<file>` and written directory by directory,
/// each directory's files right after it, both in name order. Returns
/// `Ok(None)` when the output root is missing or empty. Loose files at the
/// root and in-flight record temp files are not exported.
pub fn export_archive(output_root: &Path) -> Result<Option<Vec<u8>>, ArchiveError> {
    if !output_root.is_dir() || output_root.read_dir()?.next().is_none() {
        return Ok(None);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut file_count = 0usize;

    for entry in WalkDir::new(output_root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if is_temp_record(&file_name) {
            continue;
        }
        let product_name = match entry.path().parent().and_then(Path::file_name) {
            Some(name) => name.to_string_lossy(),
            None => continue,
        };

        zip.start_file(format!("{}/{}", product_name, file_name), options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        file_count += 1;
    }

    let bytes = zip.finish()?.into_inner();
    log::info!("Built archive with {} files ({} bytes)", file_count, bytes.len());
    Ok(Some(bytes))
}

fn is_temp_record(file_name: &str) -> bool {
    file_name.starts_with(".selection.json.") && file_name.ends_with(".tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect::<Vec<_>>()
    }

    #[test]
    fn test_file_name_has_timestamp() {
        let now = NaiveDateTime::parse_from_str("2025-03-04 05:06:07", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(archive_file_name(now), "selected_reference_images_20250304_050607.zip");
    }

    #[test]
    fn test_missing_or_empty_root_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(export_archive(&temp.path().join("missing")).unwrap().is_none());
        assert!(export_archive(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_exports_product_files_in_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        // Created out of name order on purpose
        fs::create_dir(root.join("shirt")).unwrap();
        fs::create_dir(root.join("Hat")).unwrap();
        fs::write(root.join("shirt").join("selection.json"), b"{}").unwrap();
        fs::write(root.join("shirt").join("ref_2_blue.png"), b"blue").unwrap();
        fs::write(root.join("shirt").join("ref_1_red.png"), b"png-bytes").unwrap();
        fs::write(root.join("Hat").join("selection.json"), b"{}").unwrap();
        fs::write(root.join("Hat").join("ref_1_blue.jpg"), b"jpg").unwrap();
        fs::write(root.join("Hat").join(".selection.json.x1.tmp"), b"{").unwrap();
        fs::write(root.join("README.txt"), b"loose").unwrap();

        let bytes = export_archive(root).unwrap().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        let mut contents = String::new();
        archive
            .by_name("shirt/ref_1_red.png")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "png-bytes");

        assert_eq!(
            entry_names(bytes),
            vec![
                "Hat/ref_1_blue.jpg",
                "Hat/selection.json",
                "shirt/ref_1_red.png",
                "shirt/ref_2_blue.png",
                "shirt/selection.json",
            ]
        );
    }
}
