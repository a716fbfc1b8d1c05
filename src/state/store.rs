use crate::error::{DeleteError, RecordError, SaveError};
use crate::state::data::{saved_file_name, SavedImage, SelectedImage, SelectionRecord};
use chrono::Local;
use filetime::FileTime;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Name of the metadata file inside each product's output directory
pub const RECORD_FILE_NAME: &str = "selection.json";

/// The SelectionStore owns the output tree.
///
/// Layout: `<root>/<product>/ref_<n>_<color><ext>` plus `<root>/<product>/selection.json`.
/// A product is completed iff its record file exists; the filesystem is the
/// only shared state between reviewers.
pub struct SelectionStore {
    root: PathBuf,
}

impl SelectionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a product's copies and record
    pub fn product_dir(&self, product_name: &str) -> PathBuf {
        self.root.join(product_name)
    }

    /// Path of a product's selection.json
    pub fn record_path(&self, product_name: &str) -> PathBuf {
        self.product_dir(product_name).join(RECORD_FILE_NAME)
    }

    /// True iff a selection record exists for the product
    pub fn is_completed(&self, product_name: &str) -> bool {
        is_plain_name(product_name) && self.record_path(product_name).is_file()
    }

    /// Count product directories under the root that hold a record
    pub fn completed_count(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(RECORD_FILE_NAME).is_file())
            .count()
    }

    /// Read back the stored record for a product
    pub fn load_record(&self, product_name: &str) -> Result<SelectionRecord, RecordError> {
        if !self.is_completed(product_name) {
            return Err(RecordError::NotFound(product_name.to_string()));
        }
        let json = fs::read_to_string(self.record_path(product_name))?;
        Ok(SelectionRecord::from_json(&json)?)
    }

    /// Copy the selected images into the output tree and publish the record.
    ///
    /// Images are numbered from 1 in the order given. Every source file is
    /// checked before anything is written. The record is written to a temp file
    /// in the product directory and renamed over selection.json, so readers see
    /// either the previous record or the new one. An existing record is replaced
    /// wholesale; copies from an earlier save that are not regenerated stay on disk,
    /// and copies made before a failure are not rolled back.
    pub fn save(
        &self,
        product_name: &str,
        source_folder: &Path,
        selections: &[SelectedImage],
        author: &str,
    ) -> Result<SelectionRecord, SaveError> {
        if !is_plain_name(product_name) {
            return Err(SaveError::InvalidName(product_name.to_string()));
        }
        if let Some(bad) = selections.iter().find(|s| !is_plain_name(&s.original_file)) {
            return Err(SaveError::InvalidName(bad.original_file.clone()));
        }

        let missing: Vec<String> = selections
            .iter()
            .filter(|s| !source_folder.join(&s.original_file).is_file())
            .map(|s| s.original_file.clone())
            .collect();
        if !missing.is_empty() {
            log::warn!("Refusing to save {}: missing {:?}", product_name, missing);
            return Err(SaveError::MissingSource(missing));
        }

        let product_dir = self.product_dir(product_name);
        fs::create_dir_all(&product_dir)
            .map_err(|e| io_failure("create", &product_dir, e))?;

        let mut images = Vec::with_capacity(selections.len());
        for (index, selection) in selections.iter().enumerate() {
            let saved_file = saved_file_name(index + 1, selection.color, &selection.original_file);
            let source = source_folder.join(&selection.original_file);
            let dest = product_dir.join(&saved_file);

            copy_with_times(&source, &dest).map_err(|e| io_failure("copy", &source, e))?;

            images.push(SavedImage {
                original_file: selection.original_file.clone(),
                saved_file,
                color: selection.color,
            });
        }

        let record = SelectionRecord {
            product_name: product_name.to_string(),
            completed: true,
            selected_by: author.to_string(),
            timestamp: Local::now().naive_local(),
            images,
        };

        let record_path = self.record_path(product_name);
        let replacing = record_path.is_file();
        write_record_atomically(&product_dir, &record_path, &record)
            .map_err(|e| io_failure("write", &record_path, e))?;

        if replacing {
            log::info!("Replaced selection for {} ({} images)", product_name, record.images.len());
        } else {
            log::info!("Saved selection for {} ({} images)", product_name, record.images.len());
        }
        Ok(record)
    }

    /// Remove a product's output directory: record and every copied image
    pub fn delete(&self, product_name: &str) -> Result<(), DeleteError> {
        if !is_plain_name(product_name) {
            return Err(DeleteError::InvalidName(product_name.to_string()));
        }

        let product_dir = self.product_dir(product_name);
        if !product_dir.exists() {
            return Err(DeleteError::NotFound(product_name.to_string()));
        }

        fs::remove_dir_all(&product_dir)
            .map_err(|e| DeleteError::IoFailure(format!("{}: {}", product_dir.display(), e)))?;

        log::info!("Deleted selection for {}", product_name);
        Ok(())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("root", &self.root)
            .finish()
    }
}

/// A name usable as a single path component under a root
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn io_failure(action: &str, path: &Path, err: io::Error) -> SaveError {
    SaveError::IoFailure(format!("failed to {} {}: {}", action, path.display(), err))
}

/// Copy bytes and permissions, then carry over access/modification times.
/// Timestamp failures only warn: some filesystems cannot set them.
fn copy_with_times(source: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(source, dest)?;

    let metadata = fs::metadata(source)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(err) = filetime::set_file_times(dest, atime, mtime) {
        log::warn!("Could not preserve timestamps on {}: {}", dest.display(), err);
    }
    Ok(())
}

fn write_record_atomically(
    product_dir: &Path,
    record_path: &Path,
    record: &SelectionRecord,
) -> io::Result<()> {
    let json = record.to_json().map_err(io::Error::other)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".selection.json.")
        .suffix(".tmp")
        .tempfile_in(product_dir)?;
    temp.write_all(json.as_bytes())?;
    // Temp files are created owner-only; records are meant to be shared
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    temp.as_file().sync_all()?;
    temp.persist(record_path).map_err(|e| e.error)?;
    Ok(())
}
