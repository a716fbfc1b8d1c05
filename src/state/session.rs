use crate::catalog::scanner;
use crate::config::Config;
use crate::error::{ConfigError, SaveError};
use crate::state::data::{ColorOption, ProductFolder, SelectedImage, SelectionEntry, SelectionRecord};
use crate::state::store::SelectionStore;
use indexmap::IndexMap;

/// Review session inputs (events)
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move back one product, discarding unsaved edits
    Previous,
    /// Move forward one product, discarding unsaved edits
    Next,
    /// Jump to a 0-based product index (clamped)
    JumpTo(usize),
    Toggle { image: String, selected: bool },
    SetColor { image: String, color: ColorOption },
    SetAuthor(String),
}

/// Working selections for the product currently on screen.
///
/// Entries keep the order in which images were registered, which is the
/// scanner's listing order, never the order the reviewer clicked in.
#[derive(Debug, Default)]
pub struct ActiveSelections {
    entries: IndexMap<String, SelectionEntry>,
    last_loaded: Option<String>,
}

impl ActiveSelections {
    /// Reset to one blank entry per image unless `product` is already loaded.
    /// Returns true when a reset happened.
    pub fn load_if_needed(&mut self, product: &ProductFolder) -> bool {
        if self.last_loaded.as_deref() == Some(product.name.as_str()) {
            return false;
        }
        self.entries = product
            .images
            .iter()
            .map(|image| (image.file_name.clone(), SelectionEntry::default()))
            .collect();
        self.last_loaded = Some(product.name.clone());
        true
    }

    /// Forget which product is loaded so the next load starts from scratch
    pub fn invalidate(&mut self) {
        self.last_loaded = None;
    }

    pub fn get(&self, image: &str) -> Option<&SelectionEntry> {
        self.entries.get(image)
    }

    pub fn toggle(&mut self, image: &str, selected: bool) -> bool {
        match self.entries.get_mut(image) {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Stored even for unselected images; front ends only offer it once selected
    pub fn set_color(&mut self, image: &str, color: ColorOption) -> bool {
        match self.entries.get_mut(image) {
            Some(entry) => {
                entry.color = color;
                true
            }
            None => false,
        }
    }

    pub fn selected_count(&self) -> usize {
        self.entries.values().filter(|e| e.selected).count()
    }

    pub fn collect_selected(&self) -> Vec<SelectedImage> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.selected)
            .map(|(name, entry)| SelectedImage::new(name.clone(), entry.color))
            .collect()
    }
}

/// One reviewer's pass over the catalog.
///
/// Owned by whoever drives the workflow; there is no shared instance and no
/// internal locking. Navigation never saves: leaving a product drops its
/// in-progress selections.
#[derive(Debug)]
pub struct ReviewSession {
    products: Vec<ProductFolder>,
    current_index: usize,
    author: String,
    active: ActiveSelections,
}

impl ReviewSession {
    pub fn new(products: Vec<ProductFolder>) -> Self {
        let mut session = Self {
            products,
            current_index: 0,
            author: String::new(),
            active: ActiveSelections::default(),
        };
        session.load_current();
        session
    }

    /// Scan the configured source tree and start at the first product
    pub fn start(config: &Config) -> Result<Self, ConfigError> {
        config.require_source()?;
        let products = scanner::list_products(&config.source_root);
        if products.is_empty() {
            return Err(ConfigError::NoProducts(config.source_root.clone()));
        }
        log::info!("Review session started with {} products", products.len());
        Ok(Self::new(products))
    }

    pub fn products(&self) -> &[ProductFolder] {
        &self.products
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&ProductFolder> {
        self.products.get(self.current_index)
    }

    /// (1-based position, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.current_index + 1, self.products.len())
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    /// Make sure the current product's selections are loaded
    pub fn load_current(&mut self) -> Option<&ProductFolder> {
        let product = self.products.get(self.current_index)?;
        if self.active.load_if_needed(product) {
            log::debug!("Loaded selections for {}", product.name);
        }
        Some(product)
    }

    pub fn selection(&self, image: &str) -> Option<SelectionEntry> {
        self.active.get(image).copied()
    }

    pub fn selected_count(&self) -> usize {
        self.active.selected_count()
    }

    /// Returns false for an image the current product does not have
    pub fn toggle_selection(&mut self, image: &str, selected: bool) -> bool {
        self.load_current();
        self.active.toggle(image, selected)
    }

    pub fn set_color(&mut self, image: &str, color: ColorOption) -> bool {
        self.load_current();
        self.active.set_color(image, color)
    }

    pub fn go_previous(&mut self) {
        self.move_to(self.current_index.saturating_sub(1));
    }

    pub fn go_next(&mut self) {
        self.move_to(self.current_index.saturating_add(1));
    }

    /// Out-of-range indices clamp to the last product
    pub fn jump_to(&mut self, index: usize) {
        self.move_to(index);
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index.min(self.products.len().saturating_sub(1));
        self.active.invalidate();
        self.load_current();
    }

    /// Selected images in listing order, as handed to the store
    pub fn collect_selected_for_save(&self) -> Vec<SelectedImage> {
        self.active.collect_selected()
    }

    pub fn can_save(&self) -> bool {
        self.save_hint().is_none()
    }

    /// Why saving is unavailable, if it is
    pub fn save_hint(&self) -> Option<&'static str> {
        if self.author.trim().is_empty() {
            Some("enter your name to enable saving")
        } else if self.active.selected_count() == 0 {
            Some("select at least one image to save")
        } else {
            None
        }
    }

    /// Save the current product and advance; stays put when the save fails
    pub fn save_and_next(&mut self, store: &SelectionStore) -> Result<SelectionRecord, SaveError> {
        if let Some(reason) = self.save_hint() {
            return Err(SaveError::NotReady(reason));
        }
        let product = self
            .products
            .get(self.current_index)
            .ok_or(SaveError::NotReady("no product to save"))?;

        let selections = self.collect_selected_for_save();
        let record = store.save(&product.name, &product.path, &selections, self.author.trim())?;

        self.go_next();
        Ok(record)
    }

    /// Next product after the current one (wrapping) that has no record yet
    pub fn next_incomplete(&self, store: &SelectionStore) -> Option<usize> {
        let count = self.products.len();
        (1..=count)
            .map(|offset| (self.current_index + offset) % count)
            .find(|&index| !store.is_completed(&self.products[index].name))
    }

    /// Apply one action
    pub fn update(&mut self, action: Action) {
        match action {
            Action::Previous => self.go_previous(),
            Action::Next => self.go_next(),
            Action::JumpTo(index) => self.jump_to(index),
            Action::Toggle { image, selected } => {
                if !self.toggle_selection(&image, selected) {
                    log::debug!("Ignoring toggle for unknown image {}", image);
                }
            }
            Action::SetColor { image, color } => {
                if !self.set_color(&image, color) {
                    log::debug!("Ignoring color for unknown image {}", image);
                }
            }
            Action::SetAuthor(author) => self.set_author(author),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::ImageRef;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn product(name: &str, images: &[&str]) -> ProductFolder {
        let path = PathBuf::from("/catalog").join(name);
        ProductFolder {
            name: name.to_string(),
            images: images
                .iter()
                .map(|file| ImageRef {
                    file_name: file.to_string(),
                    path: path.join(file),
                })
                .collect(),
            path,
        }
    }

    fn three_products() -> ReviewSession {
        ReviewSession::new(vec![
            product("Apron", &["a.png", "b.png"]),
            product("Hat", &["front.jpg"]),
            product("Shoe", &["x.gif", "y.gif"]),
        ])
    }

    #[test]
    fn test_starts_on_first_product_with_blank_selections() {
        let session = three_products();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.progress(), (1, 3));
        assert_eq!(session.selection("a.png"), Some(SelectionEntry::default()));
        assert_eq!(session.selection("front.jpg"), None);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut session = three_products();
        session.go_previous();
        assert_eq!(session.current_index(), 0);

        session.jump_to(5);
        assert_eq!(session.current_index(), 2);

        session.go_next();
        assert_eq!(session.current_index(), 2);

        session.update(Action::Previous);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.current().unwrap().name, "Hat");
    }

    #[test]
    fn test_load_if_needed_is_idempotent() {
        let apron = product("Apron", &["a.png", "b.png"]);
        let mut active = ActiveSelections::default();

        assert!(active.load_if_needed(&apron));
        active.toggle("a.png", true);
        assert!(!active.load_if_needed(&apron));
        assert!(active.get("a.png").unwrap().selected);

        active.invalidate();
        assert!(active.load_if_needed(&apron));
        assert!(!active.get("a.png").unwrap().selected);
    }

    #[test]
    fn test_leaving_a_product_discards_edits() {
        let mut session = three_products();
        session.toggle_selection("a.png", true);
        session.set_color("a.png", ColorOption::Red);

        session.go_next();
        session.go_previous();
        assert_eq!(session.selection("a.png"), Some(SelectionEntry::default()));

        // Jumping to the same product also starts over
        session.toggle_selection("b.png", true);
        session.jump_to(0);
        assert_eq!(session.selected_count(), 0);
    }

    #[test]
    fn test_collect_uses_listing_order_not_click_order() {
        let mut session = ReviewSession::new(vec![product("Shoe", &["a.png", "b.png"])]);
        session.update(Action::Toggle { image: "b.png".into(), selected: true });
        session.update(Action::SetColor { image: "b.png".into(), color: ColorOption::Blue });
        session.update(Action::Toggle { image: "a.png".into(), selected: true });
        session.update(Action::SetColor { image: "a.png".into(), color: ColorOption::Red });

        assert_eq!(
            session.collect_selected_for_save(),
            vec![
                SelectedImage::new("a.png", ColorOption::Red),
                SelectedImage::new("b.png", ColorOption::Blue),
            ]
        );
    }

    #[test]
    fn test_color_is_kept_for_unselected_but_not_collected() {
        let mut session = three_products();
        assert!(session.set_color("b.png", ColorOption::Gold));
        assert_eq!(session.selection("b.png").unwrap().color, ColorOption::Gold);
        assert!(session.collect_selected_for_save().is_empty());
        assert!(!session.toggle_selection("missing.png", true));
    }

    #[test]
    fn test_save_gate() {
        let mut session = three_products();
        assert!(!session.can_save());
        assert_eq!(session.save_hint(), Some("enter your name to enable saving"));

        session.update(Action::SetAuthor("Dana".into()));
        assert_eq!(session.save_hint(), Some("select at least one image to save"));

        session.toggle_selection("a.png", true);
        assert!(session.can_save());

        session.set_author("   ");
        assert!(!session.can_save());
    }

    fn catalog_on_disk(temp: &TempDir) -> Vec<ProductFolder> {
        let root = temp.path().join("source");
        for (name, files) in [("Apron", ["b.png", "a.png"]), ("Hat", ["1.jpg", "2.jpg"])] {
            let dir = root.join(name);
            fs::create_dir_all(&dir).unwrap();
            for file in files {
                fs::write(dir.join(file), file.as_bytes()).unwrap();
            }
        }
        scanner::list_products(&root)
    }

    #[test]
    fn test_save_and_next_numbers_by_listing_order() {
        let temp = TempDir::new().unwrap();
        let store = SelectionStore::new(temp.path().join("out"));
        let mut session = ReviewSession::new(catalog_on_disk(&temp));

        session.set_author("Dana");
        session.toggle_selection("b.png", true);
        session.set_color("b.png", ColorOption::Green);
        session.toggle_selection("a.png", true);

        let record = session.save_and_next(&store).unwrap();
        assert_eq!(record.images[0].original_file, "a.png");
        assert_eq!(record.images[0].saved_file, "ref_1_unknown.png");
        assert_eq!(record.images[1].original_file, "b.png");
        assert_eq!(record.images[1].saved_file, "ref_2_green.png");

        assert!(store.is_completed("Apron"));
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.selected_count(), 0);
        assert_eq!(session.author(), "Dana");
    }

    #[test]
    fn test_failed_save_does_not_advance() {
        let temp = TempDir::new().unwrap();
        let store = SelectionStore::new(temp.path().join("out"));
        let mut session = ReviewSession::new(catalog_on_disk(&temp));

        assert_eq!(
            session.save_and_next(&store),
            Err(SaveError::NotReady("enter your name to enable saving"))
        );

        session.set_author("Dana");
        session.toggle_selection("a.png", true);
        fs::remove_file(temp.path().join("source/Apron/a.png")).unwrap();

        assert!(matches!(session.save_and_next(&store), Err(SaveError::MissingSource(_))));
        assert_eq!(session.current_index(), 0);
        assert!(session.selection("a.png").unwrap().selected);
    }

    #[test]
    fn test_next_incomplete_wraps_and_skips_completed() {
        let temp = TempDir::new().unwrap();
        let store = SelectionStore::new(temp.path().join("out"));
        let mut session = ReviewSession::new(catalog_on_disk(&temp));

        assert_eq!(session.next_incomplete(&store), Some(1));

        session.jump_to(1);
        session.set_author("Dana");
        session.toggle_selection("1.jpg", true);
        session.save_and_next(&store).unwrap();
        // Last product: go_next clamps in place
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.next_incomplete(&store), Some(0));

        session.jump_to(0);
        session.toggle_selection("a.png", true);
        session.save_and_next(&store).unwrap();
        assert_eq!(session.next_incomplete(&store), None);
    }

    #[test]
    fn test_start_reports_configuration_problems() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            source_root: temp.path().join("missing"),
            output_root: temp.path().join("out"),
        };
        assert!(matches!(
            ReviewSession::start(&config),
            Err(ConfigError::SourceMissing(_))
        ));

        fs::create_dir(&config.source_root).unwrap();
        assert!(matches!(
            ReviewSession::start(&config),
            Err(ConfigError::NoProducts(_))
        ));

        fs::create_dir(config.source_root.join("Shoe")).unwrap();
        let session = ReviewSession::start(&config).unwrap();
        assert_eq!(session.products().len(), 1);
    }
}
