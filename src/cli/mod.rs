use crate::catalog::scanner;
use crate::config::Config;
use crate::state::archive;
use crate::state::data::{ColorOption, ProductFolder};
use crate::state::session::{Action, ReviewSession};
use crate::state::store::SelectionStore;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod review;

#[derive(Parser)]
#[command(name = "reference-selector")]
#[command(about = "Pick reference images per product and record the decision", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Catalog root (one folder per product)
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Output root for copied images and selection records
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to the per-user config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_parser = ["error", "warn", "info", "debug", "trace"], default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List products with completion status
    Products,

    /// List the candidate images of a product
    Images {
        /// Product name or 1-based number
        product: String,
    },

    /// Show the saved selection of a product
    Show {
        /// Product name or 1-based number
        product: String,
    },

    /// Select images for a product, save, and report the next product
    Save {
        /// Product name or 1-based number
        product: String,

        /// Reviewer name recorded in selection.json
        #[arg(long)]
        author: String,

        /// Image to select, optionally tagged with a color (FILE or FILE:COLOR)
        #[arg(long = "select", required = true)]
        selections: Vec<String>,
    },

    /// Delete a product's saved selection and copied images
    Delete {
        /// Product name or 1-based number
        product: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Write every saved selection into a zip archive
    Export {
        /// Archive path (defaults to a timestamped name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Review products interactively on the terminal
    Review {
        /// Reviewer name recorded in selection.json
        #[arg(long)]
        author: Option<String>,

        /// 1-based product number to start from
        #[arg(long)]
        start: Option<usize>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.source, cli.output);
    let store = SelectionStore::new(&config.output_root);

    match cli.command {
        Commands::Products => list_products(&config, &store),
        Commands::Images { product } => list_images(&config, &product),
        Commands::Show { product } => show(&config, &store, &product),
        Commands::Save {
            product,
            author,
            selections,
        } => save(&config, &store, &product, author, &selections),
        Commands::Delete { product, yes } => delete(&config, &store, &product, yes),
        Commands::Export { out } => export(&store, out),
        Commands::Review { author, start } => {
            let mut session = ReviewSession::start(&config)?;
            if let Some(author) = author {
                session.update(Action::SetAuthor(author));
            }
            if let Some(start) = start {
                session.update(Action::JumpTo(start.saturating_sub(1)));
            }
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            review::run_review(&mut session, &store, stdin.lock(), stdout.lock())
        }
    }
}

fn list_products(config: &Config, store: &SelectionStore) -> Result<()> {
    let session = ReviewSession::start(config)?;
    let products = session.products();

    let mut completed = 0;
    for (index, product) in products.iter().enumerate() {
        let done = store.is_completed(&product.name);
        if done {
            completed += 1;
        }
        println!(
            "{:>5}. [{}] {} ({} images)",
            index + 1,
            if done { "x" } else { " " },
            product.name,
            product.images.len()
        );
    }
    println!("{} of {} products completed", completed, products.len());
    Ok(())
}

fn list_images(config: &Config, product: &str) -> Result<()> {
    let session = ReviewSession::start(config)?;
    let product = &session.products()[find_product(session.products(), product)?];

    if product.images.is_empty() {
        println!("No images found in this product folder.");
    }
    for (index, image) in product.images.iter().enumerate() {
        println!("{:>4}. {}", index + 1, image.file_name);
    }
    Ok(())
}

fn show(config: &Config, store: &SelectionStore, product: &str) -> Result<()> {
    let name = product_name(config, product)?;
    let record = store.load_record(&name)?;

    println!("Product:     {}", record.product_name);
    println!("Selected by: {}", record.selected_by);
    println!("Date:        {}", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
    for image in &record.images {
        println!("  {} -> {} ({})", image.original_file, image.saved_file, image.color);
    }
    Ok(())
}

fn save(
    config: &Config,
    store: &SelectionStore,
    product: &str,
    author: String,
    selections: &[String],
) -> Result<()> {
    let mut session = ReviewSession::start(config)?;
    let index = find_product(session.products(), product)?;
    session.update(Action::JumpTo(index));
    session.update(Action::SetAuthor(author));

    for arg in selections {
        let (image, color) = parse_selection(arg);
        if !session.toggle_selection(&image, true) {
            bail!("No image named {:?} in this product", image);
        }
        session.update(Action::SetColor { image, color });
    }

    let name = session.products()[index].name.clone();
    if let Ok(previous) = store.load_record(&name) {
        println!(
            "Replacing previous selection by {} from {}",
            previous.selected_by,
            previous.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let record = session.save_and_next(store)?;
    println!("Saved {} image(s) for {}", record.images.len(), name);

    match session.next_incomplete(store) {
        Some(next) => println!(
            "Next incomplete product: {}. {}",
            next + 1,
            session.products()[next].name
        ),
        None => println!("All products completed"),
    }
    Ok(())
}

fn delete(config: &Config, store: &SelectionStore, product: &str, yes: bool) -> Result<()> {
    let name = product_name(config, product)?;

    if !yes {
        match store.load_record(&name) {
            Ok(record) => {
                println!("Product:     {}", name);
                println!("Selected by: {}", record.selected_by);
                println!("Date:        {}", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
                println!("This will permanently delete all selected images and metadata for this product.");
                println!("Re-run with --yes to confirm.");
            }
            Err(err) => println!("{}", err),
        }
        return Ok(());
    }

    store.delete(&name)?;
    println!("Deleted selection for {}", name);
    Ok(())
}

fn export(store: &SelectionStore, out: Option<PathBuf>) -> Result<()> {
    let Some(bytes) = archive::export_archive(store.root())? else {
        println!("No selections saved yet!");
        return Ok(());
    };

    let out = out.unwrap_or_else(|| PathBuf::from(archive::archive_file_name(Local::now().naive_local())));
    std::fs::write(&out, &bytes).with_context(|| format!("writing {}", out.display()))?;

    println!(
        "{} products completed, archive written to {}",
        store.completed_count(),
        out.display()
    );
    Ok(())
}

/// Resolve a product by exact name or 1-based number
fn find_product(products: &[ProductFolder], arg: &str) -> Result<usize> {
    if let Some(index) = products.iter().position(|p| p.name == arg) {
        return Ok(index);
    }
    match arg.parse::<usize>() {
        Ok(number) if (1..=products.len()).contains(&number) => Ok(number - 1),
        Ok(number) => Err(anyhow!(
            "Product number {} out of range (1-{})",
            number,
            products.len()
        )),
        Err(_) => Err(anyhow!("No product named {:?}", arg)),
    }
}

/// Numbers go through the catalog; names are taken as given so saved
/// selections stay reachable after their source folder disappears.
fn product_name(config: &Config, arg: &str) -> Result<String> {
    if arg.parse::<usize>().is_err() {
        return Ok(arg.to_string());
    }
    let products = scanner::list_products(&config.source_root);
    let index = find_product(&products, arg)?;
    Ok(products[index].name.clone())
}

/// `FILE` or `FILE:COLOR`
fn parse_selection(arg: &str) -> (String, ColorOption) {
    // A suffix that is not a color is part of the file name
    match arg.rsplit_once(':') {
        Some((image, color)) => match color.parse::<ColorOption>() {
            Ok(color) => (image.to_string(), color),
            Err(_) => (arg.to_string(), ColorOption::Unknown),
        },
        None => (arg.to_string(), ColorOption::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(names: &[&str]) -> Vec<ProductFolder> {
        names
            .iter()
            .map(|name| ProductFolder {
                name: name.to_string(),
                path: PathBuf::from(name),
                images: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_find_product_by_name_or_number() {
        let list = products(&["Apron", "2024", "Shoe"]);
        assert_eq!(find_product(&list, "Shoe").unwrap(), 2);
        assert_eq!(find_product(&list, "1").unwrap(), 0);
        // Exact names win over numbers
        assert_eq!(find_product(&list, "2024").unwrap(), 1);
        assert!(find_product(&list, "4").is_err());
        assert!(find_product(&list, "0").is_err());
        assert!(find_product(&list, "Hat").is_err());
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("a.png"), ("a.png".to_string(), ColorOption::Unknown));
        assert_eq!(parse_selection("a.png:Red"), ("a.png".to_string(), ColorOption::Red));
        assert_eq!(parse_selection("a.png:"), ("a.png".to_string(), ColorOption::Unknown));
        assert_eq!(parse_selection("a:b.png"), ("a:b.png".to_string(), ColorOption::Unknown));
        assert_eq!(parse_selection("a:b.png:navy"), ("a:b.png".to_string(), ColorOption::Navy));
    }

    #[test]
    fn test_cli_parses_save() {
        let cli = Cli::try_parse_from([
            "reference-selector",
            "--source",
            "/catalog",
            "save",
            "Shoe",
            "--author",
            "Dana",
            "--select",
            "a.png:red",
            "--select",
            "b.png",
        ])
        .unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("/catalog")));
        match cli.command {
            Commands::Save { product, author, selections } => {
                assert_eq!(product, "Shoe");
                assert_eq!(author, "Dana");
                assert_eq!(selections, vec!["a.png:red", "b.png"]);
            }
            _ => panic!("expected save"),
        }
    }
}
