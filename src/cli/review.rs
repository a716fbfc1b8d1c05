/// Line-oriented review loop
///
/// Reads one command per line, applies it to the session, and redraws the
/// current product. Navigation discards unsaved selections exactly like the
/// session does; nothing is saved except through `s`.
use crate::state::data::ColorOption;
use crate::state::session::{Action, ReviewSession};
use crate::state::store::SelectionStore;
use anyhow::Result;
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  n            next product (unsaved selections are dropped)
  p            previous product (unsaved selections are dropped)
  j N          jump to product N
  t IMG        toggle image (number or file name)
  c IMG COLOR  set the color of a selected image
  a NAME       set your name
  s            save and go to the next product
  l            show the current product again
  h            this help
  q            quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Apply(Action),
    Save,
    List,
    Help,
    Quit,
}

/// Parse one input line against the session's current product
pub fn parse_command(line: &str, session: &ReviewSession) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "" | "l" => Ok(Command::List),
        "h" | "?" => Ok(Command::Help),
        "q" => Ok(Command::Quit),
        "s" => Ok(Command::Save),
        "n" => Ok(Command::Apply(Action::Next)),
        "p" => Ok(Command::Apply(Action::Previous)),
        "j" => match rest.parse::<usize>() {
            Ok(number) if number >= 1 => Ok(Command::Apply(Action::JumpTo(number - 1))),
            _ => Err(format!("expected a product number, got {:?}", rest)),
        },
        "a" => Ok(Command::Apply(Action::SetAuthor(rest.to_string()))),
        "t" => {
            let image = resolve_image(rest, session)?;
            let selected = session.selection(&image).is_some_and(|entry| entry.selected);
            Ok(Command::Apply(Action::Toggle {
                image,
                selected: !selected,
            }))
        }
        "c" => {
            let (image_arg, color_arg) = rest
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| "usage: c IMG COLOR".to_string())?;
            let image = resolve_image(image_arg.trim(), session)?;
            if !session.selection(&image).is_some_and(|entry| entry.selected) {
                return Err(format!("select {} before choosing a color", image));
            }
            let color = color_arg.parse::<ColorOption>().map_err(|e| e.to_string())?;
            Ok(Command::Apply(Action::SetColor { image, color }))
        }
        other => Err(format!("unknown command {:?} (h for help)", other)),
    }
}

/// Image by 1-based number or exact file name
fn resolve_image(arg: &str, session: &ReviewSession) -> Result<String, String> {
    let product = session.current().ok_or_else(|| "no product loaded".to_string())?;

    if let Some(image) = product.images.iter().find(|image| image.file_name == arg) {
        return Ok(image.file_name.clone());
    }
    arg.parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| product.images.get(index))
        .map(|image| image.file_name.clone())
        .ok_or_else(|| format!("no image {:?} in {}", arg, product.name))
}

/// Print the current product, its images and what is needed to save
pub fn render<W: Write>(session: &ReviewSession, store: &SelectionStore, out: &mut W) -> Result<()> {
    let Some(product) = session.current() else {
        writeln!(out, "No product folders found.")?;
        return Ok(());
    };
    let (position, total) = session.progress();

    writeln!(out)?;
    writeln!(out, "{} ({} of {})", product.name, position, total)?;
    if let Ok(record) = store.load_record(&product.name) {
        writeln!(
            out,
            "already saved by {} on {}; saving again replaces it",
            record.selected_by,
            record.timestamp.format("%Y-%m-%d %H:%M")
        )?;
    }

    if product.images.is_empty() {
        writeln!(out, "No images found in this product folder.")?;
    }
    for (index, image) in product.images.iter().enumerate() {
        let entry = session.selection(&image.file_name).unwrap_or_default();
        if entry.selected {
            writeln!(out, "  [x] {:>3}. {}  {}", index + 1, image.file_name, entry.color)?;
        } else {
            writeln!(out, "  [ ] {:>3}. {}", index + 1, image.file_name)?;
        }
    }

    if session.can_save() {
        writeln!(
            out,
            "{} selected by {}; s to save",
            session.selected_count(),
            session.author().trim()
        )?;
    } else if let Some(hint) = session.save_hint() {
        writeln!(out, "({})", hint)?;
    }
    Ok(())
}

/// Drive a session from `input` until `q` or end of input
pub fn run_review<R: BufRead, W: Write>(
    session: &mut ReviewSession,
    store: &SelectionStore,
    input: R,
    mut out: W,
) -> Result<()> {
    render(session, store, &mut out)?;

    for line in input.lines() {
        let line = line?;
        match parse_command(&line, session) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => writeln!(out, "{}", HELP)?,
            Ok(Command::List) => render(session, store, &mut out)?,
            Ok(Command::Apply(action)) => {
                session.update(action);
                render(session, store, &mut out)?;
            }
            Ok(Command::Save) => {
                match session.save_and_next(store) {
                    Ok(record) => {
                        writeln!(out, "Saved {} image(s) for {}", record.images.len(), record.product_name)?;
                        if let Some(next) = session.next_incomplete(store) {
                            writeln!(out, "next incomplete product: {}", next + 1)?;
                        }
                    }
                    Err(err) => writeln!(out, "{}", err)?,
                }
                render(session, store, &mut out)?;
            }
            Err(message) => writeln!(out, "{}", message)?,
        }
        out.flush()?;
    }
    Ok(())
}
