//! Link command handlers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use rl_core::{LinkDraft, LinkStore, ListOptions};

use crate::output::{Output, OutputFormat};

/// Save a link, or merge into the one already saved for the URL
pub fn add(
    store: &mut LinkStore,
    draft: LinkDraft,
    output: &Output,
) -> Result<()> {
    let outcome = store.add(&draft)?;
    let link = &outcome.link;

    match output.format {
        OutputFormat::Human => {
            let verb = if outcome.created { "Added" } else { "Updated" };
            output.success(&format!("{} link {}: {}", verb, link.id, link.url));
        }
        _ => output.print_link(link),
    }
    Ok(())
}

/// List links matching the filters
pub fn list(store: &LinkStore, opts: ListOptions, output: &Output) -> Result<()> {
    let links = store.list(&opts)?;
    output.print_links(&links);
    Ok(())
}

/// Open a link in the default browser
pub fn open(store: &LinkStore, id: &str, output: &Output) -> Result<()> {
    let link = store.get(id)?;

    open::that(&link.url).with_context(|| format!("Failed to open browser for {}", link.url))?;

    output.success(&format!("Opened: {}", link.url));
    Ok(())
}

/// Mark a link as read
pub fn done(store: &mut LinkStore, id: &str, output: &Output) -> Result<()> {
    store.mark_read(id)?;
    output.success(&format!("Marked link {} as read.", id));
    Ok(())
}

/// Mark a link as unread
pub fn undo(store: &mut LinkStore, id: &str, output: &Output) -> Result<()> {
    store.mark_unread(id)?;
    output.success(&format!("Marked link {} as unread.", id));
    Ok(())
}

/// Delete one or more links
///
/// Every id is attempted; any failure makes the command fail after the
/// rest have been processed.
pub fn remove(store: &mut LinkStore, ids: &[String], output: &Output) -> Result<()> {
    let mut deleted = Vec::new();
    let mut failed = Vec::new();

    for (id, result) in store.delete_many(ids) {
        match result {
            Ok(()) => deleted.push(id),
            Err(e) if e.is_not_found() => failed.push(format!("{} (not found)", id)),
            Err(e) => failed.push(format!("{} ({})", id, e)),
        }
    }

    match deleted.as_slice() {
        [] => {}
        [id] => output.success(&format!("Deleted link {}.", id)),
        many => output.success(&format!(
            "Deleted {} link(s): {}",
            many.len(),
            many.join(", ")
        )),
    }

    if !failed.is_empty() {
        bail!("Failed to delete: {}", failed.join(", "));
    }
    Ok(())
}

/// Write every link as JSON to stdout or a file
pub fn export(store: &LinkStore, path: Option<&Path>, output: &Output) -> Result<()> {
    let json = store.export_json()?;

    match path {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!(
                "Exported {} link(s) to {}",
                store.count()?,
                path.display()
            ));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Merge links from a JSON export file
pub fn import(store: &mut LinkStore, path: &PathBuf, output: &Output) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {:?}", path))?;

    let report = store.import_json(&json)?;
    output.print_import_report(&report);
    Ok(())
}

/// Full-text search
pub fn search(store: &LinkStore, query: &str, output: &Output) -> Result<()> {
    let links = store.search(query)?;
    output.print_links(&links);
    Ok(())
}
