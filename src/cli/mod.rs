pub mod doctor;
pub mod list;
pub mod map;
pub mod mappings;
pub mod review;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::memory::candidates::parse_list;
use crate::memory::types::CandidateList;

/// Read a candidate list file (JSON array of strings).
pub fn read_list_file(path: &Path) -> Result<CandidateList> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read list file: {}", path.display()))?;
    let items = parse_list(&bytes).with_context(|| format!("invalid list file: {}", path.display()))?;
    let list = CandidateList::new(items);
    anyhow::ensure!(!list.is_empty(), "list file {} has no items", path.display());
    Ok(list)
}

/// A steady-ticking spinner for slow network steps.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print rows as a left-aligned text table under a title.
pub fn print_table(title: &str, headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!();
    println!("{title}");
    println!("{}", "=".repeat(title.chars().count()));
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    println!("{}", line(&header));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in rows {
        println!("{}", line(row));
    }
}
