//! Default CLI command: map one invoice file and review the suggestions.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use super::review::{review_item, Decision, Prompter, TerminalPrompter};
use super::{print_table, read_list_file, spinner};
use crate::config::MapperConfig;
use crate::mapping::{InvoiceMapper, Suggestion};
use crate::ocr::Document;

pub struct MapArgs {
    pub input: PathBuf,
    pub customer: Option<String>,
    pub list: Option<PathBuf>,
    pub model: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub saved: usize,
    pub skipped: usize,
}

pub async fn run(mut config: MapperConfig, args: MapArgs) -> Result<()> {
    if !args.input.exists() {
        bail!("File not found: {}", args.input.display());
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    let mapper = InvoiceMapper::from_config(&config)?;
    let customer = mapper.resolve_customer(args.customer.as_deref())?;

    let candidates = match args.list {
        Some(ref path) => read_list_file(path)?,
        None => match mapper.candidate_list(&customer).await? {
            Some(list) => list,
            None => bail!(
                "No list found for customer '{customer}'. Run `invoice-mapper list set <FILE>` or pass --list."
            ),
        },
    };

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let filename = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let Some(document) = Document::detect(bytes, filename) else {
        bail!("Unsupported file type: {} (expected PDF, PNG or JPEG)", args.input.display());
    };

    let known = mapper.mappings(&customer).await?.len();
    println!("Loaded {known} confirmed mappings for customer '{customer}'.");

    let pb = spinner(format!(
        "Reading '{}' and asking {} for matches...",
        document.display_name(),
        config.llm.model
    ));
    let outcome = mapper.process_with_list(&customer, &document, &candidates).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    if !outcome.auto_confirmed_items.is_empty() {
        print_suggestions("Auto-confirmed mappings (from memory)", &outcome.auto_confirmed_items);
    }

    if outcome.new_suggestions.is_empty() {
        if outcome.auto_confirmed_items.is_empty() {
            println!("No items were found on the invoice to map.");
        } else {
            println!();
            println!("All items were auto-confirmed. No manual review needed.");
        }
        return Ok(());
    }

    print_suggestions("New items needing review", &outcome.new_suggestions);
    println!();
    println!("For each new suggestion, confirm, correct, or skip.");

    let summary = review_all(
        &mapper,
        &customer,
        &outcome.new_suggestions,
        &candidates,
        &mut TerminalPrompter,
    )
    .await?;

    println!();
    println!(
        "Review complete: {} saved, {} skipped.",
        summary.saved, summary.skipped
    );
    Ok(())
}

/// Review each suggestion and store the decisions as they are made.
pub async fn review_all(
    mapper: &InvoiceMapper,
    customer: &str,
    suggestions: &[Suggestion],
    candidates: &crate::memory::types::CandidateList,
    prompter: &mut dyn Prompter,
) -> Result<ReviewSummary> {
    let mut summary = ReviewSummary::default();
    for suggestion in suggestions {
        match review_item(suggestion, candidates, prompter)? {
            Decision::Save(target) => {
                mapper
                    .confirm(customer, &suggestion.invoice_item, target.as_deref())
                    .await?;
                match target {
                    Some(t) => println!("Saved: '{}' -> '{t}'.", suggestion.invoice_item),
                    None => println!("Saved: '{}' -> no match.", suggestion.invoice_item),
                }
                summary.saved += 1;
            }
            Decision::Skip => {
                println!("Skipped. This mapping will not be saved.");
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

fn print_suggestions(title: &str, items: &[Suggestion]) {
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|s| {
            let target = s
                .suggested_item
                .clone()
                .unwrap_or_else(|| "(no match)".to_string());
            let notes = s.error.clone().unwrap_or_else(|| s.notes.clone());
            vec![s.invoice_item.clone(), target, notes]
        })
        .collect();
    print_table(title, &["Invoice item", "Suggested match", "Notes"], &rows);
}
