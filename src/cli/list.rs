//! CLI `list set` / `list show` commands.

use std::path::Path;

use anyhow::Result;

use super::read_list_file;
use crate::mapping::InvoiceMapper;

/// Replace the customer's candidate list with the contents of a JSON file.
pub async fn set(mapper: &InvoiceMapper, customer: &str, file: &Path) -> Result<()> {
    let list = read_list_file(file)?;
    let stored = mapper
        .upload_list(customer, list.iter().cloned().collect())
        .await?;
    println!(
        "List for '{customer}' saved successfully ({} items).",
        stored.len()
    );
    Ok(())
}

/// Print the list that suggestions for this customer are drawn from.
pub async fn show(mapper: &InvoiceMapper, customer: &str) -> Result<()> {
    match mapper.candidate_list(customer).await? {
        Some(list) => {
            println!("List for '{customer}' ({} items):", list.len());
            for (i, name) in list.iter().enumerate() {
                println!("  {:>3}: {name}", i + 1);
            }
        }
        None => println!("No list found for customer '{customer}'."),
    }
    Ok(())
}
