//! CLI `mappings` and `forget` commands.

use anyhow::Result;

use super::print_table;
use crate::mapping::InvoiceMapper;

/// Print a customer's confirmed mappings as a table or JSON.
pub async fn show(mapper: &InvoiceMapper, customer: &str, json: bool) -> Result<()> {
    let mappings = mapper.mappings(customer).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&mappings)?);
        return Ok(());
    }

    if mappings.is_empty() {
        println!("No confirmed mappings for customer '{customer}'.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = mappings
        .iter()
        .map(|m| {
            vec![
                m.invoice_item.clone(),
                m.target.clone().unwrap_or_else(|| "(no match)".to_string()),
                chrono::DateTime::parse_from_rfc3339(&m.confirmed_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|_| m.confirmed_at.clone()),
            ]
        })
        .collect();
    print_table(
        &format!("Confirmed mappings for '{customer}' ({})", mappings.len()),
        &["Invoice item", "Target", "Confirmed"],
        &rows,
    );
    Ok(())
}

/// Remove the mapping for one invoice item text.
pub async fn forget(mapper: &InvoiceMapper, customer: &str, text: &str) -> Result<()> {
    if mapper.forget(customer, text).await? {
        println!("Removed mapping for '{text}' (customer '{customer}').");
    } else {
        println!("No mapping stored for '{text}' (customer '{customer}').");
    }
    Ok(())
}
