//! CLI `doctor` command: check configuration and stored files.

use anyhow::Result;

use crate::config::{default_config_path, MapperConfig};
use crate::memory::candidates::{CandidateStore, JsonDirCandidateStore};
use crate::memory::store::JsonFileStore;

/// Print a health report for the configured data directory and providers.
pub fn doctor(config: &MapperConfig) -> Result<()> {
    let config_path = default_config_path();
    let mappings_path = config.resolved_mappings_path();
    let lists_dir = config.resolved_lists_dir();

    println!("Invoice Mapper Health Report");
    println!("============================");
    println!();
    println!(
        "Config file:       {} ({})",
        config_path.display(),
        if config_path.exists() { "found" } else { "not found, using defaults" }
    );
    println!("Data dir:          {}", config.resolved_data_dir().display());
    println!("Default customer:  {}", config.storage.default_customer);
    println!();

    println!("Mappings file:     {}", mappings_path.display());
    if mappings_path.exists() {
        let size = std::fs::metadata(&mappings_path).map(|m| m.len()).unwrap_or(0);
        println!("  File size:       {}", format_bytes(size));
        let store = JsonFileStore::new(&mappings_path, config.storage.default_customer.clone());
        match store.read_file() {
            Ok(file) => {
                let total: usize = file.values().map(|m| m.len()).sum();
                println!("  Status:          OK ({total} mappings, {} customers)", file.len());
                for (customer, mappings) in &file {
                    let no_match = mappings.values().filter(|e| e.target.is_none()).count();
                    println!(
                        "    {customer:<16} {} mappings ({no_match} no-match)",
                        mappings.len()
                    );
                }
            }
            Err(e) => {
                println!("  Status:          UNREADABLE ({e})");
                println!("  The next confirmation moves it aside and starts a fresh file.");
            }
        }
    } else {
        println!("  Status:          not created yet");
    }
    println!();

    println!("Lists dir:         {}", lists_dir.display());
    let lists = JsonDirCandidateStore::new(&lists_dir);
    let mut customers: Vec<String> = std::fs::read_dir(&lists_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| {
                    let path = e.path();
                    (path.extension()? == "json")
                        .then(|| path.file_stem()?.to_str().map(str::to_string))
                        .flatten()
                })
                .collect()
        })
        .unwrap_or_default();
    customers.sort();
    if customers.is_empty() {
        println!("  No uploaded lists.");
    }
    for customer in customers {
        match lists.get(&customer) {
            Ok(Some(list)) => println!("    {customer:<16} {} items", list.len()),
            Ok(None) => {}
            Err(e) => println!("    {customer:<16} UNREADABLE ({e})"),
        }
    }
    if !config.candidates.default_list.is_empty() {
        println!(
            "  Default list:    {} items (from config)",
            config.candidates.default_list.len()
        );
    }
    println!();

    println!("OCR:");
    println!("  Endpoint:        {}", config.ocr.endpoint);
    println!("  API key:         {}", key_status(config.ocr.api_key.as_deref()));
    println!("LLM:");
    println!("  Base URL:        {}", config.llm.base_url);
    println!("  Model:           {}", config.llm.model);
    println!("  Mode:            {:?}", config.llm.mode);
    println!("  API key:         {}", key_status(config.llm.api_key.as_deref()));

    Ok(())
}

fn key_status(key: Option<&str>) -> &'static str {
    match key {
        Some(k) if !k.trim().is_empty() => "set",
        _ => "MISSING",
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
