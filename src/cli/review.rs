//! Interactive review of new suggestions.
//!
//! For each suggestion the user confirms it, corrects it by picking a list
//! entry (or "no match"), or skips it. Skipped items are not remembered.

use anyhow::{Context, Result};
use dialoguer::Input;

use crate::mapping::Suggestion;
use crate::memory::types::CandidateList;

/// Source of user answers. The terminal implementation uses dialoguer.
pub trait Prompter {
    fn ask(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        input.interact_text().context("failed to read answer")
    }
}

/// What to store for one reviewed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Save this target; `None` records an explicit no-match.
    Save(Option<String>),
    Skip,
}

const ACTION_PROMPT: &str = "Action ([c]onfirm, [r]eject/correct, [s]kip)";
const FAILED_PROMPT: &str = "Action ([r]eject/correct, [s]kip)";
const PICK_PROMPT: &str = "Number of the correct item (or 'n' for no match)";

/// Ask the user what to do with one suggestion.
pub fn review_item(
    suggestion: &Suggestion,
    candidates: &CandidateList,
    prompter: &mut dyn Prompter,
) -> Result<Decision> {
    println!("{}", "-".repeat(30));
    println!("Invoice item:    {}", suggestion.invoice_item);
    println!(
        "Suggested match: {}",
        suggestion.suggested_item.as_deref().unwrap_or("No match found")
    );
    if let Some(ref err) = suggestion.error {
        println!("Error:           {err}");
    }

    // A failed suggestion was never judged, so it cannot be confirmed as is.
    if suggestion.error.is_some() {
        loop {
            let answer = prompter.ask(FAILED_PROMPT, Some("s"))?;
            match answer.trim().to_lowercase().as_str() {
                "" | "s" => return Ok(Decision::Skip),
                "r" => return pick_candidate(candidates, prompter).map(Decision::Save),
                other => println!("Cannot use '{other}' for a failed suggestion, please enter r or s."),
            }
        }
    }

    loop {
        let answer = prompter.ask(ACTION_PROMPT, Some("c"))?;
        match answer.trim().to_lowercase().as_str() {
            "" | "c" => return Ok(Decision::Save(suggestion.suggested_item.clone())),
            "r" => return pick_candidate(candidates, prompter).map(Decision::Save),
            "s" => return Ok(Decision::Skip),
            other => println!("Unknown action '{other}', please enter c, r or s."),
        }
    }
}

fn pick_candidate(candidates: &CandidateList, prompter: &mut dyn Prompter) -> Result<Option<String>> {
    println!("Select the correct item:");
    for (i, name) in candidates.iter().enumerate() {
        println!("  {:>3}: {name}", i + 1);
    }
    println!("    n: No match");

    loop {
        let answer = prompter.ask(PICK_PROMPT, None)?;
        let answer = answer.trim();
        if answer.eq_ignore_ascii_case("n") {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if n >= 1 => match candidates.get(n - 1) {
                Some(name) => return Ok(Some(name.clone())),
                None => println!("Invalid number, please try again."),
            },
            _ => println!("Invalid input, please enter a number or 'n'."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InvoiceItem;
    use crate::mapping::SuggestionSource;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<&'static str>);

    impl Prompter for Scripted {
        fn ask(&mut self, _prompt: &str, _default: Option<&str>) -> Result<String> {
            self.0
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    fn suggestion(target: Option<&str>) -> Suggestion {
        let mut s = Suggestion::for_item(InvoiceItem::named("Roma Tomatoes 10kg"), SuggestionSource::Llm);
        s.suggested_item = target.map(str::to_string);
        s
    }

    fn menu() -> CandidateList {
        CandidateList::new(["Margherita Pizza", "Caprese Salad", "Tiramisu"])
    }

    #[test]
    fn blank_answer_confirms_suggestion() {
        let mut p = Scripted(VecDeque::from([""]));
        let d = review_item(&suggestion(Some("Margherita Pizza")), &menu(), &mut p).unwrap();
        assert_eq!(d, Decision::Save(Some("Margherita Pizza".into())));
    }

    #[test]
    fn correction_picks_numbered_item_after_retry() {
        let mut p = Scripted(VecDeque::from(["x", "R", "9", "abc", "2"]));
        let d = review_item(&suggestion(Some("Margherita Pizza")), &menu(), &mut p).unwrap();
        assert_eq!(d, Decision::Save(Some("Caprese Salad".into())));
    }

    #[test]
    fn correction_to_no_match() {
        let mut p = Scripted(VecDeque::from(["r", "n"]));
        let d = review_item(&suggestion(Some("Tiramisu")), &menu(), &mut p).unwrap();
        assert_eq!(d, Decision::Save(None));
    }

    #[test]
    fn skip_and_zero_is_invalid() {
        let mut p = Scripted(VecDeque::from(["s"]));
        assert_eq!(
            review_item(&suggestion(None), &menu(), &mut p).unwrap(),
            Decision::Skip
        );

        let mut p = Scripted(VecDeque::from(["r", "0", "3"]));
        assert_eq!(
            review_item(&suggestion(None), &menu(), &mut p).unwrap(),
            Decision::Save(Some("Tiramisu".into()))
        );
    }

    #[test]
    fn failed_suggestion_is_skipped_by_default_and_cannot_be_confirmed() {
        let mut failed = suggestion(None);
        failed.error = Some("LLM returned a malformed response".into());

        let mut p = Scripted(VecDeque::from([""]));
        assert_eq!(review_item(&failed, &menu(), &mut p).unwrap(), Decision::Skip);

        let mut p = Scripted(VecDeque::from(["c", "r", "1"]));
        assert_eq!(
            review_item(&failed, &menu(), &mut p).unwrap(),
            Decision::Save(Some("Margherita Pizza".into()))
        );
    }
}
