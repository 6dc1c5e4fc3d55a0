mod helpers;

use helpers::*;
use invoice_mapper::config::SuggestMode;
use invoice_mapper::error::AppError;
use invoice_mapper::mapping::SuggestionSource;
use invoice_mapper::memory::types::CandidateList;

fn names(items: &[invoice_mapper::mapping::Suggestion]) -> Vec<&str> {
    items.iter().map(|s| s.invoice_item.as_str()).collect()
}

#[tokio::test]
async fn first_invoice_is_all_new_suggestions() {
    let app = test_app(FakeChat::menu_answers());
    app.mapper.upload_list("default", menu_items()).await.unwrap();

    let outcome = app
        .mapper
        .process_invoice("default", &png_document())
        .await
        .unwrap();

    assert!(outcome.auto_confirmed_items.is_empty());
    assert_eq!(
        names(&outcome.new_suggestions),
        vec!["Roma Tomatoes 10kg", "Mozzarella di Bufala", "Fresh Basil", "Cleaning Supplies"]
    );
    let tomatoes = &outcome.new_suggestions[0];
    assert_eq!(tomatoes.suggested_item.as_deref(), Some("Margherita Pizza"));
    assert_eq!(tomatoes.source, SuggestionSource::Llm);
    assert_eq!(tomatoes.quantity, Some(2.0));
    assert!(outcome.new_suggestions[3].suggested_item.is_none());
    assert_eq!(app.chat.call_count(), 1);
}

#[tokio::test]
async fn confirmed_items_are_auto_confirmed_and_never_sent_to_the_model() {
    let app = test_app(FakeChat::menu_answers());
    app.mapper.upload_list("default", menu_items()).await.unwrap();

    app.mapper
        .confirm("default", "Roma Tomatoes 10kg", Some("Margherita Pizza"))
        .await
        .unwrap();
    app.mapper
        .confirm("default", "cleaning supplies", None)
        .await
        .unwrap();

    let outcome = app
        .mapper
        .process_invoice("default", &png_document())
        .await
        .unwrap();

    assert_eq!(
        names(&outcome.auto_confirmed_items),
        vec!["Roma Tomatoes 10kg", "Cleaning Supplies"]
    );
    assert_eq!(
        outcome.auto_confirmed_items[0].suggested_item.as_deref(),
        Some("Margherita Pizza")
    );
    assert!(outcome.auto_confirmed_items[1].suggested_item.is_none());
    assert!(outcome
        .auto_confirmed_items
        .iter()
        .all(|s| s.source == SuggestionSource::Memory));

    assert_eq!(
        names(&outcome.new_suggestions),
        vec!["Mozzarella di Bufala", "Fresh Basil"]
    );
    assert_eq!(app.chat.seen_items(), vec!["Mozzarella di Bufala", "Fresh Basil"]);
}

#[tokio::test]
async fn every_item_lands_in_exactly_one_list() {
    let app = test_app(FakeChat::menu_answers());
    let menu = CandidateList::new(MENU.iter().copied());
    app.mapper
        .confirm("default", "Fresh Basil", Some("Pesto Pasta"))
        .await
        .unwrap();

    let outcome = app
        .mapper
        .process_text("default", INVOICE_TEXT, &menu)
        .await
        .unwrap();

    assert_eq!(outcome.total_items(), 4);
    for item in ["Roma Tomatoes 10kg", "Mozzarella di Bufala", "Fresh Basil", "Cleaning Supplies"] {
        let in_auto = outcome.auto_confirmed_items.iter().filter(|s| s.invoice_item == item).count();
        let in_new = outcome.new_suggestions.iter().filter(|s| s.invoice_item == item).count();
        assert_eq!(in_auto + in_new, 1, "{item} must appear exactly once");
    }
}

#[tokio::test]
async fn fully_remembered_invoice_skips_the_model() {
    let app = test_app(FakeChat::menu_answers());
    let menu = CandidateList::new(MENU.iter().copied());
    for (item, target) in [
        ("Roma Tomatoes 10kg", Some("Margherita Pizza")),
        ("Mozzarella di Bufala", Some("Caprese Salad")),
        ("Fresh Basil", Some("Pesto Pasta")),
        ("Cleaning Supplies", None),
    ] {
        app.mapper.confirm("default", item, target).await.unwrap();
    }

    let outcome = app
        .mapper
        .process_text("default", INVOICE_TEXT, &menu)
        .await
        .unwrap();
    assert_eq!(outcome.auto_confirmed_items.len(), 4);
    assert!(outcome.new_suggestions.is_empty());
    assert_eq!(app.chat.call_count(), 0);
}

#[tokio::test]
async fn memory_is_scoped_per_customer() {
    let app = test_app(FakeChat::menu_answers());
    let menu = CandidateList::new(MENU.iter().copied());
    app.mapper
        .confirm("bistro", "Fresh Basil", Some("Pesto Pasta"))
        .await
        .unwrap();

    let bistro = app.mapper.process_text("bistro", INVOICE_TEXT, &menu).await.unwrap();
    let cafe = app.mapper.process_text("cafe", INVOICE_TEXT, &menu).await.unwrap();

    assert_eq!(names(&bistro.auto_confirmed_items), vec!["Fresh Basil"]);
    assert!(cafe.auto_confirmed_items.is_empty());
    assert_eq!(cafe.customer_id, "cafe");
}

#[tokio::test]
async fn targets_outside_the_list_become_no_match() {
    let chat = FakeChat::new(&[("Fresh Basil", Some("Basil Soup"))]);
    let app = test_app(chat);
    let menu = CandidateList::new(MENU.iter().copied());

    let outcome = app.mapper.process_text("default", INVOICE_TEXT, &menu).await.unwrap();
    let basil = outcome
        .new_suggestions
        .iter()
        .find(|s| s.invoice_item == "Fresh Basil")
        .unwrap();
    assert!(basil.suggested_item.is_none());
    assert!(basil.notes.contains("Basil Soup"));
}

#[tokio::test]
async fn batch_model_failure_fails_the_invoice() {
    let app = test_app(FakeChat::menu_answers().failing());
    let menu = CandidateList::new(MENU.iter().copied());

    let err = app
        .mapper
        .process_text("default", INVOICE_TEXT, &menu)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert_eq!(err.status().as_u16(), 502);
}

#[tokio::test]
async fn per_item_failure_only_marks_that_item() {
    let chat = FakeChat::menu_answers().failing_on("Fresh Basil");
    let app = test_app_with(INVOICE_TEXT, chat, SuggestMode::PerItem);
    let menu = CandidateList::new(MENU.iter().copied());

    let outcome = app.mapper.process_text("default", INVOICE_TEXT, &menu).await.unwrap();
    assert_eq!(app.chat.call_count(), 4);
    assert_eq!(outcome.new_suggestions.len(), 4);

    let basil = &outcome.new_suggestions[2];
    assert_eq!(basil.invoice_item, "Fresh Basil");
    assert!(basil.error.is_some());
    assert!(basil.suggested_item.is_none());

    let mozzarella = &outcome.new_suggestions[1];
    assert_eq!(mozzarella.suggested_item.as_deref(), Some("Caprese Salad"));
    assert!(mozzarella.error.is_none());
}

#[tokio::test]
async fn missing_list_is_not_found() {
    let app = test_app(FakeChat::menu_answers());
    let err = app
        .mapper
        .process_invoice("bistro", &png_document())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(
        err.to_string(),
        "No list found for customer 'bistro'. Please call /upload-list first."
    );
    assert_eq!(app.ocr.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_replaces_the_previous_list() {
    let app = test_app(FakeChat::menu_answers());
    app.mapper.upload_list("bistro", menu_items()).await.unwrap();
    app.mapper
        .upload_list("bistro", vec!["Garlic Bread".into(), " Garlic Bread ".into()])
        .await
        .unwrap();

    let list = app.mapper.candidate_list("bistro").await.unwrap().unwrap();
    assert_eq!(list.len(), 1);
    assert!(list.contains("Garlic Bread"));
    assert!(!list.contains("Tiramisu"));

    let err = app
        .mapper
        .upload_list("bistro", vec!["  ".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Input(_)));
}

#[tokio::test]
async fn forget_makes_an_item_new_again() {
    let app = test_app(FakeChat::menu_answers());
    let menu = CandidateList::new(MENU.iter().copied());
    app.mapper
        .confirm("default", "Fresh Basil", Some("Pesto Pasta"))
        .await
        .unwrap();

    assert!(app.mapper.forget("default", "FRESH BASIL").await.unwrap());
    assert!(!app.mapper.forget("default", "Fresh Basil").await.unwrap());

    let outcome = app.mapper.process_text("default", INVOICE_TEXT, &menu).await.unwrap();
    assert!(outcome.auto_confirmed_items.is_empty());
    assert!(app.mapper.mappings("default").await.unwrap().is_empty());
}

#[tokio::test]
async fn configured_default_list_is_used_without_an_upload() {
    use invoice_mapper::mapping::{InvoiceMapper, MapperParts};

    let app = test_app(FakeChat::menu_answers());
    let mut config = app.config.clone();
    config.candidates.default_list = menu_items();
    let parts = MapperParts {
        mappings: app.store.clone(),
        candidates: app.lists.clone(),
        ocr: app.ocr.clone(),
        chat: app.chat.clone(),
    };
    let mapper = InvoiceMapper::new(parts, &config);

    let list = mapper.candidate_list("anyone").await.unwrap().unwrap();
    assert_eq!(list.len(), MENU.len());
    let outcome = mapper.process_invoice("anyone", &png_document()).await.unwrap();
    assert_eq!(outcome.new_suggestions.len(), 4);
}
