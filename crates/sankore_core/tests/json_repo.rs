use chrono::NaiveDate;
use sankore_core::{
    Book, CurrentRun, JsonFileRepository, LibraryRepository, Store, CURRENTLY_READING, TO_READ,
};

#[test]
fn missing_file_loads_default_store() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path().join("absent.json"));
    assert_eq!(repo.load().unwrap(), Store::with_default_libraries());
}

#[test]
fn malformed_file_falls_back_to_default_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"libraries\": [ { \"name\": ").unwrap();

    let repo = JsonFileRepository::new(&path);
    assert_eq!(repo.load().unwrap(), Store::with_default_libraries());
}

#[test]
fn save_then_load_roundtrips_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = JsonFileRepository::new(dir.path().join("data").join("books.json"));

    let mut store = Store::with_default_libraries();
    store
        .insert_book(TO_READ, Book::new("The Aeneid", "Virgil", 442))
        .unwrap();
    let mut reading = Book::new("Meditations", "Marcus Aurelius", 254)
        .with_quote("Very little is needed to make a happy life.")
        .unwrap();
    reading.current_run = Some(CurrentRun {
        start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        page: 42,
    });
    store.insert_book(CURRENTLY_READING, reading).unwrap();

    repo.save(&store).unwrap();
    assert!(repo.path().exists());
    assert!(!repo.path().with_file_name("books.json.tmp").exists());
    assert_eq!(repo.load().unwrap(), store);
}

#[test]
fn document_never_contains_all_books_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = JsonFileRepository::new(dir.path().join("books.json"));
    repo.save(&Store::with_default_libraries()).unwrap();

    let text = std::fs::read_to_string(repo.path()).unwrap();
    assert!(!text.contains("All Books"));
    assert!(text.contains("Currently Reading"));
}

#[test]
fn legacy_document_without_ids_or_history_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    std::fs::write(
        &path,
        r#"{
            "libraries": [
                {
                    "name": "Already Read",
                    "rateable": true,
                    "books": [
                        { "title": "De Oratore", "author": "Cicero", "pages": 380, "rating": 9 }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();

    let store = JsonFileRepository::new(&path).load().unwrap();
    let book = store.find_book("De Oratore").unwrap();
    assert_eq!(book.rating.map(|rating| rating.stars()), Some(5));
    assert!(book.quotes.is_empty());
    assert_eq!(book.current_page(), 0);
    assert_eq!(store.library("Already Read").unwrap().description, "");
}

#[test]
fn stored_zero_rating_loads_as_unrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unrated.json");
    std::fs::write(
        &path,
        r#"{"libraries": [{"name": "Already Read", "rateable": true, "books": [
            {"title": "De Oratore", "author": "Cicero", "pages": 380, "rating": 0},
            {"title": "On Duties", "author": "Cicero", "pages": 200, "rating": 3}
        ]}]}"#,
    )
    .unwrap();

    let store = JsonFileRepository::new(&path).load().unwrap();
    assert_eq!(store.find_book("De Oratore").unwrap().rating, None);
    assert_eq!(
        store
            .find_book("On Duties")
            .unwrap()
            .rating
            .map(|rating| rating.stars()),
        Some(3)
    );
}

#[test]
fn document_breaking_store_invariants_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        r#"{"libraries": [{"name": "To Read", "books": [
            {"title": "X", "author": "A", "pages": 10},
            {"title": "X", "author": "B", "pages": 12}
        ]}]}"#,
        r#"{"libraries": [{"name": "To Read", "books": [
            {"title": "X", "author": "A", "pages": 0}
        ]}]}"#,
        r#"{"libraries": [{"name": "To Read"}, {"name": "To Read"}]}"#,
        r#"{"libraries": [{"name": "All Books"}]}"#,
        r#"{"libraries": [
            {"name": "To Read", "books": [{"id": "6f1c2b4e-8f0a-4c39-9a53-0d2f7b1e5a10", "title": "X", "author": "A", "pages": 10}]},
            {"name": "Already Read", "books": [{"id": "6f1c2b4e-8f0a-4c39-9a53-0d2f7b1e5a10", "title": "Y", "author": "A", "pages": 10}]}
        ]}"#,
    ];

    for (index, document) in cases.iter().enumerate() {
        let path = dir.path().join(format!("case{index}.json"));
        std::fs::write(&path, document).unwrap();
        let store = JsonFileRepository::new(&path).load().unwrap();
        assert_eq!(store, Store::with_default_libraries(), "case {index}");
    }
}

#[test]
fn run_page_beyond_page_count_is_clamped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clamp.json");
    std::fs::write(
        &path,
        r#"{"libraries": [{"name": "Currently Reading", "tracks_progress": true, "books": [
            {"title": " Meditations ", "author": "Marcus Aurelius", "pages": 254,
             "current_run": {"start": "2024-06-01", "page": 900}}
        ]}]}"#,
    )
    .unwrap();

    let store = JsonFileRepository::new(&path).load().unwrap();
    let book = store.find_book("Meditations").unwrap();
    assert_eq!(book.current_run.unwrap().page, 254);
    assert_eq!(book.current_page(), 254);
}
