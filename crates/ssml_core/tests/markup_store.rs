use ssml_core::store::{MarkupSink, MarkupSource, SqliteMarkupStore};

#[test]
fn markup_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("editor.sqlite3");

    let store = SqliteMarkupStore::open(&path).unwrap();
    store
        .write_markup("content", r#"<p>hi<span class="break" time="2"><sup>2s</sup></span></p>"#)
        .unwrap();
    drop(store);

    let reopened = SqliteMarkupStore::open(&path).unwrap();
    let stored = reopened.get("content").unwrap().expect("row should exist");
    assert_eq!(
        stored.markup,
        r#"<p>hi<span class="break" time="2"><sup>2s</sup></span></p>"#
    );
    assert!(stored.updated_at > 0);
}

#[test]
fn keys_are_independent() {
    let store = SqliteMarkupStore::open_in_memory().unwrap();
    store.write_markup("content", "<p>a</p>").unwrap();
    store.write_markup("draft", "<p>b</p>").unwrap();

    assert_eq!(store.read_markup("content").unwrap().as_deref(), Some("<p>a</p>"));
    assert_eq!(store.read_markup("draft").unwrap().as_deref(), Some("<p>b</p>"));

    let mut keys = store.keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["content".to_string(), "draft".to_string()]);
}
