//! Shared library catalogue fixture
//!
//! Thirteen books (eight novels, five programming guides), their authors and
//! the characters of the novels, indexed into a fresh database backend.

#![allow(dead_code)]

use chrono::NaiveDate;
use sift_core::{FieldSpec, MemoryStore, ModelSpec, Record, Schema, SchemaBuilder, Value};
use sift_search::{update_index, DatabaseSearchBackend, SearchBackend, SearchResults};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Library {
    pub store: Arc<MemoryStore>,
    pub backend: Arc<dyn SearchBackend>,
}

pub fn schema() -> Schema {
    SchemaBuilder::new()
        .model(
            ModelSpec::new("Author")
                .field(FieldSpec::search("name"))
                .field(FieldSpec::filter("date_of_birth")),
        )
        .model(ModelSpec::new("Character").field(FieldSpec::search("name")))
        .model(
            ModelSpec::new("Book")
                .field(FieldSpec::search("title").boost(2.0).filterable())
                .field(FieldSpec::related("authors", "Author"))
                .field(FieldSpec::filter("publication_date"))
                .field(FieldSpec::filter("number_of_pages")),
        )
        .model(
            ModelSpec::new("Novel")
                .extends("Book")
                .field(FieldSpec::search("setting"))
                .field(FieldSpec::related("protagonist", "Character").boost(2.0))
                .field(FieldSpec::related("characters", "Character").boost(0.5)),
        )
        .model(
            ModelSpec::new("ProgrammingGuide")
                .extends("Book")
                .field(FieldSpec::filter("programming_language"))
                .field(FieldSpec::computed("programming_language_display", |r: &Record| {
                    let display = match r.get("programming_language")?.as_str()? {
                        "py" => "Python",
                        "js" => "JavaScript",
                        "rs" => "Rust",
                        _ => return None,
                    };
                    Some(Value::from(display))
                })),
        )
        .build()
        .expect("library schema")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn author(pk: u64, name: &str, born: Option<NaiveDate>) -> Record {
    let record = Record::new("Author", pk).with("name", name);
    match born {
        Some(born) => record.with("date_of_birth", born),
        None => record,
    }
}

fn book(model: &str, pk: u64, title: &str, pages: i64, published: NaiveDate, authors: &[u64]) -> Record {
    Record::new(model, pk)
        .with("title", title)
        .with("number_of_pages", pages)
        .with("publication_date", published)
        .with_related("authors", authors.iter().copied())
}

#[allow(clippy::too_many_arguments)]
fn novel(
    pk: u64,
    title: &str,
    pages: i64,
    published: NaiveDate,
    authors: &[u64],
    setting: &str,
    protagonist: u64,
    characters: &[u64],
) -> Record {
    book("Novel", pk, title, pages, published, authors)
        .with("setting", setting)
        .with_related("protagonist", [protagonist])
        .with_related("characters", characters.iter().copied())
}

fn guide(pk: u64, title: &str, pages: i64, published: NaiveDate, authors: &[u64], language: &str) -> Record {
    book("ProgrammingGuide", pk, title, pages, published, authors).with("programming_language", language)
}

pub fn records() -> Vec<Record> {
    let lotr_characters = [1, 3, 5, 6];
    vec![
        author(1, "Isaac Asimov", Some(date(1920, 1, 2))),
        author(2, "George R.R. Martin", Some(date(1948, 9, 20))),
        author(3, "J. R. R. Tolkien", Some(date(1892, 1, 3))),
        author(4, "David Ascher", None),
        author(5, "Mark Lutz", None),
        author(6, "David Flanagan", None),
        author(7, "Douglas Crockford", None),
        author(8, "Daniel Roy Greenfeld", None),
        author(9, "Audrey Roy Greenfeld", None),
        author(10, "Carol Nichols", None),
        author(11, "Steve Klabnik", None),
        Record::new("Character", 1).with("name", "Bilbo Baggins"),
        Record::new("Character", 2).with("name", "Frodo Baggins"),
        Record::new("Character", 3).with("name", "Gandalf"),
        Record::new("Character", 4).with("name", "Thorin Oakenshield"),
        Record::new("Character", 5).with("name", "Samwise Gamgee"),
        Record::new("Character", 6).with("name", "Aragorn"),
        Record::new("Character", 7).with("name", "Hari Seldon"),
        Record::new("Character", 8).with("name", "Salvor Hardin"),
        Record::new("Character", 9).with("name", "Eddard Stark"),
        Record::new("Character", 10).with("name", "Arya Stark"),
        Record::new("Character", 11).with("name", "Tyrion Lannister"),
        Record::new("Character", 12).with("name", "Jon Snow"),
        novel(1, "The Hobbit", 310, date(1937, 9, 21), &[3], "Middle Earth", 1, &[3, 4]),
        novel(2, "The Fellowship of the Ring", 423, date(1954, 7, 29), &[3], "Middle Earth", 2, &lotr_characters),
        novel(3, "The Two Towers", 352, date(1954, 11, 11), &[3], "Middle Earth", 2, &lotr_characters),
        novel(4, "The Return of the King", 440, date(1955, 10, 20), &[3], "Middle Earth", 2, &lotr_characters),
        novel(5, "Foundation", 255, date(1951, 6, 1), &[1], "Trantor", 7, &[8]),
        novel(6, "A Game of Thrones", 694, date(1996, 8, 1), &[2], "Westeros", 9, &[10, 11]),
        novel(7, "A Clash of Kings", 768, date(1998, 11, 16), &[2], "Westeros", 11, &[10, 12]),
        novel(8, "A Storm of Swords", 973, date(2000, 8, 8), &[2], "Westeros", 12, &[10, 11]),
        guide(9, "Learning Python", 1160, date(2013, 7, 6), &[5, 4], "py"),
        guide(10, "JavaScript: The Definitive Guide", 1096, date(2011, 5, 13), &[6], "js"),
        guide(11, "JavaScript: The good parts", 176, date(2008, 5, 1), &[7], "js"),
        guide(12, "Two Scoops of Django 1.11", 532, date(2017, 5, 11), &[8, 9], "py"),
        guide(13, "The Rust Programming Language", 440, date(2018, 6, 26), &[10, 11], "rs"),
    ]
}

/// Store with the catalogue loaded, and a database backend indexed over it
pub fn library() -> Library {
    let store = Arc::new(MemoryStore::new(Arc::new(schema())));
    for record in records() {
        store.insert(record).expect("insert fixture record");
    }
    let backend: Arc<dyn SearchBackend> = Arc::new(DatabaseSearchBackend::new(store.clone()));
    update_index(backend.as_ref(), store.as_ref(), 5).expect("index fixture");
    Library { store, backend }
}

fn text_of(record: &Record, field: &str) -> String {
    record
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Titles in result order
pub fn titles(results: &SearchResults) -> Vec<String> {
    results.to_vec().unwrap().iter().map(|r| text_of(r, "title")).collect()
}

/// Titles in any order
pub fn title_set(results: &SearchResults) -> BTreeSet<String> {
    titles(results).into_iter().collect()
}

/// Author names in any order
pub fn name_set(results: &SearchResults) -> BTreeSet<String> {
    results
        .to_vec()
        .unwrap()
        .iter()
        .map(|r| text_of(r, "name"))
        .collect()
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
