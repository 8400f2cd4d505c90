//! Behaviour every search backend must provide, run against the database
//! backend over the library catalogue.

mod common;

use common::{date, library, name_set, set, title_set, titles, Library};
use sift_core::{
    Error, FieldErrorReason, FieldSpec, Lookup, MemoryStore, ModelSpec, Query, Record, RecordSet,
    RecordStore, SchemaBuilder, MATCH_ALL,
};
use sift_search::{
    update_index, DatabaseSearchBackend, SearchBackend, SearchOptions, SearchQuery, SearchResults,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn search(lib: &Library, query: impl Into<SearchQuery>, records: RecordSet) -> SearchResults {
    search_with(lib, query, records, SearchOptions::new())
}

fn search_with(
    lib: &Library,
    query: impl Into<SearchQuery>,
    records: RecordSet,
    options: SearchOptions,
) -> SearchResults {
    lib.backend.search(query.into(), &records, &options).unwrap()
}

fn books() -> RecordSet {
    RecordSet::of("Book")
}

fn novels_by_pages() -> RecordSet {
    RecordSet::of("Novel").order_by(["number_of_pages"])
}

fn unranked() -> SearchOptions {
    SearchOptions::new().order_by_relevance(false)
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_simple() {
    let lib = library();
    let results = search(&lib, "JavaScript", books());
    assert_eq!(
        title_set(&results),
        set(&["JavaScript: The good parts", "JavaScript: The Definitive Guide"])
    );
}

#[test]
fn test_search_count() {
    let lib = library();
    assert_eq!(search(&lib, "JavaScript", books()).count().unwrap(), 2);
}

#[test]
fn test_search_blank() {
    let lib = library();
    assert!(search(&lib, "", books()).is_empty().unwrap());
    assert!(search(&lib, "  \t ", books()).is_empty().unwrap());
}

#[test]
fn test_search_all() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, books());
    let expected: BTreeSet<u64> = lib.store.records("Book").unwrap().iter().map(|r| r.pk).collect();
    assert_eq!(results.keys().unwrap(), expected);
}

#[test]
fn test_ranking() {
    let lib = library();
    let results = search_with(&lib, "JavaScript Definitive", books(), SearchOptions::new().operator("or"));
    assert_eq!(
        title_set(&results),
        set(&["JavaScript: The good parts", "JavaScript: The Definitive Guide"])
    );
    assert_eq!(titles(&results)[0], "JavaScript: The Definitive Guide");
}

#[test]
fn test_search_and_operator() {
    let lib = library();
    let results = search_with(&lib, "JavaScript Definitive", books(), SearchOptions::new().operator("and"));
    assert_eq!(titles(&results), vec!["JavaScript: The Definitive Guide"]);
}

#[test]
fn test_search_on_child_class() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, RecordSet::of("Novel"));
    let records = results.to_vec().unwrap();
    assert_eq!(records.len(), 8);
    assert!(records.iter().all(|r| r.model == "Novel"));
}

#[test]
fn test_search_child_class_field_from_parent() {
    let lib = library();
    let results = search(&lib, "Westeros", books());
    assert_eq!(
        title_set(&results),
        set(&["A Game of Thrones", "A Clash of Kings", "A Storm of Swords"])
    );
    let first = results.get(0).unwrap().unwrap();
    assert_eq!(first.model, "Book");
    assert!(first.get("setting").is_none());
}

#[test]
fn test_search_on_individual_field() {
    let lib = library();
    let options = SearchOptions::new().fields(["title"]).operator("or");
    let results = search_with(&lib, "Westeros Hobbit", books(), options);
    assert_eq!(titles(&results), vec!["The Hobbit"]);
}

#[test]
fn test_search_on_unknown_field() {
    let lib = library();
    let options = SearchOptions::new().fields(["unknown"]).operator("or");
    let err = lib.backend.search("Westeros Hobbit".into(), &books(), &options).unwrap_err();
    assert_eq!(err.field_error().unwrap().reason, FieldErrorReason::Unknown);
}

#[test]
fn test_search_on_non_searchable_field() {
    let lib = library();
    let options = SearchOptions::new().fields(["number_of_pages"]).operator("or");
    let err = lib.backend.search("Westeros Hobbit".into(), &books(), &options).unwrap_err();
    assert_eq!(err.field_error().unwrap().reason, FieldErrorReason::NotSearchable);
}

#[test]
fn test_search_on_related_fields() {
    let lib = library();
    let results = search(&lib, "Bilbo Baggins", RecordSet::of("Novel"));
    assert_eq!(
        title_set(&results),
        set(&[
            "The Hobbit",
            "The Fellowship of the Ring",
            "The Two Towers",
            "The Return of the King"
        ])
    );
}

#[test]
fn test_search_boosting_on_related_fields() {
    let lib = library();
    let results = titles(&search(&lib, "Bilbo Baggins", RecordSet::of("Novel")));
    assert_eq!(results[0], "The Hobbit");
    // equally scored, so ordered by primary key
    assert_eq!(
        &results[1..],
        &["The Fellowship of the Ring", "The Two Towers", "The Return of the King"]
    );
}

#[test]
fn test_search_on_related_field_path() {
    let lib = library();
    let options = SearchOptions::new().fields(["authors"]);
    let results = search_with(&lib, "Tolkien", books(), options);
    assert_eq!(results.count().unwrap(), 4);

    let options = SearchOptions::new().fields(["title"]);
    assert!(search_with(&lib, "Tolkien", books(), options).is_empty().unwrap());
}

#[test]
fn test_search_callable_field() {
    let lib = library();
    let results = search(&lib, "Python", books());
    assert_eq!(
        title_set(&results),
        set(&["Learning Python", "Two Scoops of Django 1.11"])
    );
}

#[test]
fn test_search_unknown_model() {
    let lib = library();
    let err = lib
        .backend
        .search("anything".into(), &RecordSet::of("Magazine"), &SearchOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownModel(_)));
}

#[test]
fn test_search_supertype_without_own_fields() {
    let schema = SchemaBuilder::new()
        .model(ModelSpec::new("Item").field(FieldSpec::filter("shelf")))
        .model(ModelSpec::new("Map").extends("Item").field(FieldSpec::search("region")))
        .model(ModelSpec::new("Shelf").field(FieldSpec::filter("label")))
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new(Arc::new(schema)));
    store.insert(Record::new("Map", 1).with("region", "Westeros").with("shelf", 3)).unwrap();
    store.insert(Record::new("Item", 2).with("shelf", 3)).unwrap();
    store.insert(Record::new("Shelf", 1).with("label", "Westeros")).unwrap();

    let backend = DatabaseSearchBackend::new(store.clone());
    let stats = update_index(&backend, store.as_ref(), 10).unwrap();
    assert_eq!(stats.models, vec!["Item"]);

    let run = |model: &str| {
        backend
            .search("Westeros".into(), &RecordSet::of(model), &SearchOptions::new())
            .unwrap()
    };
    assert_eq!(run("Map").count().unwrap(), 1);
    let found = run("Item").to_vec().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!((found[0].model.as_str(), found[0].pk), ("Item", 1));

    // filterable fields alone do not make a type searchable
    assert!(backend.get_index_for_model("Shelf").unwrap().is_none());
    assert!(run("Shelf").is_empty().unwrap());
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_filter_exact_value() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, books().filter("number_of_pages", Lookup::exact(440)));
    assert_eq!(
        title_set(&results),
        set(&["The Return of the King", "The Rust Programming Language"])
    );
}

#[test]
fn test_filter_exact_value_on_parent_model_field() {
    let lib = library();
    let records = RecordSet::of("Novel").filter("number_of_pages", Lookup::exact(440));
    assert_eq!(titles(&search(&lib, MATCH_ALL, records)), vec!["The Return of the King"]);
}

#[test]
fn test_filter_lt() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, books().filter("number_of_pages", Lookup::lt(440)));
    assert_eq!(
        title_set(&results),
        set(&[
            "The Hobbit",
            "JavaScript: The good parts",
            "The Fellowship of the Ring",
            "Foundation",
            "The Two Towers"
        ])
    );
}

#[test]
fn test_filter_lte() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, books().filter("number_of_pages", Lookup::lte(440)));
    assert_eq!(
        title_set(&results),
        set(&[
            "The Return of the King",
            "The Rust Programming Language",
            "The Hobbit",
            "JavaScript: The good parts",
            "The Fellowship of the Ring",
            "Foundation",
            "The Two Towers"
        ])
    );
}

#[test]
fn test_filter_gt() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, books().filter("number_of_pages", Lookup::gt(440)));
    assert_eq!(
        title_set(&results),
        set(&[
            "JavaScript: The Definitive Guide",
            "Learning Python",
            "A Clash of Kings",
            "A Game of Thrones",
            "Two Scoops of Django 1.11",
            "A Storm of Swords"
        ])
    );
}

#[test]
fn test_filter_gte() {
    let lib = library();
    let results = search(&lib, MATCH_ALL, books().filter("number_of_pages", Lookup::gte(440)));
    assert_eq!(results.count().unwrap(), 8);
    assert!(title_set(&results).contains("The Rust Programming Language"));
}

#[test]
fn test_filter_in_list() {
    let lib = library();
    let records = books().filter("number_of_pages", Lookup::is_in(vec![440, 1160]));
    assert_eq!(
        title_set(&search(&lib, MATCH_ALL, records)),
        set(&["The Return of the King", "The Rust Programming Language", "Learning Python"])
    );
}

#[test]
fn test_filter_in_iterator() {
    let lib = library();
    let records = books().filter("number_of_pages", Lookup::is_in([440, 1160].into_iter()));
    assert_eq!(search(&lib, MATCH_ALL, records).count().unwrap(), 3);
}

#[test]
fn test_filter_in_values_subquery() {
    let lib = library();
    let values = books()
        .filter("number_of_pages", Lookup::lt(440))
        .values_of("number_of_pages");
    let records = books().filter("number_of_pages", Lookup::in_subquery(values));
    assert_eq!(
        title_set(&search(&lib, MATCH_ALL, records)),
        set(&[
            "The Hobbit",
            "JavaScript: The good parts",
            "The Fellowship of the Ring",
            "Foundation",
            "The Two Towers"
        ])
    );
}

#[test]
fn test_filter_isnull_true() {
    let lib = library();
    let records = RecordSet::of("Author").filter("date_of_birth", Lookup::is_null(true));
    assert_eq!(
        name_set(&search(&lib, MATCH_ALL, records)),
        set(&[
            "David Ascher",
            "Mark Lutz",
            "David Flanagan",
            "Douglas Crockford",
            "Daniel Roy Greenfeld",
            "Audrey Roy Greenfeld",
            "Carol Nichols",
            "Steve Klabnik"
        ])
    );
}

#[test]
fn test_filter_isnull_false() {
    let lib = library();
    let records = RecordSet::of("Author").filter("date_of_birth", Lookup::is_null(false));
    assert_eq!(
        name_set(&search(&lib, MATCH_ALL, records)),
        set(&["Isaac Asimov", "George R.R. Martin", "J. R. R. Tolkien"])
    );
}

#[test]
fn test_filter_prefix() {
    let lib = library();
    let records = books().filter("title", Lookup::starts_with("Th"));
    assert_eq!(
        title_set(&search(&lib, MATCH_ALL, records)),
        set(&[
            "The Hobbit",
            "The Fellowship of the Ring",
            "The Two Towers",
            "The Return of the King",
            "The Rust Programming Language"
        ])
    );
}

#[test]
fn test_filter_and_operator() {
    let lib = library();
    let records = books().filter("number_of_pages", Lookup::exact(440))
        & books().filter("publication_date", Lookup::exact(date(1955, 10, 20)));
    assert_eq!(titles(&search(&lib, MATCH_ALL, records)), vec!["The Return of the King"]);
}

#[test]
fn test_filter_or_operator() {
    let lib = library();
    let records = books().filter("number_of_pages", Lookup::exact(440))
        | books().filter("number_of_pages", Lookup::exact(1160));
    assert_eq!(
        title_set(&search(&lib, MATCH_ALL, records)),
        set(&["Learning Python", "The Return of the King", "The Rust Programming Language"])
    );
}

#[test]
fn test_filter_on_non_filterable_field() {
    let lib = library();
    let records = RecordSet::of("Author").filter("name", Lookup::starts_with("Issac"));
    let err = lib
        .backend
        .search(MATCH_ALL.into(), &records, &SearchOptions::new())
        .unwrap_err();
    assert_eq!(err.field_error().unwrap().reason, FieldErrorReason::NotFilterable);
}

#[test]
fn test_filter_combined_with_text() {
    let lib = library();
    let records = books().exclude("number_of_pages", Lookup::gt(440));
    assert_eq!(titles(&search(&lib, "JavaScript", records)), vec!["JavaScript: The good parts"]);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_order_by_relevance() {
    let lib = library();
    let results = search_with(&lib, MATCH_ALL, novels_by_pages(), unranked());
    assert_eq!(
        titles(&results),
        vec![
            "Foundation",
            "The Hobbit",
            "The Two Towers",
            "The Fellowship of the Ring",
            "The Return of the King",
            "A Game of Thrones",
            "A Clash of Kings",
            "A Storm of Swords"
        ]
    );
}

#[test]
fn test_explicit_ordering_beats_relevance() {
    let lib = library();
    let results = search(&lib, "Bilbo Baggins", novels_by_pages());
    assert_eq!(
        titles(&results),
        vec![
            "The Hobbit",
            "The Two Towers",
            "The Fellowship of the Ring",
            "The Return of the King"
        ]
    );
}

#[test]
fn test_unranked_text_search_in_pk_order() {
    let lib = library();
    let results = search_with(&lib, "JavaScript Definitive", books(), unranked());
    assert_eq!(
        titles(&results),
        vec!["JavaScript: The Definitive Guide", "JavaScript: The good parts"]
    );
    let results = search_with(&lib, "Westeros Python", books(), unranked());
    let pks: Vec<u64> = results.to_vec().unwrap().iter().map(|r| r.pk).collect();
    assert_eq!(pks, vec![6, 7, 8, 9, 12]);
}

#[test]
fn test_order_by_non_filterable_field() {
    let lib = library();
    let records = RecordSet::of("Author").order_by(["name"]);
    let err = lib
        .backend
        .search(MATCH_ALL.into(), &records, &unranked())
        .unwrap_err();
    assert!(err.is_field_error());
}

// ============================================================================
// Slicing
// ============================================================================

#[test]
fn test_single_result() {
    let lib = library();
    let results = search_with(&lib, MATCH_ALL, novels_by_pages(), unranked());
    assert_eq!(results.get(0).unwrap().unwrap().get("title"), Some(&"Foundation".into()));
    assert_eq!(results.get(1).unwrap().unwrap().get("title"), Some(&"The Hobbit".into()));
    assert!(results.get(8).unwrap().is_none());
}

#[test]
fn test_limit() {
    let lib = library();
    let results = search_with(&lib, MATCH_ALL, novels_by_pages(), unranked());
    let pks: Vec<_> = results.slice(..3).unwrap().into_iter().map(|r| r.pk).collect();
    assert_eq!(pks, vec![5, 1, 3]);
}

#[test]
fn test_offset() {
    let lib = library();
    let results = search_with(&lib, MATCH_ALL, novels_by_pages(), unranked());
    let pks: Vec<_> = results.slice(3..).unwrap().into_iter().map(|r| r.pk).collect();
    assert_eq!(pks, vec![2, 4, 6, 7, 8]);
}

#[test]
fn test_offset_and_limit() {
    let lib = library();
    let results = search_with(&lib, MATCH_ALL, novels_by_pages(), unranked());
    let pks: Vec<_> = results.slice(3..6).unwrap().into_iter().map(|r| r.pk).collect();
    assert_eq!(pks, vec![2, 4, 6]);
    assert_eq!(results.count().unwrap(), 8);
}

// ============================================================================
// Index maintenance
// ============================================================================

#[test]
fn test_same_rank_pages() {
    let lib = library();
    let index = lib.backend.get_index_for_model("Book").unwrap().unwrap();
    let mut same_rank = BTreeSet::new();
    for i in 0..10u64 {
        let record = Record::new("Book", 100 + i)
            .with("title", format!("Rank {}", i))
            .with("publication_date", date(2017, 10, 18))
            .with("number_of_pages", 100);
        lib.store.insert(record.clone()).unwrap();
        index.add_item(&record).unwrap();
        same_rank.insert(record.pk);
    }
    index.refresh().unwrap();

    let results = search(&lib, "Rank", books());
    let mut across_pages = BTreeSet::new();
    for i in 0..same_rank.len() {
        let page = results.slice(i..i + 1).unwrap();
        assert_eq!(page.len(), 1);
        assert!(across_pages.insert(page[0].pk), "record repeated across pages");
    }
    assert_eq!(across_pages, same_rank);
}

#[test]
fn test_delete() {
    let lib = library();
    let foundation = lib.store.get("Novel", 5).unwrap().unwrap();

    let index = lib.backend.get_index_for_model("Novel").unwrap().unwrap();
    index.delete_item(&foundation).unwrap();
    index.refresh().unwrap();
    lib.store.delete("Novel", 5).unwrap();

    let results = search_with(&lib, MATCH_ALL, novels_by_pages(), unranked());
    let page: Vec<_> = results.slice(..3).unwrap().into_iter().map(|r| r.pk).collect();
    assert_eq!(page, vec![1, 3, 2]);
}

#[test]
fn test_deleted_from_index_only() {
    let lib = library();
    let foundation = lib.store.get("Novel", 5).unwrap().unwrap();
    lib.backend.delete(&foundation).unwrap();

    // still in the store, no longer searchable
    let results = search(&lib, "Foundation", books());
    assert!(results.is_empty().unwrap());
    assert_eq!(search(&lib, MATCH_ALL, books()).count().unwrap(), 12);
}

#[test]
fn test_results_follow_index_updates() {
    let lib = library();
    let results = search(&lib, "Silmarillion", books());
    assert!(results.is_empty().unwrap());

    let record = Record::new("Novel", 20)
        .with("title", "The Silmarillion")
        .with("number_of_pages", 365);
    lib.store.insert(record.clone()).unwrap();
    lib.backend.add(&record).unwrap();
    assert_eq!(results.count().unwrap(), 1);
}

// ============================================================================
// Query classes
// ============================================================================

#[test]
fn test_match_all() {
    let lib = library();
    assert_eq!(search(&lib, MATCH_ALL, books()).len().unwrap(), 13);
}

#[test]
fn test_term() {
    let lib = library();
    let results = search(&lib, Query::term("javascript"), books());
    assert_eq!(
        title_set(&results),
        set(&["JavaScript: The Definitive Guide", "JavaScript: The good parts"])
    );
}

#[test]
fn test_and() {
    let lib = library();
    let query = Query::and([Query::term("javascript"), Query::term("definitive")]);
    assert_eq!(titles(&search(&lib, query, books())), vec!["JavaScript: The Definitive Guide"]);

    let query = Query::term("javascript") & Query::term("definitive");
    assert_eq!(titles(&search(&lib, query, books())), vec!["JavaScript: The Definitive Guide"]);
}

#[test]
fn test_or() {
    let lib = library();
    let query = Query::or([Query::term("hobbit"), Query::term("towers")]);
    assert_eq!(title_set(&search(&lib, query, books())), set(&["The Hobbit", "The Two Towers"]));

    let query = Query::term("hobbit") | Query::term("towers");
    assert_eq!(title_set(&search(&lib, query, books())), set(&["The Hobbit", "The Two Towers"]));
}

#[test]
fn test_not() {
    let lib = library();
    let others = set(&[
        "A Clash of Kings",
        "A Game of Thrones",
        "A Storm of Swords",
        "Foundation",
        "Learning Python",
        "The Hobbit",
        "The Two Towers",
        "The Fellowship of the Ring",
        "The Return of the King",
        "The Rust Programming Language",
        "Two Scoops of Django 1.11",
    ]);

    let results = search(&lib, Query::not(Query::term("javascript")), books());
    assert_eq!(title_set(&results), others);

    let results = search(&lib, !Query::term("javascript"), books());
    assert_eq!(title_set(&results), others);
}

#[test]
fn test_operators_combination() {
    let lib = library();
    let query = ((Query::term("javascript") & !Query::term("definitive"))
        | Query::term("python")
        | Query::term("rust"))
        | Query::term("two");
    assert_eq!(
        title_set(&search(&lib, query, books())),
        set(&[
            "JavaScript: The good parts",
            "Learning Python",
            "The Two Towers",
            "The Rust Programming Language",
            "Two Scoops of Django 1.11"
        ])
    );
}

#[test]
fn test_plain_text_single_word() {
    let lib = library();
    let query = Query::plain_text("Javascript", "or").unwrap();
    assert_eq!(search(&lib, query, books()).count().unwrap(), 2);
}

#[test]
fn test_plain_text_multiple_words_or() {
    let lib = library();
    let query = Query::plain_text("Javascript Definitive", "or").unwrap();
    assert_eq!(
        title_set(&search(&lib, query, books())),
        set(&["JavaScript: The Definitive Guide", "JavaScript: The good parts"])
    );
}

#[test]
fn test_plain_text_multiple_words_and() {
    let lib = library();
    let query = Query::plain_text("Javascript Definitive", "and").unwrap();
    assert_eq!(titles(&search(&lib, query, books())), vec!["JavaScript: The Definitive Guide"]);
}

#[test]
fn test_plain_text_operator_case() {
    let lib = library();
    for operator in ["AND", "aNd"] {
        let query = Query::plain_text("Guide", operator).unwrap();
        assert_eq!(titles(&search(&lib, query, books())), vec!["JavaScript: The Definitive Guide"]);

        let options = SearchOptions::new().operator(operator);
        assert_eq!(
            titles(&search_with(&lib, "Guide", books(), options)),
            vec!["JavaScript: The Definitive Guide"]
        );
    }
}

#[test]
fn test_plain_text_invalid_operator() {
    let lib = library();
    assert!(Query::plain_text("Guide", "xor").unwrap_err().is_invalid_value());

    let options = SearchOptions::new().operator("xor");
    let err = lib.backend.search("Guide".into(), &books(), &options).unwrap_err();
    assert!(err.is_invalid_value());
}

#[test]
fn test_filter_query() {
    let lib = library();
    let query = Query::filter(Query::term("javascript"), None, None);
    assert_eq!(search(&lib, query, books()).count().unwrap(), 2);

    let query = Query::filter(Query::term("javascript"), Some(Query::term("definitive")), None);
    assert_eq!(titles(&search(&lib, query, books())), vec!["JavaScript: The Definitive Guide"]);

    let query = Query::filter(
        Query::term("javascript"),
        Some(Query::term("definitive")),
        Some(Query::term("guide")),
    );
    assert!(search(&lib, query, books()).is_empty().unwrap());
}

#[test]
fn test_filter_include_does_not_score() {
    let lib = library();
    let plain = search(&lib, Query::term("javascript"), books()).hits().unwrap();
    let filtered = search(
        &lib,
        Query::filter(Query::term("javascript"), Some(Query::term("definitive")), None),
        books(),
    )
    .hits()
    .unwrap();
    let definitive = plain.iter().find(|h| h.record.pk == 10).unwrap();
    assert!((filtered[0].score - definitive.score).abs() < 1e-6);
}

#[test]
fn test_boost_changes_ranking() {
    let lib = library();
    let query = Query::term("javascript") | Query::boost(Query::term("parts"), 10.0);
    assert_eq!(titles(&search(&lib, query, books()))[0], "JavaScript: The good parts");

    let err = lib
        .backend
        .search(Query::boost(Query::term("parts"), f32::NAN).into(), &books(), &SearchOptions::new())
        .unwrap_err();
    assert!(err.is_invalid_value());
}
