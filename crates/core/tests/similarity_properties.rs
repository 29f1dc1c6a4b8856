//! Similarity relation properties, checked against both store backends.

use std::collections::{BTreeMap, BTreeSet};

use bookshelf_core::testing::{fixtures, InMemoryLibrary};
use bookshelf_core::{
    BatchError, BookId, EngineError, GenreId, Library, LibraryError, RecomputeMode,
    RecomputeStatus, SimilarityConfig, SimilarityEngine, SqliteLibrary, Transactional,
};

fn sqlite_library(config: SimilarityConfig) -> Library<SqliteLibrary> {
    Library::new(SqliteLibrary::in_memory().unwrap(), config)
}

fn memory_library(config: SimilarityConfig) -> Library<InMemoryLibrary> {
    Library::new(InMemoryLibrary::new(), config)
}

fn manual_sync() -> SimilarityConfig {
    SimilarityConfig {
        sync_on_save: false,
        ..SimilarityConfig::default()
    }
}

/// Every stored edge, read back through `similar_books`.
fn edges<S: Transactional>(library: &Library<S>) -> BTreeSet<(BookId, BookId)> {
    let mut edges = BTreeSet::new();
    for book in library.books().unwrap() {
        for other in library.similar_books(book.id).unwrap() {
            edges.insert((book.id, other.id));
        }
    }
    edges
}

/// A catalog of `per_genre` books in each of `genres` genres.
fn seed<S: Transactional>(
    library: &Library<S>,
    genres: usize,
    per_genre: usize,
) -> BTreeMap<BookId, GenreId> {
    let mut genre_of = BTreeMap::new();
    for g in 0..genres {
        let genre = library.create_genre(&format!("Genre {}", g)).unwrap();
        for i in 0..per_genre {
            let book = library
                .add_book(&fixtures::new_book(&format!("Book {}-{}", g, i), genre.id))
                .unwrap();
            genre_of.insert(book.id, genre.id);
        }
    }
    genre_of
}

fn sync_one<S: Transactional>(library: &Library<S>, id: BookId) -> usize {
    let book = library.book(id).unwrap();
    library
        .store()
        .transaction(|uow| {
            SimilarityEngine::new(uow.catalog(), uow.similarity())
                .sync_pairwise(&book)
                .map_err(BatchError::from)
        })
        .unwrap()
        .edges_written
}

macro_rules! on_both_backends {
    ($check:ident) => {
        mod $check {
            use super::*;

            #[test]
            fn sqlite() {
                super::$check(sqlite_library);
            }

            #[test]
            fn in_memory() {
                super::$check(memory_library);
            }
        }
    };
}

// =============================================================================
// Invariants
// =============================================================================

fn symmetric_irreflexive_and_genre_exclusive<S: Transactional>(
    make: fn(SimilarityConfig) -> Library<S>,
) {
    let library = make(SimilarityConfig::default());
    let genre_of = seed(&library, 3, 4);
    let edges = edges(&library);

    assert_eq!(edges.len(), 3 * 4 * 3);
    for &(a, b) in &edges {
        assert_ne!(a, b, "self edge on {}", a);
        assert!(edges.contains(&(b, a)), "missing reverse of {} -> {}", a, b);
        assert_eq!(genre_of[&a], genre_of[&b]);
    }
}
on_both_backends!(symmetric_irreflexive_and_genre_exclusive);

fn incremental_matches_recompute<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(SimilarityConfig::default());
    seed(&library, 2, 3);
    let incremental = edges(&library);

    let outcome = library.recompute().unwrap();

    assert_eq!(outcome.status, RecomputeStatus::Completed);
    assert_eq!(outcome.edges_removed, incremental.len());
    assert_eq!(outcome.edges_written, incremental.len());
    assert_eq!(edges(&library), incremental);
}
on_both_backends!(incremental_matches_recompute);

fn recompute_is_idempotent<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let config = SimilarityConfig {
        recompute_mode: RecomputeMode::Append,
        sync_on_save: false,
    };
    let library = make(config);
    seed(&library, 2, 3);

    let first = library.recompute().unwrap();
    let after_first = edges(&library);
    let second = library.recompute().unwrap();

    assert_eq!(first.edges_written, 12);
    assert_eq!(second.edges_written, 0);
    assert_eq!(edges(&library), after_first);
}
on_both_backends!(recompute_is_idempotent);

fn genre_change_keeps_exclusivity<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(SimilarityConfig::default());
    let genre_of = seed(&library, 2, 2);
    let (&moved, &from) = genre_of.iter().next().unwrap();
    let to = genre_of.values().copied().find(|&g| g != from).unwrap();

    let book = library.book(moved).unwrap();
    let mut update = fixtures::new_book(&book.title, to);
    update.isbn = book.isbn;
    library.update_book(moved, &update).unwrap();

    for (a, b) in edges(&library) {
        assert_eq!(library.book(a).unwrap().genre_id, library.book(b).unwrap().genre_id);
    }
    assert_eq!(library.similar_books(moved).unwrap().len(), 2);
}
on_both_backends!(genre_change_keeps_exclusivity);

fn delete_leaves_no_dangling_edges<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(SimilarityConfig::default());
    let genre_of = seed(&library, 1, 3);
    let victim = *genre_of.keys().next().unwrap();

    library.delete_book(victim).unwrap();

    let edges = edges(&library);
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|&(a, b)| a != victim && b != victim));
    assert_eq!(library.stats().unwrap().similarity_edges, 2);
}
on_both_backends!(delete_leaves_no_dangling_edges);

// =============================================================================
// Scenarios
// =============================================================================

fn recompute_two_fiction_one_poetry<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(manual_sync());
    let fiction = library.create_genre("Fiction").unwrap();
    let poetry = library.create_genre("Poetry").unwrap();
    let a = library.add_book(&fixtures::new_book("A", fiction.id)).unwrap();
    let b = library.add_book(&fixtures::new_book("B", fiction.id)).unwrap();
    let c = library.add_book(&fixtures::new_book("C", poetry.id)).unwrap();

    library.recompute().unwrap();

    let ids = |id| -> Vec<BookId> {
        library
            .similar_books(id)
            .unwrap()
            .into_iter()
            .map(|book| book.id)
            .collect()
    };
    assert_eq!(ids(a.id), vec![b.id]);
    assert_eq!(ids(b.id), vec![a.id]);
    assert!(ids(c.id).is_empty());
}
on_both_backends!(recompute_two_fiction_one_poetry);

fn sync_after_second_insert<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(manual_sync());
    let fiction = library.create_genre("Fiction").unwrap();
    let a = library.add_book(&fixtures::new_book("A", fiction.id)).unwrap();

    assert_eq!(sync_one(&library, a.id), 0);
    assert!(edges(&library).is_empty());

    let b = library.add_book(&fixtures::new_book("B", fiction.id)).unwrap();
    assert_eq!(sync_one(&library, b.id), 2);
    assert_eq!(
        edges(&library),
        BTreeSet::from([(a.id, b.id), (b.id, a.id)])
    );
}
on_both_backends!(sync_after_second_insert);

fn resync_existing_edge_is_silent<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(SimilarityConfig::default());
    let fiction = library.create_genre("Fiction").unwrap();
    let a = library.add_book(&fixtures::new_book("A", fiction.id)).unwrap();
    library.add_book(&fixtures::new_book("B", fiction.id)).unwrap();
    let before = edges(&library);

    assert_eq!(sync_one(&library, a.id), 0);
    assert_eq!(edges(&library), before);
}
on_both_backends!(resync_existing_edge_is_silent);

fn empty_catalog_recompute<S: Transactional>(make: fn(SimilarityConfig) -> Library<S>) {
    let library = make(SimilarityConfig::default());

    let outcome = library.recompute().unwrap();

    assert_eq!(outcome.status, RecomputeStatus::EmptyCatalog);
    assert_eq!(outcome.edges_written, 0);
}
on_both_backends!(empty_catalog_recompute);

// =============================================================================
// Batch atomicity
// =============================================================================

#[test]
fn in_memory_recompute_failure_leaves_edges_untouched() {
    let library = memory_library(SimilarityConfig::default());
    seed(&library, 2, 3);
    let before = edges(&library);
    library.store().fail_on_write(5);

    let err = library.recompute().unwrap_err();

    assert!(matches!(
        err,
        LibraryError::Recompute(BatchError::Engine(EngineError::WriteEdge { .. }))
    ));
    assert_eq!(edges(&library), before);
}

#[test]
fn sqlite_recompute_failure_leaves_edges_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.db");
    let library = Library::new(
        SqliteLibrary::new(&path).unwrap(),
        SimilarityConfig::default(),
    );
    let genre_of = seed(&library, 2, 3);
    let before = edges(&library);
    let last = *genre_of.keys().last().unwrap();

    // Abort any edge write originating from the last book, mid-recompute.
    let saboteur = rusqlite::Connection::open(&path).unwrap();
    saboteur
        .execute_batch(&format!(
            "CREATE TRIGGER reject_edge BEFORE INSERT ON similar_books
             WHEN NEW.book_id = {}
             BEGIN SELECT RAISE(ABORT, 'edge rejected'); END;",
            last
        ))
        .unwrap();
    drop(saboteur);

    let err = library.recompute().unwrap_err();

    match err {
        LibraryError::Recompute(BatchError::Engine(EngineError::WriteEdge {
            subject_id, ..
        })) => assert_eq!(subject_id, last),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(edges(&library), before);
}
