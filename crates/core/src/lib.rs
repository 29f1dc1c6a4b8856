pub mod catalog;
pub mod config;
pub mod library;
pub mod metrics;
pub mod similarity;
pub mod store;
pub mod testing;

pub use catalog::{
    Book, BookId, BookQuery, CatalogReader, CatalogStats, CatalogStore, Genre, GenreId, NewBook,
    ValidationError,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ServerConfig, SimilarityConfig,
};
pub use library::{GenreReport, GenreReportRow, Library, LibraryError, LibraryStats};
pub use similarity::{
    BatchError, EngineError, RecomputeJob, RecomputeMode, RecomputeOutcome, RecomputeStatus,
    SimilarityEngine, SimilarityStore,
};
pub use store::{SqliteLibrary, StoreError, Transactional, UnitOfWork};
