use bookshelf_core::{Config, Library, SqliteLibrary};

/// Shared application state
pub struct AppState {
    config: Config,
    library: Library<SqliteLibrary>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteLibrary) -> Self {
        let library = Library::new(store, config.similarity);
        Self { config, library }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &Library<SqliteLibrary> {
        &self.library
    }
}
