pub mod books;
pub mod genres;
pub mod handlers;
pub mod middleware;
pub mod reports;
pub mod routes;
pub mod similarity;

pub use routes::create_router;
