pub mod jql;

pub use jql::SearchQuery;
