pub mod analysis;
pub mod note;
pub mod query;
