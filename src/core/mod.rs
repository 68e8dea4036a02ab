pub mod db;
pub mod errors;
pub mod helpers;
pub mod pagination;
pub mod query_params;
pub mod store;
