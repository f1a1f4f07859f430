pub mod blame;
pub mod heuristic;
pub mod record;
pub mod resolver;
pub mod store;
