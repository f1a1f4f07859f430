pub mod refs;
pub mod repository;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use repository::{Repository, find_repository, find_repository_in_path};
