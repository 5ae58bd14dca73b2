pub mod cycle;
pub mod dates;
pub mod digest;
pub mod filter;
pub mod harvest;
pub mod notify;
pub mod report;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod text;
pub mod traits;
