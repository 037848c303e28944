//! List stores and their query builder.

mod operations;
mod query;
mod sort;
mod store;

pub use operations::{apply_list_operation, ListOperation};
pub use query::{EmptySequence, ListQuery};
pub use sort::{order_values, Comparator, Direction, OrderSpec, SortAlgorithm, Sorter};
pub use store::ListStore;
