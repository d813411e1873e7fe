pub mod identifiers;
pub mod selection_set;

pub use identifiers::{AlgorithmVersion, DocumentId, DocumentIdError, JobId};
pub use selection_set::{
    CategoryBalance, QueryContext, SelectedEntry, SelectionFlags, SelectionRequest, SelectionSet,
};
