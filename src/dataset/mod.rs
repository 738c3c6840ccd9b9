mod labels;
mod missing;
mod variables;

pub use labels::Category;
pub use missing::{Code, MAX_TAGS, MissingSpec, Missingness, tag_for_index};
pub use variables::{Alignment, ColumnSchema, DeclaredKind, StorageKind};
