// ── List storage ──
//
// Collections, payload normalization, and the filter/sort projection
// the list views are built on.

pub mod collection;
pub mod load;
pub mod projection;

pub use collection::{Collection, Patch};
pub use load::normalize_list;
pub use projection::{ListQuery, SortDirection, SortSpec, StatusFilter, project};
