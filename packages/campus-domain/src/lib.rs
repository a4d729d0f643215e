pub mod amount;
pub mod college;
pub mod filter;
pub mod location;

pub use college::{CollegeRecord, Ownership, RecordBuilder, RecordId};
pub use filter::{Attribute, Bound, Constraint, FilterOutcome, NumericRange, QueryFilter};
