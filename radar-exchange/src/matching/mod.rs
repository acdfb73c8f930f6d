//! Filter language.
//!
//! [`Filter`] is the configuration-facing tree; [`Filter::compile`] lowers it into an
//! [`Expression`] that [`matches`] evaluates against a file's [`Metadata`](crate::Metadata).
//!
//! ```
//! use radar_exchange::matching::{matches, Filter, Operator, ValueType};
//! use radar_exchange::Metadata;
//!
//! let filter = Filter::attribute("/what/object", Operator::Eq, ValueType::String, "PVOL".into());
//! let metadata = Metadata::new().with_attribute("/what/object", "PVOL");
//!
//! assert!(matches(&metadata, &filter.compile()));
//! ```

mod expression;
mod filter;
mod matcher;

pub use expression::{Expression, Operator, Value, ValueType};
pub use filter::Filter;
pub use matcher::{evaluate, matches};
