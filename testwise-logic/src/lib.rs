#![warn(missing_docs)]
//! Testwise Logic - Method Selection
//!
//! Maps diagnostic flags (normality, homogeneity of variance) and the design
//! description (hierarchy, pairing, group count) to one method of a closed
//! catalog, with advice explaining the choice.

mod context;
mod selector;

pub use context::SelectorContext;
pub use selector::{
    Method, MethodRecommendation, ParseMethodError, recommend, recommend_from_verdicts,
};
