//! Feature slices, each with its own domain, application, infrastructure,
//! and ports layers as applicable.

pub mod basis;
pub mod dag;
pub mod enumerator;
pub mod feasibility;
pub mod ilp;
