pub mod generate;

pub use generate::PathEnumerator;
