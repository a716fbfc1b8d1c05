/// Catalog module
///
/// Read-only enumeration of the source tree: one directory per product,
/// image files directly inside each product directory.

pub mod scanner;
