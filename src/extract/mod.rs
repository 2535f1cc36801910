// Page text extraction: the boundary with the file-format world.
//
// The core never parses documents itself. It asks a PageExtractor for one
// string per page and treats any failure as "this document has no text".

pub mod pdf;
pub mod text;
pub mod traits;

pub use traits::{ExtensionExtractor, PageExtractor};
