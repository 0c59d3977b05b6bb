pub mod document;
pub mod extractor;
pub mod product;
pub mod record;
pub mod rule;

pub use document::HtmlDocument;
pub use extractor::extract_into;
pub use product::product_rules;
pub use record::{Record, PRODUCT_FIELDS};
pub use rule::FieldRule;
