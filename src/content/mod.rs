//! Content module - post records, rich text, and the content source adapter

mod post;
mod prismic;
pub mod rich_text;
mod source;

pub use post::{PostDetail, PostSummary, RawImage, RawPage, RawPost, RawPostData, RawSection, Section};
pub use prismic::PrismicClient;
pub use rich_text::Block;
pub use source::{all_uids, ContentSource, HttpPageFetcher, PageFetcher};
