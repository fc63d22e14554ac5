//! Configuration module

mod site;

pub use site::LabelsConfig;
pub use site::PrismicConfig;
pub use site::SiteConfig;
