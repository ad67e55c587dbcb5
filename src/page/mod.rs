pub mod container;
pub mod filter;
pub mod parser;

pub use container::{
    ElementId, HighlightPulse, ListingContainer, ListingElement, RotationBadge,
    SharedContainer,
};
pub use filter::{apply_filters, FilterConfig};
pub use parser::parse_listings;
