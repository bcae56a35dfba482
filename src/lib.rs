//! Resilient crawler for paginated review listings.
//!
//! Listing pages are walked until no next-page link remains. Every review's
//! detail page is fetched through rotating proxy/User-Agent identities, merged
//! with its listing row by position and appended to a versioned CSV file.

pub mod app;

pub use app::*;
