//! File system abstractions for the browser.
//!
//! This module provides the entry and page types ([`entry::FileEntry`],
//! [`page::PageContent`]), logical path helpers ([`paths`]), listing
//! resolution against a backend ([`listing::ListingResolver`]) and upload
//! preparation ([`upload`]).

pub mod entry;
pub mod listing;
pub mod page;
pub mod paths;
pub mod upload;

pub use entry::{EntryType, FileEntry};
pub use listing::ListingResolver;
pub use page::{FileReader, PageBody, PageContent};
pub use upload::UploadProgress;
