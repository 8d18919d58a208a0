//! DOM snapshot module
//!
//! Pages are parsed with `scraper` and wrapped in a [`Page`] that carries the
//! document URL and any attached frame documents. All queries in the
//! detection and extraction layers go through the helpers in [`query`].
//! Elements that must be found again in a later snapshot are tracked with an
//! [`ElementHandle`].

pub mod handle;
pub mod page;
pub mod query;

pub use ego_tree::NodeId;
pub use handle::ElementHandle;
pub use page::{DomHost, FrameAccess, Page, StaticHost};
