//! Entity type definitions
//!
//! FST manages the following entity types:
//!
//! **Reference data:**
//! - [`Client`] - Companies/accounts with locations and points of contact
//! - [`Technician`] - Field crew members assignable to work orders
//! - [`Material`] - Priced catalog items used on quotes and work orders
//!
//! **Work:**
//! - [`Quote`] - Priced proposals progressing through draft/sent/approved/
//!   rejected/expired/converted
//! - [`WorkOrder`] - Schedulable field work with an evidence bundle
//!   (photos, signature) required for completion
//! - [`Project`] - Groupings of related work orders for one client

pub mod client;
pub mod material;
pub mod project;
pub mod quote;
pub mod technician;
pub mod work_order;

pub use client::Client;
pub use material::Material;
pub use project::Project;
pub use quote::Quote;
pub use technician::Technician;
pub use work_order::WorkOrder;
