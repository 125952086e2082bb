//! Core module - fundamental types and the lifecycle engine

pub mod association;
pub mod changelog;
pub mod config;
pub mod entity;
pub mod flow;
pub mod identity;
pub mod loader;
pub mod pricing;
pub mod quote_flow;
pub mod store;
pub mod workorder_flow;
pub mod workspace;
pub mod yaml_store;

pub use association::{AssociationManager, AssociationOutcome};
pub use changelog::{ChangeAction, ChangeLogEntry, EntityKind, FieldResolvers, ItemRef};
pub use config::Config;
pub use entity::{Auditable, Entity};
pub use flow::{EvidenceItem, FlowError, TransitionCtx};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use pricing::{PricingError, Totals, MONEY_EPSILON};
pub use quote_flow::{PricingPatch, QuoteOutcome};
pub use store::{MemStore, Store, StoreError, WriteBatch};
pub use workorder_flow::{WorkOrderOutcome, WorkOrderPatch};
pub use workspace::{Workspace, WorkspaceError};
pub use yaml_store::YamlStore;
