//! Collapsible JSON tree model and a tiered URL retrieval pipeline.

pub mod config;
pub mod document;
pub mod fetch;
pub mod file;
pub mod logging;
pub mod node;
pub mod path;
pub mod relay;
pub mod state;
pub mod strategy;
pub mod transport;
pub mod tree;
pub mod types;

pub use crate::document::{Document, ParseError, ViewOptions};
pub use crate::fetch::{AggregateError, Attempt, AttemptOutcome, RetrieveError, Retrieved, Retriever};
pub use crate::path::{NodePath, Segment};
pub use crate::state::{AppState, RequestToken, SessionError};
pub use crate::strategy::{Strategy, StrategyId, ThirdPartyService};
pub use crate::transport::{HttpTransport, Transport, TransportError, TransportResponse};
pub use crate::types::{ChildPage, NodeKind, RenderNode};
