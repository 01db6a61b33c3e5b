//! Hook system: extension point definitions, handler types, tiered store, and dispatcher.

pub mod definitions;
pub mod dispatcher;
pub mod handler;
pub mod store;

pub use definitions::{Cardinality, ExtensionPoint, Interaction, ParseError, PrecedenceFamily};
pub use dispatcher::{HandlerDispatcher, ValidationReport};
pub use handler::{Handler, HandlerEntry};
pub use store::{GLOBAL, HandlerStore, ScopeKey, WILDCARD};
