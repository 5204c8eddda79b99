//! Card synergy graph: tag rules, construction, queries and caching

pub mod builder;
pub mod cache;
pub mod graph;
pub mod query;
pub mod rules;

pub use builder::{BuilderConfig, GraphBuilder, OVERLAP_SCALE, TRIBAL_LORD_WEIGHT, TRIBAL_SHARED_WEIGHT};
pub use cache::GraphCache;
pub use graph::{EdgeKind, SynergyEdge, SynergyGraph};
pub use query::{ComboChain, ComboChains, GraphStats, Neighbor, Suggestion, SynergyQuery};
pub use rules::{RuleSet, RULESET_VERSION};
