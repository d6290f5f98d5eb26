//! Membership subsystem.
//!
//! # Data Flow
//! ```text
//! node lifecycle events  → nodes.rs   (node → private IPs)
//! service (re)configured → routing.rs (service → load balancer, IP family)
//!
//! endpoint membership change (service, old nodes, new nodes)
//!     → diff.rs
//!         - drop if service unknown or not locally routed
//!         - resolve nodes → IPs (service's family only)
//!         - added / removed sets
//!     → AddIPs / RemoveIPs operations
//!     → reconciler queue
//! ```
//!
//! # Design Decisions
//! - Tables are concurrent maps shared by clone; callers never lock
//! - Service and node names are case-insensitive
//! - A membership event that races ahead of its routing entry is dropped, not buffered

pub mod diff;
pub mod events;
pub mod nodes;
pub mod routing;
pub mod service;

pub use diff::EndpointDiffEngine;
pub use events::{ClusterEvent, MembershipEvent};
pub use nodes::NodeIpResolver;
pub use routing::{ServiceRoute, ServiceRoutingTable};
pub use service::{backend_pool_name, IpFamily, ServiceName, ServiceNameError};
