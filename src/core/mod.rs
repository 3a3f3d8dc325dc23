pub mod envelope;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod graph;
pub mod headers;
pub mod result;

pub use envelope::{BatchEnvelope, EnvelopeValidator, RawEnvelope, SubRequest, SubRequestSpec};
pub use error::BatchError;
pub use executor::{BatchExecutor, ExecutorSettings};
pub use gateway::BatchGateway;
pub use graph::DependencyGraph;
pub use headers::{HeaderPolicy, resolve_headers};
pub use result::{BatchResult, ExecutionResult, FailureKind};
