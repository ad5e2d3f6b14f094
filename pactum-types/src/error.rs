//! Error taxonomy shared by the broker and its callers.

use thiserror::Error;

/// Result type for broker and model operations.
pub type PactumResult<T> = Result<T, PactumError>;

/// Errors produced while building the model or deciding a connection request.
///
/// Per-request failures (`Disabled` through `PolicyViolation`) are always
/// recoverable by the caller. `MalformedPolicySet` and
/// `ConnectionTypeAmbiguity` are configuration errors raised at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PactumError {
    /// New connections are switched off by flags.
    #[error("disabled: {0}")]
    Disabled(String),

    /// The requester did not declare the connection it asked for.
    #[error("requested connection {connection} is not declared as required by requester {requester}")]
    ConnectionNotDeclared {
        connection: String,
        requester: String,
    },

    /// No registered provider serves the requested connection.
    #[error("no connection provider found for {0}")]
    ConnectionProviderNotFound(String),

    /// The request named a policy that was not registered ahead of time.
    #[error("policy {0} was not registered ahead of time")]
    PolicyNotFound(String),

    /// The policy engine rejected the request.
    #[error("policy violation: [{}]", .0.join(", "))]
    PolicyViolation(Vec<String>),

    /// One or more registered policies fail the conformance rules.
    #[error("malformed policies found: {}", .0.join(", "))]
    MalformedPolicySet(Vec<String>),

    /// Two providers claim the same connection name.
    #[error("connection {connection} supported more than once by providers: {}", .providers.join(", "))]
    ConnectionTypeAmbiguity {
        connection: String,
        providers: Vec<String>,
    },

    /// Two different descriptors share one name.
    #[error("data type descriptor {0} must be unique")]
    DuplicateDescriptor(String),

    /// A descriptor lookup by name failed.
    #[error("no data type descriptor named {0}")]
    DescriptorNotFound(String),

    /// A field path does not resolve within a descriptor.
    #[error("field '{field}' not found in '{descriptor}'")]
    FieldNotFound { descriptor: String, field: String },

    /// A policy could not be built.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}
