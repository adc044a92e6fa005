//! Application layer: orchestration across domain logic and infrastructure I/O.

pub mod event_source;
pub mod lifecycle;
pub mod monitor;
pub mod registration;
pub mod signer;
pub mod submitter;

pub use event_source::{PollerSettings, RequestEventPoller};
pub use lifecycle::{CompositeObserver, LifecycleObserver, LoggingObserver, NoopObserver, SkipReason};
pub use monitor::{Dispatch, MonitorSettings, PendingGuard, RequestMonitor, RequestTracker};
pub use registration::{RegistrationCoordinator, RegistrationOutcome, RegistrationSettings};
pub use signer::{verify_response_signature, ResponseSigner};
pub use submitter::{
    SequenceLease, SequenceNumberManager, SubmissionCall, SubmissionOutcome, SubmitterSettings, TransactionSubmitter,
};
