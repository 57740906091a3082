//! Core types shared by every part of the pipeline

pub mod context;
pub mod diagnostics;
pub mod envelope;
pub mod error;

pub use context::{Bucket, RequestContext, RequestMeta, UploadedFile};
pub use diagnostics::{
    DiagLevel, DiagnosticRecord, Diagnostics, RecordingDiagnostics, TracingDiagnostics,
};
pub use envelope::{ErrorEnvelope, SuccessEnvelope, is_success_envelope};
pub use error::{
    AttachmentError, ConfigurationError, PipelineError, PipelineResult, ResponseContractError,
    ValidationFailure,
};
