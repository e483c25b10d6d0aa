use std::fmt;

/// Domain failures raised by the engine. They travel inside `anyhow::Error`;
/// use [`BulletinError::find`] to recover them through any added context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulletinError {
    ReferenceNotFound { kind: &'static str, name: String },
    MissingInput { template: String, input: String },
    UnrecognizedShape { context: String },
    UnsupportedDecoratorTarget { decorator: String, shape: String },
    TypeMismatchOnUpdate { name: String, old: String, new: String },
    JobOrStepNotFound { kind: &'static str, name: String },
    InvalidDocument { message: String },
}

impl BulletinError {
    pub fn invalid(message: impl Into<String>) -> Self {
        BulletinError::InvalidDocument {
            message: message.into(),
        }
    }

    pub fn find(err: &anyhow::Error) -> Option<&BulletinError> {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<BulletinError>())
    }
}

impl fmt::Display for BulletinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulletinError::ReferenceNotFound { kind, name } => {
                write!(f, "no referenced {kind} definition: {name}")
            }
            BulletinError::MissingInput { template, input } => {
                write!(f, "template '{template}' requires input '{input}'")
            }
            BulletinError::UnrecognizedShape { context } => {
                write!(f, "unrecognized step shape: {context}")
            }
            BulletinError::UnsupportedDecoratorTarget { decorator, shape } => {
                write!(f, "decorator '{decorator}' cannot decorate a {shape} step")
            }
            BulletinError::TypeMismatchOnUpdate { name, old, new } => {
                write!(f, "cannot update '{name}' of type '{old}' with type '{new}'")
            }
            BulletinError::JobOrStepNotFound { kind, name } => {
                write!(f, "could not find {kind}: {name}")
            }
            BulletinError::InvalidDocument { message } => write!(f, "invalid document: {message}"),
        }
    }
}

impl std::error::Error for BulletinError {}
