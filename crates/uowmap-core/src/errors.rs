use thiserror::Error;
use uowmap_core_types::EntityId;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling and testing. Kinds fall into two families that callers
/// usually care about: configuration problems (never worth retrying) and
/// persistence problems (surfaced from the backing store).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration
    MissingMapping,
    AmbiguousMapping,
    MapperMismatch,
    InvalidConfig,

    // Session
    AlreadyExists,
    /// A tracked entity is borrowed by the caller while the session needs it
    Concurrency,

    // Persistence
    Persistence,
    ConstraintViolation,
    Serialization,
    Io,
    Timeout,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::MissingMapping => "ERR_MISSING_MAPPING",
            ExErrorKind::AmbiguousMapping => "ERR_AMBIGUOUS_MAPPING",
            ExErrorKind::MapperMismatch => "ERR_MAPPER_MISMATCH",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Concurrency => "ERR_ENTITY_BORROWED",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
        }
    }

    /// Mapper resolution or store configuration failures. Fatal, never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExErrorKind::MissingMapping
                | ExErrorKind::AmbiguousMapping
                | ExErrorKind::MapperMismatch
                | ExErrorKind::InvalidConfig
        )
    }

    /// Failures raised by the connection provider or a mapper.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Persistence
                | ExErrorKind::ConstraintViolation
                | ExErrorKind::Serialization
                | ExErrorKind::Io
                | ExErrorKind::Timeout
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) plus optional context for debugging.
/// Built with the `with_*` builder methods.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    entity_type: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
    candidates: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            entity_type: None,
            message: String::new(),
            source: None,
            candidates: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add candidate names (mappers that matched an ambiguous resolution)
    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_configuration(&self) -> bool {
        self.kind.is_configuration()
    }

    pub fn is_persistence(&self) -> bool {
        self.kind.is_persistence()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Get candidate names, if any (populated on AmbiguousMapping)
    pub fn candidates(&self) -> Option<&[String]> {
        self.candidates.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Typed failures raised by the unit of work and mapper registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UowError {
    /// No registered mapper handles the entity type
    #[error("No mapper registered for entity type {entity_type}")]
    MapperNotRegistered { entity_type: String },

    /// More than one registered mapper handles the entity type
    #[error("Multiple mappers handle entity type {entity_type}: {}", .candidates.join(", "))]
    AmbiguousMapper {
        entity_type: String,
        candidates: Vec<String>,
    },

    /// The resolved mapper works on a different entity type than requested
    #[error("Mapper {mapper} does not materialize entity type {entity_type}")]
    MapperEntityMismatch { entity_type: String, mapper: String },

    /// Another instance with the same identity is already part of the session
    #[error("Identity {entity_id} is already registered in this session")]
    DuplicateIdentity { entity_id: EntityId },

    /// The caller holds a borrow of a tracked entity
    #[error("Entity {entity_id} is borrowed by the caller")]
    EntityBorrowed { entity_id: EntityId },
}

impl From<UowError> for ExError {
    fn from(err: UowError) -> Self {
        let message = err.to_string();
        match err {
            UowError::MapperNotRegistered { entity_type } => {
                ExError::new(ExErrorKind::MissingMapping)
                    .with_op("resolve_mapper")
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            UowError::AmbiguousMapper {
                entity_type,
                candidates,
            } => ExError::new(ExErrorKind::AmbiguousMapping)
                .with_op("resolve_mapper")
                .with_entity_type(entity_type)
                .with_candidates(candidates)
                .with_message(message),
            UowError::MapperEntityMismatch { entity_type, .. } => {
                ExError::new(ExErrorKind::MapperMismatch)
                    .with_op("resolve_mapper")
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            UowError::DuplicateIdentity { entity_id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_op("register_new")
                    .with_entity_id(entity_id)
                    .with_message(message)
            }
            UowError::EntityBorrowed { entity_id } => ExError::new(ExErrorKind::Concurrency)
                .with_entity_id(entity_id)
                .with_message(message),
        }
    }
}
