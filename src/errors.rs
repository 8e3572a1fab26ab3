use std::fmt;

/// Main error type for the turnwheel combat engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Error related to parsing or validating a serialized document
    Document(DocumentError),
    /// Error related to unit lookup or unit state
    Unit(UnitError),
    /// Error related to commands, costs, or items
    Command(CommandError),
    /// Error related to progression data
    Progression(ProgressionError),
}

/// Errors related to serialized document handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A required input document was empty
    EmptyInput(&'static str),
    /// A document failed to parse or was structurally invalid
    Malformed(String),
}

/// Errors related to unit lookup and unit state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// The referenced unit id does not exist in the document
    NotFound(String),
    /// The referenced unit is defeated and cannot take part in the action
    Defeated(String),
    /// The document has no active unit where one was expected
    NoActiveUnit,
}

/// Errors related to commands, resource costs, and items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The actor has no command with the given id
    NotFound { unit: String, command: String },
    /// The team does not have enough SP for the command
    InsufficientSp { required: i64, available: i64 },
    /// The actor's ultimate gauge is not charged enough
    InsufficientGauge { required: i64, available: i64 },
    /// No item definition exists for the given id
    UnknownItem(String),
}

/// Errors related to progression data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    /// The referenced exercise id does not exist in the progression data
    ExerciseNotFound(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Document(err) => write!(f, "Document error: {}", err),
            EngineError::Unit(err) => write!(f, "Unit error: {}", err),
            EngineError::Command(err) => write!(f, "Command error: {}", err),
            EngineError::Progression(err) => write!(f, "Progression error: {}", err),
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::EmptyInput(name) => write!(f, "Input '{}' is empty", name),
            DocumentError::Malformed(details) => write!(f, "Malformed document: {}", details),
        }
    }
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::NotFound(id) => write!(f, "Unit with ID {} not found", id),
            UnitError::Defeated(name) => write!(f, "Unit {} is already defeated", name),
            UnitError::NoActiveUnit => write!(f, "No active unit in the battle document"),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::NotFound { unit, command } => {
                write!(f, "Command with ID {} not found for unit {}", command, unit)
            }
            CommandError::InsufficientSp { required, available } => {
                write!(f, "Not enough SP. Required: {}, Available: {}", required, available)
            }
            CommandError::InsufficientGauge { required, available } => {
                write!(f, "Not enough Gauge. Required: {}, Available: {}", required, available)
            }
            CommandError::UnknownItem(id) => write!(f, "Unknown item: {}", id),
        }
    }
}

impl fmt::Display for ProgressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressionError::ExerciseNotFound(id) => {
                write!(f, "Exercise with ID '{}' not found in progression data", id)
            }
        }
    }
}

impl std::error::Error for EngineError {}
impl std::error::Error for DocumentError {}
impl std::error::Error for UnitError {}
impl std::error::Error for CommandError {}
impl std::error::Error for ProgressionError {}

impl From<DocumentError> for EngineError {
    fn from(err: DocumentError) -> Self {
        EngineError::Document(err)
    }
}

impl From<UnitError> for EngineError {
    fn from(err: UnitError) -> Self {
        EngineError::Unit(err)
    }
}

impl From<CommandError> for EngineError {
    fn from(err: CommandError) -> Self {
        EngineError::Command(err)
    }
}

impl From<ProgressionError> for EngineError {
    fn from(err: ProgressionError) -> Self {
        EngineError::Progression(err)
    }
}

/// Type alias for Results using EngineError
pub type EngineResult<T> = Result<T, EngineError>;
