use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),
    #[error("invalid operand")]
    InvalidOperand,
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("type error: {0}")]
    TypeMismatch(String),
    #[error("arity mismatch: {0}")]
    ArityMismatch(String),
    #[error("not callable: {0}")]
    NotCallable(String),
    #[error("undefined name '{0}'")]
    UndefinedName(String),
    #[error("cannot assign to immutable '{0}'")]
    ImmutableAssignment(String),
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    #[error("instruction budget of {0} exhausted")]
    BudgetExhausted(u64),
    #[error("{0}")]
    SystemError(String),
}

impl From<String> for RuntimeError {
    fn from(s: String) -> Self {
        RuntimeError::SystemError(s)
    }
}

impl From<&str> for RuntimeError {
    fn from(s: &str) -> Self {
        RuntimeError::SystemError(s.to_string())
    }
}
