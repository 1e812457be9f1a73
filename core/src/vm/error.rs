use std::fmt;

/// Error classes raised by the interpreter.
///
/// Values travel inside `anyhow::Error`; callers that need the class use
/// [`InterpError::kind_of`] or `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpError {
    /// Resource exhaustion: stack segment, scratch buffers, thunk generation.
    Alloc(String),
    /// Call shape the target ABI cannot express.
    CallOp(String),
    /// Instruction the interpreter refuses to execute.
    InvalidInsn(String),
    /// Operation outside the supported subset.
    Unsupported(String),
    /// Unresolved import or item reference.
    Link(String),
    MemoryFault { addr: u64, len: usize },
    DivisionByZero,
    CallDepth(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Alloc,
    CallOp,
    InvalidInsn,
    Unsupported,
    Link,
    MemoryFault,
    DivisionByZero,
    CallDepth,
    Other,
}

impl InterpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InterpError::Alloc(_) => ErrorKind::Alloc,
            InterpError::CallOp(_) => ErrorKind::CallOp,
            InterpError::InvalidInsn(_) => ErrorKind::InvalidInsn,
            InterpError::Unsupported(_) => ErrorKind::Unsupported,
            InterpError::Link(_) => ErrorKind::Link,
            InterpError::MemoryFault { .. } => ErrorKind::MemoryFault,
            InterpError::DivisionByZero => ErrorKind::DivisionByZero,
            InterpError::CallDepth(_) => ErrorKind::CallDepth,
        }
    }

    pub fn kind_of(err: &anyhow::Error) -> ErrorKind {
        err.downcast_ref::<InterpError>()
            .map(InterpError::kind)
            .unwrap_or(ErrorKind::Other)
    }
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpError::Alloc(msg) => write!(f, "allocation failure: {msg}"),
            InterpError::CallOp(msg) => write!(f, "call error: {msg}"),
            InterpError::InvalidInsn(msg) => write!(f, "invalid instruction: {msg}"),
            InterpError::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            InterpError::Link(msg) => write!(f, "link error: {msg}"),
            InterpError::MemoryFault { addr, len } => {
                write!(f, "memory fault: {len}-byte access at {addr:#x}")
            }
            InterpError::DivisionByZero => f.write_str("integer division by zero"),
            InterpError::CallDepth(limit) => write!(f, "call depth limit of {limit} exceeded"),
        }
    }
}

impl std::error::Error for InterpError {}

/// Non-local exit raised by `longjmp`; consumed by the activation that owns the jump buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LongJump {
    pub token: u64,
    pub value: i64,
}

impl fmt::Display for LongJump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "longjmp to buffer #{} escaped every interpreted activation", self.token)
    }
}

impl std::error::Error for LongJump {}
