use std::str::FromStr;

use anyhow::{Result, anyhow};

use crate::vm::alloc::DEFAULT_STACK_LIMIT;

pub const ENV_DISPATCH: &str = "MIR_INTERP_DISPATCH";
pub const ENV_STACK_LIMIT: &str = "MIR_INTERP_STACK_LIMIT";
pub const ENV_MAX_DEPTH: &str = "MIR_INTERP_MAX_DEPTH";
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// How the execution loop moves from one compiled instruction to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Every opcode slot is resolved to its handler once; each step is one indirect call.
    #[default]
    Direct,
    /// Opcode slots hold small integers matched in a single loop.
    Indexed,
}

impl DispatchMode {
    pub fn name(self) -> &'static str {
        match self {
            DispatchMode::Direct => "direct",
            DispatchMode::Indexed => "indexed",
        }
    }
}

impl FromStr for DispatchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "threaded" => Ok(DispatchMode::Direct),
            "indexed" | "switch" => Ok(DispatchMode::Indexed),
            other => Err(anyhow!("unknown dispatch mode '{other}' (expected direct or indexed)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpConfig {
    pub dispatch: DispatchMode,
    /// Emit one `mir::interp::insn` trace event per executed instruction.
    pub trace: bool,
    pub max_call_depth: usize,
    /// Size limit of the stack segment in bytes.
    pub stack_limit: usize,
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            trace: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            stack_limit: DEFAULT_STACK_LIMIT,
        }
    }
}

impl InterpConfig {
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Defaults overridden by `MIR_INTERP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_DISPATCH) {
            cfg.dispatch = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_STACK_LIMIT) {
            cfg.stack_limit = raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid {ENV_STACK_LIMIT} '{raw}': {e}"))?;
        }
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            cfg.max_call_depth = raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid {ENV_MAX_DEPTH} '{raw}': {e}"))?;
        }
        Ok(cfg)
    }
}
