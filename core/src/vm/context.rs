use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use once_cell::unsync::OnceCell;
use tracing::{debug, error};

use crate::ir::{DataId, FuncId, Module};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::vm::abi::{GLOBAL_SLOTS, PortableAbi, TargetAbi};
use crate::vm::alloc::Memory;
use crate::vm::bytecode::CompiledFunc;
use crate::vm::compiler::{Resolver, compile_func};
use crate::vm::config::InterpConfig;
use crate::vm::error::{ErrorKind, InterpError};
use crate::vm::ffi::{
    CacheStats, CallShape, EntryShim, EntrySignature, HostFn, HostRegistry, InterfaceCache, PortableThunks, Thunk,
    ThunkGenerator,
};
use crate::vm::runtime::{DispatchTable, FramePool, ScratchPool};
use crate::vm::setjmp::{self, JmpTarget};
use crate::vm::slot::{Addr, AddrKind, Slot};

/// Callback invoked with every error that escapes a top-level entry point.
pub type ErrorHandler = Box<dyn Fn(ErrorKind, &str) + Send + Sync>;

/// Interpreter context.
///
/// Owns the module being executed together with all interpreter state: the address space,
/// the global slot file, the interface cache, installed entry shims and the reusable buffers.
/// Contexts are independent of each other; a context runs on one thread at a time.
pub struct Interp {
    module: Module,
    pub(crate) config: InterpConfig,
    pub(crate) memory: Memory,
    pub(crate) globals: [Slot; GLOBAL_SLOTS],
    pub(crate) abi: Arc<dyn TargetAbi>,
    thunks: Arc<dyn ThunkGenerator>,
    dispatch: OnceCell<DispatchTable>,
    pub(crate) ffi: InterfaceCache,
    entries: FastHashMap<FuncId, EntryShim>,
    hosts: HostRegistry,
    data: Vec<Addr>,
    pub(crate) frames: FramePool,
    pub(crate) scratch: ScratchPool,
    /// Continuation recorded by the last `jret`.
    pub(crate) jret_addr: Addr,
    pub(crate) depth: usize,
    /// Public entry points (`interp`, `call`) currently on the Rust stack.
    entry_nesting: usize,
    pub(crate) setjmp_addr: Addr,
    jmp_targets: Vec<JmpTarget>,
    jmp_tokens: FastHashMap<JmpTarget, u64>,
    error_handler: ErrorHandler,
}

impl fmt::Debug for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interp")
            .field("module", &self.module.name)
            .field("config", &self.config)
            .field("abi", &self.abi.name())
            .field("thunks", &self.thunks.name())
            .field("hosts", &self.hosts.len())
            .field("entries", &self.entries.len())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Interp {
    pub fn new(module: Module) -> Result<Self> {
        Self::with_config(module, InterpConfig::default())
    }

    pub fn with_config(module: Module, config: InterpConfig) -> Result<Self> {
        Self::with_target(module, config, Arc::new(PortableAbi), Arc::new(PortableThunks))
    }

    /// Context with explicit target hooks. Module data is placed in memory, the `setjmp` and
    /// `longjmp` primitives are registered and every module function gets an interpreter entry.
    pub fn with_target(
        module: Module,
        config: InterpConfig,
        abi: Arc<dyn TargetAbi>,
        thunks: Arc<dyn ThunkGenerator>,
    ) -> Result<Self> {
        let mut memory = Memory::new(config.stack_limit);
        let data = module
            .data()
            .iter()
            .map(|item| memory.alloc_data(&item.bytes, 16))
            .collect();
        let mut interp = Self {
            module,
            config,
            memory,
            globals: [Slot::ZERO; GLOBAL_SLOTS],
            abi,
            thunks,
            dispatch: OnceCell::new(),
            ffi: InterfaceCache::new(),
            entries: fast_hash_map_new(),
            hosts: HostRegistry::new(),
            data,
            frames: FramePool::default(),
            scratch: ScratchPool::default(),
            jret_addr: Addr::NULL,
            depth: 0,
            entry_nesting: 0,
            setjmp_addr: Addr::NULL,
            jmp_targets: Vec::new(),
            jmp_tokens: fast_hash_map_new(),
            error_handler: Box::new(|kind: ErrorKind, msg: &str| error!(target: "mir::interp", ?kind, "{msg}")),
        };
        interp.setjmp_addr = setjmp::install(&mut interp);
        interp.install_all_entries()?;
        debug!(
            target: "mir::interp",
            module = %interp.module.name,
            dispatch = interp.config.dispatch.name(),
            abi = interp.abi.name(),
            "context created"
        );
        Ok(interp)
    }

    pub fn config(&self) -> &InterpConfig {
        &self.config
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Mutable module access. Functions changed through it drop their compiled form; functions
    /// added through it need [`Interp::install_interpreter_as_entry`] before native calls.
    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn global(&self, idx: usize) -> Slot {
        self.globals[idx]
    }

    pub fn set_global(&mut self, idx: usize, value: Slot) {
        self.globals[idx] = value;
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.ffi.stats()
    }

    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(ErrorKind, &str) + Send + Sync + 'static,
    {
        self.error_handler = Box::new(handler);
    }

    /// Registers a native function; imports of the same name resolve to it.
    pub fn register_host(&mut self, name: &str, nres: usize, f: HostFn) -> Addr {
        let id = self.hosts.register(name, nres, f);
        debug!(target: "mir::interp::ffi", name, nres, "host function registered");
        Addr::host(id)
    }

    pub fn host_addr(&self, name: &str) -> Option<Addr> {
        self.hosts.lookup(name).map(Addr::host)
    }

    pub fn func_addr(&self, name: &str) -> Option<Addr> {
        self.module.find_func(name).map(Addr::func)
    }

    pub fn data_addr(&self, id: DataId) -> Option<Addr> {
        self.data.get(id.0 as usize).copied()
    }

    /// Compiled form of `func`, compiling it on first use.
    pub fn compile(&self, func: FuncId) -> Result<Arc<CompiledFunc>> {
        let f = self
            .module
            .func(func)
            .ok_or_else(|| InterpError::Link(format!("unknown function func{}", func.0)))?;
        let resolver = Resolver {
            module: &self.module,
            hosts: &self.hosts,
            data: &self.data,
            abi: self.abi.as_ref(),
        };
        f.compiled_cell()
            .get_or_try_init(|| compile_func(f, func, &resolver).map(Arc::new))
            .cloned()
    }

    pub(crate) fn dispatch_table(&self) -> &DispatchTable {
        self.dispatch.get_or_init(DispatchTable::build)
    }

    /// Interprets `func` with `args` and returns its results.
    ///
    /// Arguments beyond the named parameters of a variadic function form its variadic tail;
    /// for other functions they are ignored.
    pub fn interp(&mut self, func: FuncId, args: &[Slot]) -> Result<Vec<Slot>> {
        self.entry_nesting += 1;
        let outcome = self.interp_inner(func, args);
        self.entry_nesting -= 1;
        self.report(outcome)
    }

    fn interp_inner(&mut self, func: FuncId, args: &[Slot]) -> Result<Vec<Slot>> {
        let f = self
            .module
            .func(func)
            .ok_or_else(|| InterpError::Link(format!("unknown function func{}", func.0)))?;
        let mut results = vec![Slot::ZERO; f.res_types().len()];
        let nfixed = f.args().len().min(args.len());
        let (fixed, varargs) = if f.is_vararg() {
            args.split_at(nfixed)
        } else {
            (args, &[][..])
        };
        self.run_function(func, fixed, varargs, &mut results)?;
        Ok(results)
    }

    /// Calls any function address the way native code would: through its entry shim for
    /// module functions, directly for host functions.
    pub fn call(&mut self, callee: Addr, args: &[Slot], nres: usize) -> Result<Vec<Slot>> {
        let mut results = vec![Slot::ZERO; nres];
        self.entry_nesting += 1;
        let outcome = self.call_native(callee, args, &mut results).map(|()| results);
        self.entry_nesting -= 1;
        self.report(outcome)
    }

    pub(crate) fn call_native(&mut self, callee: Addr, args: &[Slot], results: &mut [Slot]) -> Result<()> {
        match callee.kind() {
            AddrKind::Host(id) => {
                let host = self
                    .hosts
                    .get(id)
                    .ok_or_else(|| InterpError::CallOp(format!("no host function #{}", id.0)))?;
                if host.nres != results.len() {
                    return Err(InterpError::CallOp(format!(
                        "{} returns {} values, caller expects {}",
                        host.name,
                        host.nres,
                        results.len()
                    ))
                    .into());
                }
                let f = host.f.clone();
                f(self, args, results)
            }
            AddrKind::Func(id) => {
                let shim = self.entries.get(&id).cloned().ok_or_else(|| {
                    let name = self.module.func(id).map(|f| f.name().to_string()).unwrap_or_default();
                    InterpError::CallOp(format!("function '{name}' has no native entry installed"))
                })?;
                shim(self, args, results)
            }
            AddrKind::Label { .. } | AddrKind::Mem(_) => {
                Err(InterpError::CallOp(format!("call through non-function address {callee:?}")).into())
            }
        }
    }

    /// Routes subsequent native calls of `func` into the interpreter and returns the
    /// function's address.
    pub fn install_interpreter_as_entry(&mut self, func: FuncId) -> Result<Addr> {
        let f = self
            .module
            .func(func)
            .ok_or_else(|| InterpError::Link(format!("unknown function func{}", func.0)))?;
        let sig = EntrySignature {
            name: Arc::from(f.name()),
            res_types: f.res_types().to_vec(),
            args: f.args().to_vec(),
            vararg: f.is_vararg(),
        };
        let shim = self.thunks.entry_shim(func, sig)?;
        self.entries.insert(func, shim);
        Ok(Addr::func(func))
    }

    pub fn install_all_entries(&mut self) -> Result<()> {
        let ids: Vec<FuncId> = self.module.func_ids().collect();
        for id in ids {
            self.install_interpreter_as_entry(id)?;
        }
        Ok(())
    }

    /// Thunk for `shape` from the context-wide interface cache.
    pub(crate) fn interface(&mut self, shape: &CallShape) -> Result<Thunk> {
        self.ffi.lookup_or_generate(shape, self.thunks.as_ref())
    }

    pub(crate) fn bind_jmp_target(&mut self, target: JmpTarget) -> u64 {
        if let Some(token) = self.jmp_tokens.get(&target) {
            return *token;
        }
        self.jmp_targets.push(target);
        let token = self.jmp_targets.len() as u64;
        self.jmp_tokens.insert(target, token);
        token
    }

    pub(crate) fn jmp_target(&self, token: u64) -> Option<JmpTarget> {
        let idx = usize::try_from(token).ok()?.checked_sub(1)?;
        self.jmp_targets.get(idx).copied()
    }

    /// Peak marshaling buffer size seen so far, in slots.
    pub fn scratch_high_water(&self) -> usize {
        self.scratch.high_water()
    }

    /// Hands an error to the error handler once it leaves the outermost entry point.
    fn report<T>(&self, outcome: Result<T>) -> Result<T> {
        if let Err(err) = &outcome
            && self.entry_nesting == 0
        {
            (self.error_handler)(InterpError::kind_of(err), &format!("{err:#}"));
        }
        outcome
    }
}
