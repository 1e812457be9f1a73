use anyhow::Result;
use tracing::{debug, trace};

use super::opcode::exec;
use super::{Flow, Handler, Machine};
use crate::vm::bytecode::{Tag, insn_width, with_tags};
use crate::vm::config::DispatchMode;
use crate::vm::setjmp;
use crate::vm::slot::Slot;

/// Handler for one tag: the shared opcode semantics with the tag fixed at compile time.
fn handler<const T: u16>(m: &mut Machine<'_>, pc: usize) -> Result<Flow> {
    let tag = const {
        match Tag::from_u16(T) {
            Some(tag) => tag,
            None => panic!("handler instantiated for an unknown tag"),
        }
    };
    exec(m, tag, pc)
}

/// Occupies operand positions of a threaded array; reaching one means the array is corrupt.
fn not_an_opcode(m: &mut Machine<'_>, pc: usize) -> Result<Flow> {
    panic!("{}: dispatched into operand word at {pc}", m.cf.name)
}

macro_rules! handler_table {
    (shared: [$($s:ident),* $(,)?], internal: [$($i:ident => $iname:literal),* $(,)?]) => {
        [
            $(handler::<{ Tag::$s as u16 }> as Handler,)*
            $(handler::<{ Tag::$i as u16 }> as Handler,)*
        ]
    };
}

/// Tag-indexed handler table used to resolve opcode slots for direct dispatch.
pub(crate) struct DispatchTable {
    handlers: [Handler; Tag::COUNT],
}

impl DispatchTable {
    pub fn build() -> Self {
        let handlers: [Handler; Tag::COUNT] = with_tags!(handler_table);
        debug!(target: "mir::interp::dispatch", tags = Tag::COUNT, "dispatch table built");
        Self { handlers }
    }

    #[inline]
    pub fn handler(&self, tag: Tag) -> Handler {
        self.handlers[tag as usize]
    }

    /// Parallel array of `code` whose opcode positions hold their handlers.
    pub fn thread(&self, code: &[Slot]) -> Box<[Handler]> {
        let mut out: Vec<Handler> = vec![not_an_opcode as Handler; code.len()];
        let mut pc = 0;
        while pc < code.len() {
            let tag = decode(code, pc);
            out[pc] = self.handler(tag);
            pc += insn_width(code, pc, tag);
        }
        out.into_boxed_slice()
    }
}

#[inline(always)]
fn decode(code: &[Slot], pc: usize) -> Tag {
    match u16::try_from(code[pc].u()).ok().and_then(Tag::from_u16) {
        Some(tag) => tag,
        None => panic!("unknown instruction tag {:#x} at {pc}", code[pc].u()),
    }
}

/// Runs `m` from offset 0 until a return.
pub(super) fn run(m: &mut Machine<'_>, mode: DispatchMode, trace: bool) -> Result<()> {
    match (mode, trace) {
        (DispatchMode::Direct, false) => run_direct::<false>(m),
        (DispatchMode::Direct, true) => run_direct::<true>(m),
        (DispatchMode::Indexed, false) => run_indexed::<false>(m),
        (DispatchMode::Indexed, true) => run_indexed::<true>(m),
    }
}

fn run_direct<const TRACE: bool>(m: &mut Machine<'_>) -> Result<()> {
    let cf = m.cf;
    let threaded = cf.threaded.get_or_init(|| m.interp.dispatch_table().thread(&cf.code));
    let mut pc = 0;
    loop {
        if TRACE {
            trace_insn(m, pc);
        }
        match threaded[pc](m, pc) {
            Ok(Flow::Next(next)) => pc = next,
            Ok(Flow::Return) => return Ok(()),
            Err(err) => pc = setjmp::catch(m, err)?,
        }
    }
}

fn run_indexed<const TRACE: bool>(m: &mut Machine<'_>) -> Result<()> {
    let mut pc = 0;
    loop {
        if TRACE {
            trace_insn(m, pc);
        }
        let tag = decode(m.code, pc);
        match exec(m, tag, pc) {
            Ok(Flow::Next(next)) => pc = next,
            Ok(Flow::Return) => return Ok(()),
            Err(err) => pc = setjmp::catch(m, err)?,
        }
    }
}

#[cold]
fn trace_insn(m: &Machine<'_>, pc: usize) {
    let tag = decode(m.code, pc);
    let width = insn_width(m.code, pc, tag);
    trace!(
        target: "mir::interp::insn",
        func = %m.cf.name,
        pc,
        op = tag.name(),
        operands = ?&m.code[pc + 1..pc + width],
    );
}
