use crate::vm::abi::VaArea;
use crate::vm::slot::Slot;

/// Register file of one activation.
///
/// Slot 0 is reserved and always starts as zero; arguments occupy slots `1..=nargs`.
#[derive(Debug, Default)]
pub(crate) struct Frame {
    pub regs: Vec<Slot>,
    /// Variadic spill area handed to `va_start`; empty for fixed-arity activations.
    pub va: VaArea,
}

impl Frame {
    pub fn reset(&mut self, nregs: usize) {
        self.regs.clear();
        self.regs.resize(nregs, Slot::ZERO);
        self.va = VaArea::default();
    }
}
