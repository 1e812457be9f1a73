use anyhow::Result;
use tracing::trace;

use crate::vm::error::InterpError;
use crate::vm::slot::Addr;

/// First address of the data segment (module data, host allocations).
pub const DATA_BASE: u64 = 0x1_0000;
/// First address of the stack segment (alloca, blocks, variadic spill areas).
pub const STACK_BASE: u64 = 0x1000_0000;
pub const DEFAULT_STACK_LIMIT: usize = 1 << 20;
const STACK_ALIGN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Data,
    Stack,
}

/// Bounds-checked little-endian address space seen by interpreted code.
///
/// The data segment only grows. The stack segment is a bump region: activations record a mark
/// on entry and release back to it on exit, so `alloca` storage lives exactly as long as the
/// function that allocated it.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    stack: Vec<u8>,
    sp: usize,
    stack_limit: usize,
    peak: usize,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_LIMIT)
    }
}

impl Memory {
    pub fn new(stack_limit: usize) -> Self {
        Self {
            data: Vec::new(),
            stack: Vec::new(),
            sp: 0,
            stack_limit,
            peak: 0,
        }
    }

    /// Copies `bytes` into the data segment and returns their address.
    pub fn alloc_data(&mut self, bytes: &[u8], align: usize) -> Addr {
        let addr = self.alloc_zeroed(bytes.len(), align);
        let start = (addr.bits() - DATA_BASE) as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        addr
    }

    pub fn alloc_zeroed(&mut self, len: usize, align: usize) -> Addr {
        let align = align.max(1);
        let start = self.data.len().next_multiple_of(align);
        // Zero-length requests still occupy one byte so addresses stay distinct.
        self.data.resize(start + len.max(1), 0);
        trace!(target: "mir::interp::alloc", start, len, "data segment allocation");
        Addr::mem(DATA_BASE + start as u64)
    }

    /// Zeroed, 16-byte aligned stack allocation.
    pub fn alloca(&mut self, size: u64) -> Result<Addr> {
        let start = self.sp.next_multiple_of(STACK_ALIGN);
        let end = usize::try_from(size)
            .ok()
            .and_then(|size| start.checked_add(size))
            .filter(|end| *end <= self.stack_limit)
            .ok_or_else(|| {
                InterpError::Alloc(format!(
                    "stack segment exhausted: {size} bytes requested, limit {}",
                    self.stack_limit
                ))
            })?;
        if self.stack.len() < end {
            self.stack.resize(end, 0);
        } else {
            self.stack[start..end].fill(0);
        }
        self.sp = end;
        self.peak = self.peak.max(end);
        trace!(target: "mir::interp::alloc", start, size, "stack allocation");
        Ok(Addr::mem(STACK_BASE + start as u64))
    }

    pub fn stack_mark(&self) -> usize {
        self.sp
    }

    pub fn release(&mut self, mark: usize) {
        debug_assert!(mark <= self.sp || mark <= self.stack.len());
        self.sp = mark;
    }

    pub fn stack_top(&self) -> Addr {
        Addr::mem(STACK_BASE + self.sp as u64)
    }

    /// Resets the stack pointer to an address previously obtained from [`Memory::stack_top`].
    pub fn set_stack_top(&mut self, addr: Addr) -> Result<()> {
        let bits = addr.bits();
        let offset = bits
            .checked_sub(STACK_BASE)
            .map(|o| o as usize)
            .filter(|o| *o <= self.stack_limit)
            .ok_or(InterpError::MemoryFault { addr: bits, len: 0 })?;
        self.sp = offset;
        Ok(())
    }

    pub fn peak_stack(&self) -> usize {
        self.peak
    }

    fn locate(&self, addr: u64, len: usize) -> Result<(Segment, usize)> {
        let fault = || InterpError::MemoryFault { addr, len };
        let (segment, offset, size) = if addr >= STACK_BASE {
            (Segment::Stack, addr - STACK_BASE, self.stack.len())
        } else if addr >= DATA_BASE {
            (Segment::Data, addr - DATA_BASE, self.data.len())
        } else {
            return Err(fault().into());
        };
        let offset = usize::try_from(offset).map_err(|_| fault())?;
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok((segment, offset)),
            _ => Err(fault().into()),
        }
    }

    pub fn read(&self, addr: u64, len: usize) -> Result<&[u8]> {
        let (segment, offset) = self.locate(addr, len)?;
        Ok(match segment {
            Segment::Data => &self.data[offset..offset + len],
            Segment::Stack => &self.stack[offset..offset + len],
        })
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> Result<()> {
        let (segment, offset) = self.locate(addr, bytes.len())?;
        let dst = match segment {
            Segment::Data => &mut self.data[offset..offset + bytes.len()],
            Segment::Stack => &mut self.stack[offset..offset + bytes.len()],
        };
        dst.copy_from_slice(bytes);
        Ok(())
    }

    #[inline]
    pub fn load<const N: usize>(&self, addr: u64) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(addr, N)?);
        Ok(out)
    }

    #[inline]
    pub fn store<const N: usize>(&mut self, addr: u64, bytes: [u8; N]) -> Result<()> {
        self.write(addr, &bytes)
    }

    pub fn read_u64(&self, addr: u64) -> Result<u64> {
        Ok(u64::from_le_bytes(self.load::<8>(addr)?))
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) -> Result<()> {
        self.store(addr, value.to_le_bytes())
    }

    pub fn copy(&mut self, dst: u64, src: u64, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let bytes = self.read(src, len)?.to_vec();
        self.write(dst, &bytes)
    }
}
