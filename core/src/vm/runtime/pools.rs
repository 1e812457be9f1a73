use super::frame::Frame;
use crate::vm::slot::Slot;

/// Recycled register files. Nested activations take a frame and hand it back on exit, so the
/// steady state of a call-heavy program allocates nothing.
#[derive(Debug, Default)]
pub(crate) struct FramePool {
    free: Vec<Frame>,
}

impl FramePool {
    pub fn acquire(&mut self, nregs: usize) -> Frame {
        let mut frame = self.free.pop().unwrap_or_default();
        frame.reset(nregs);
        frame
    }

    pub fn release(&mut self, frame: Frame) {
        self.free.push(frame);
    }
}

/// Grow-only marshaling buffers for call arguments and results.
///
/// Buffers never shrink: a returned buffer keeps its capacity and serves the next call of any
/// size up to the largest seen so far.
#[derive(Debug, Default)]
pub(crate) struct ScratchPool {
    free: Vec<Vec<Slot>>,
    high_water: usize,
}

impl ScratchPool {
    pub fn take(&mut self, len: usize) -> Vec<Slot> {
        let mut buf = self.free.pop().unwrap_or_default();
        buf.clear();
        buf.resize(len, Slot::ZERO);
        self.high_water = self.high_water.max(len);
        buf
    }

    pub fn give_back(&mut self, buf: Vec<Slot>) {
        self.free.push(buf);
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
