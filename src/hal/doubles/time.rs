use crate::hal::time::{Milliseconds, Now};
use std::{cell::Cell, rc::Rc};

/// Manually advanced clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
}

impl MockClock {
    pub fn starting_at(milliseconds: u32) -> Self { Self { now: Rc::new(Cell::new(milliseconds)) } }

    pub fn advance(&self, time: Milliseconds) { self.now.set(self.now.get().wrapping_add(time.0)); }
}

impl Now for MockClock {
    fn now(&self) -> Milliseconds { Milliseconds(self.now.get()) }
}
