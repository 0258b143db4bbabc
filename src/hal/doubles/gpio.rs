use crate::hal::gpio::OutputPin;
use std::{cell::RefCell, rc::Rc};

/// Output pin double. Clones observe the same line.
#[derive(Clone, Debug, Default)]
pub struct MockPin {
    changes: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn is_high(&self) -> bool { self.changes.borrow().last().copied().unwrap_or(false) }
    pub fn is_low(&self) -> bool { !self.is_high() }

    /// Every level the pin has been driven to, oldest first.
    pub fn changes(&self) -> Vec<bool> { self.changes.borrow().clone() }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) { self.changes.borrow_mut().push(false); }

    fn set_high(&mut self) { self.changes.borrow_mut().push(true); }
}
