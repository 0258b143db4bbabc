use crate::hal::interrupt::Interrupts;

#[derive(Debug)]
pub struct MockInterrupts {
    pub enabled: bool,
    pub disables: usize,
    saved: Vec<bool>,
}

impl Default for MockInterrupts {
    fn default() -> Self { Self { enabled: true, disables: 0, saved: Vec::new() } }
}

impl Interrupts for MockInterrupts {
    fn disable(&mut self) {
        self.saved.push(self.enabled);
        self.enabled = false;
        self.disables += 1;
    }

    fn restore(&mut self) {
        self.enabled = self.saved.pop().expect("Interrupts restored without a matching disable");
    }
}
