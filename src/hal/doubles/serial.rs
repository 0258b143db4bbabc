use crate::hal::serial::{self, Event};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

#[derive(Debug)]
pub struct UartState {
    pub incoming: VecDeque<u8>,
    pub transmitted: Vec<u8>,
    pub rx_listening: bool,
    pub tx_listening: bool,
    pub transmit_complete: bool,
    pub reads: usize,
}

impl Default for UartState {
    fn default() -> Self {
        Self {
            incoming: VecDeque::new(),
            transmitted: Vec::new(),
            rx_listening: false,
            tx_listening: false,
            transmit_complete: true,
            reads: 0,
        }
    }
}

/// UART double whose clones share one peripheral, so a test can hand one
/// handle to the transport and drive the "interrupt" side with another.
#[derive(Clone, Debug, Default)]
pub struct MockUart {
    state: Rc<RefCell<UartState>>,
}

impl MockUart {
    pub fn state(&self) -> std::cell::RefMut<'_, UartState> { self.state.borrow_mut() }

    /// Queues bytes as if they had arrived on the line.
    pub fn feed(&self, bytes: &[u8]) { self.state().incoming.extend(bytes.iter().copied()); }

    /// Takes every byte transmitted so far.
    pub fn take_transmitted(&self) -> Vec<u8> { std::mem::take(&mut self.state().transmitted) }

    pub fn is_listening(&self, event: Event) -> bool {
        match event {
            Event::Rxne => self.state.borrow().rx_listening,
            Event::Txe => self.state.borrow().tx_listening,
        }
    }
}

impl serial::Read for MockUart {
    type Error = ();

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut state = self.state();
        state.reads += 1;
        state.incoming.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write for MockUart {
    type Error = ();

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.state().transmitted.push(byte);
        Ok(())
    }
}

impl serial::Listen for MockUart {
    fn listen(&mut self, event: Event) {
        match event {
            Event::Rxne => self.state().rx_listening = true,
            Event::Txe => self.state().tx_listening = true,
        }
    }

    fn unlisten(&mut self, event: Event) {
        match event {
            Event::Rxne => self.state().rx_listening = false,
            Event::Txe => self.state().tx_listening = false,
        }
    }
}

impl serial::TransmitStatus for MockUart {
    fn is_transmit_complete(&self) -> bool { self.state.borrow().transmit_complete }
}
