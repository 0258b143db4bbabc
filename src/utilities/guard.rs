//! RAII guard that calls a given function when constructed,
//! and another when it drops out of scope.
//!
//! Useful for ensuring resource cleanup no matter the return
//! path, e.g. relocking the flash controller.
//!
//! Example
//! ```
//! # use wts_lib::hal::flash::{Address, Controller};
//! # use wts_lib::hal::doubles::flash::FakeFlash;
//! # use wts_lib::utilities::guard::Guard;
//! let mut flash = FakeFlash::new(Address(0), 512, 512);
//! {
//!     // The controller is unlocked as soon as the guard is
//!     // constructed, and reachable through it.
//!     let mut unlocked = Guard::new(&mut flash, |f| f.unlock(), |f| f.lock());
//!     unlocked.program_word(Address(0), 0x1234);
//! }
//! // Guard has dropped out of scope here, so the controller is locked
//! assert!(flash.is_locked());
//! # assert_eq!(flash.read_word(Address(0)), 0x1234);
//! ```
use core::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

pub struct Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    item: &'a mut T,
    on_exit: Option<G>,
    _marker: PhantomData<F>,
}

impl<'a, T, F, G> Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    pub fn new(item: &'a mut T, on_entry: F, on_exit: G) -> Self {
        on_entry(item);
        Self { item, on_exit: Some(on_exit), _marker: PhantomData::default() }
    }
}

impl<'a, T, F, G> Deref for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    type Target = T;
    fn deref(&self) -> &T { self.item }
}

impl<'a, T, F, G> DerefMut for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    fn deref_mut(&mut self) -> &mut T { self.item }
}

impl<'a, T, F, G> Drop for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(self.item);
        }
    }
}
