//! Time units.
//!
//! Instants on this device are plain millisecond counts since boot, which
//! wrap after roughly 49 days. All comparisons between instants go through
//! wrapping arithmetic so deadlines keep working across the wrap.
use core::ops::{Add, Sub};

/// Source of the current time, in milliseconds since boot.
pub trait Now {
    fn now(&self) -> Milliseconds;
}

impl<T: Now> Now for &T {
    fn now(&self) -> Milliseconds { (**self).now() }
}

#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq, Default)]
pub struct Milliseconds(pub u32);

#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
pub struct Seconds(pub u32);

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Seconds`
    fn s(self) -> Seconds;

    /// Wrap in `Milliseconds`
    fn ms(self) -> Milliseconds;
}

impl U32Ext for u32 {
    fn s(self) -> Seconds { Seconds(self) }

    fn ms(self) -> Milliseconds { Milliseconds(self) }
}

impl From<Seconds> for Milliseconds {
    fn from(seconds: Seconds) -> Self { Milliseconds(seconds.0 * 1_000) }
}

impl Add for Milliseconds {
    type Output = Milliseconds;
    fn add(self, rhs: Milliseconds) -> Self::Output { Milliseconds(self.0.wrapping_add(rhs.0)) }
}

/// Time elapsed between two instants, assuming `self` is the later one.
impl Sub for Milliseconds {
    type Output = Milliseconds;
    fn sub(self, rhs: Milliseconds) -> Self::Output { Milliseconds(self.0.wrapping_sub(rhs.0)) }
}

impl Milliseconds {
    /// Whether `deadline` lies at or before this instant.
    ///
    /// Only meaningful while the two instants are less than half the
    /// counter range (~24 days) apart.
    pub fn has_reached(self, deadline: Milliseconds) -> bool {
        (self.0.wrapping_sub(deadline.0) as i32) >= 0
    }
}
