//! How long to spin on a status flag before giving up.

use core::num::NonZeroU32;

use crate::Error;

/// A timeout used to keep a wedged cart from hanging the console.
///
/// The hardware offers no completion interrupt, so every wait in this crate
/// is a spin on a status bit. By default that spin is unbounded, exactly as
/// the hardware intends: a cart that never goes idle hangs the caller. Pass a
/// bounded timeout to turn such a hang into [`Error::BusTimeout`] or
/// [`Error::CommandFailed`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Timeout {
    polls: Option<NonZeroU32>,
}

impl Timeout {
    /// Waits for as long as the hardware takes.
    #[must_use]
    pub const fn unbounded() -> Self {
        Timeout { polls: None }
    }

    /// Gives up after polling the status register `polls` times.
    ///
    /// A value of zero is treated as one, since every wait polls at least once.
    #[must_use]
    pub const fn polls(polls: u32) -> Self {
        Timeout {
            polls: match NonZeroU32::new(polls) {
                Some(polls) => Some(polls),
                None => Some(NonZeroU32::MIN),
            },
        }
    }

    /// Returns whether this timeout never expires.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.polls.is_none()
    }

    /// Spins until `is_busy` returns false, or the timeout expires.
    pub(crate) fn spin(&self, mut is_busy: impl FnMut() -> bool) -> Result<(), Expired> {
        match self.polls {
            None => {
                while is_busy() {}
                Ok(())
            }
            Some(limit) => {
                for _ in 0..limit.get() {
                    if !is_busy() {
                        return Ok(());
                    }
                }
                Err(Expired)
            }
        }
    }
}

/// Returned when a bounded [`Timeout`] runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Expired;

impl From<Expired> for Error {
    fn from(_: Expired) -> Self {
        Error::BusTimeout
    }
}
