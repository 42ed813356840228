//! The DaisyDrive64.
//!
//! Only detection of the cart's presence is supported so far. Its ROM upload
//! protocol sends the image in several chunks, and until that is pinned down
//! [`Flashcart::load_rom`] reports the capability as absent rather than
//! uploading something the cart will not boot.

use log::debug;

use super::{Features, Flashcart};
use crate::dma::DmaEngine;
use crate::{Bus, Error, Timeout};

/// A DaisyDrive64.
pub struct DaisyDrive64<B: Bus> {
    dma: DmaEngine<B>,
}

impl<B: Bus> DaisyDrive64<B> {
    /// Drives the DaisyDrive64 behind `bus`.
    pub fn new(bus: B, timeout: Timeout) -> Self {
        Self::from_engine(DmaEngine::new(bus, timeout))
    }

    pub(crate) fn from_engine(dma: DmaEngine<B>) -> Self {
        DaisyDrive64 { dma }
    }

    /// Gives the bus back.
    pub fn into_bus(self) -> B {
        self.dma.into_bus()
    }
}

impl<B: Bus> Flashcart for DaisyDrive64<B> {
    fn init(&mut self) -> Result<(), Error> {
        debug!("daisydrive64 selected");
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn has_feature(&self, _feature: Features) -> bool {
        false
    }
}
