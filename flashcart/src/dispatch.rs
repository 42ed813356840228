use log::info;

use crate::backend::{
    DaisyDrive64, EverDrive64, Features, Flashcart, Progress, SectorTable, SixtyFourDrive,
};
use crate::fs::FileSystem;
use crate::save::AbstractSaveType;
use crate::{Bus, DmaEngine, Error, Timeout};

/// The kinds of flashcart this crate can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CartKind {
    /// A 64drive.
    SixtyFourDrive,
    /// An EverDrive-64.
    EverDrive64,
    /// A DaisyDrive64.
    DaisyDrive64,
}

/// The one flashcart the menu talks to.
///
/// The cart is chosen once, at startup, and never changes. Every operation of
/// [`Flashcart`] is forwarded to it unchanged.
pub enum FlashcartManager<B: Bus> {
    /// A 64drive.
    SixtyFourDrive(SixtyFourDrive<B>),
    /// An EverDrive-64.
    EverDrive64(EverDrive64<B>),
    /// A DaisyDrive64.
    DaisyDrive64(DaisyDrive64<B>),
}

impl<B: Bus> FlashcartManager<B> {
    /// Drives a cart of a known kind.
    pub fn new(kind: CartKind, bus: B, timeout: Timeout) -> Self {
        let dma = DmaEngine::new(bus, timeout);

        match kind {
            CartKind::SixtyFourDrive => Self::SixtyFourDrive(SixtyFourDrive::from_engine(dma)),
            CartKind::EverDrive64 => Self::EverDrive64(EverDrive64::from_engine(dma)),
            CartKind::DaisyDrive64 => Self::DaisyDrive64(DaisyDrive64::from_engine(dma)),
        }
    }

    /// Works out which cart is plugged in.
    ///
    /// The DaisyDrive64 cannot be told apart from an ordinary cartridge, so it
    /// is never detected; use [`FlashcartManager::new`] for it.
    ///
    /// Probing for an EverDrive-64 writes its unlock key to 0x0804_0020 in
    /// domain 2, whatever cart is actually plugged in, unless a 64drive
    /// answered first.
    pub fn detect(bus: B, timeout: Timeout) -> Option<Self> {
        let mut dma = DmaEngine::new(bus, timeout);
        dma.wait_idle().ok()?;

        let cart = if SixtyFourDrive::probe(&mut dma) {
            Self::SixtyFourDrive(SixtyFourDrive::from_engine(dma))
        } else if EverDrive64::probe(&mut dma) {
            Self::EverDrive64(EverDrive64::from_engine(dma))
        } else {
            return None;
        };

        info!("detected {:?}", cart.kind());
        Some(cart)
    }

    /// Which kind of cart this is.
    pub fn kind(&self) -> CartKind {
        match self {
            Self::SixtyFourDrive(_) => CartKind::SixtyFourDrive,
            Self::EverDrive64(_) => CartKind::EverDrive64,
            Self::DaisyDrive64(_) => CartKind::DaisyDrive64,
        }
    }

    /// Gives the bus back.
    pub fn into_bus(self) -> B {
        match self {
            Self::SixtyFourDrive(cart) => cart.into_bus(),
            Self::EverDrive64(cart) => cart.into_bus(),
            Self::DaisyDrive64(cart) => cart.into_bus(),
        }
    }

    fn cart(&self) -> &dyn Flashcart {
        match self {
            Self::SixtyFourDrive(cart) => cart,
            Self::EverDrive64(cart) => cart,
            Self::DaisyDrive64(cart) => cart,
        }
    }

    fn cart_mut(&mut self) -> &mut dyn Flashcart {
        match self {
            Self::SixtyFourDrive(cart) => cart,
            Self::EverDrive64(cart) => cart,
            Self::DaisyDrive64(cart) => cart,
        }
    }
}

impl<B: Bus> Flashcart for FlashcartManager<B> {
    fn init(&mut self) -> Result<(), Error> {
        self.cart_mut().init()
    }

    fn deinit(&mut self) -> Result<(), Error> {
        self.cart_mut().deinit()
    }

    fn has_feature(&self, feature: Features) -> bool {
        self.cart().has_feature(feature)
    }

    fn load_rom(
        &mut self,
        fs: &mut dyn FileSystem,
        path: &str,
        progress: Progress<'_>,
    ) -> Option<Result<(), Error>> {
        self.cart_mut().load_rom(fs, path, progress)
    }

    fn load_file(
        &mut self,
        fs: &mut dyn FileSystem,
        path: &str,
        rom_offset: u32,
        file_offset: u64,
    ) -> Option<Result<(), Error>> {
        self.cart_mut().load_file(fs, path, rom_offset, file_offset)
    }

    fn load_save(&mut self, fs: &mut dyn FileSystem, path: &str) -> Option<Result<(), Error>> {
        self.cart_mut().load_save(fs, path)
    }

    fn store_save(&mut self, fs: &mut dyn FileSystem, path: &str) -> Option<Result<(), Error>> {
        self.cart_mut().store_save(fs, path)
    }

    fn load_64dd_ipl(
        &mut self,
        fs: &mut dyn FileSystem,
        path: &str,
        progress: Progress<'_>,
    ) -> Option<Result<(), Error>> {
        self.cart_mut().load_64dd_ipl(fs, path, progress)
    }

    fn load_64dd_disk(&mut self, fs: &mut dyn FileSystem, path: &str) -> Option<Result<(), Error>> {
        self.cart_mut().load_64dd_disk(fs, path)
    }

    fn set_save_type(&mut self, save_type: AbstractSaveType) -> Option<Result<(), Error>> {
        self.cart_mut().set_save_type(save_type)
    }

    fn set_save_writeback(&mut self, sectors: &SectorTable) -> Option<Result<(), Error>> {
        self.cart_mut().set_save_writeback(sectors)
    }
}
