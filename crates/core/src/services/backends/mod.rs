#[cfg(feature = "capstone-backend")]
pub mod capstone;
pub mod elf;

#[cfg(feature = "capstone-backend")]
pub use capstone::MnemonicFingerprinter;
pub use elf::ObjectExtractor;
