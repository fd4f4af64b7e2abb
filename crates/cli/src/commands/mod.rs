pub mod build;
pub mod extract;
pub mod info;
pub mod matching;

pub use build::*;
pub use extract::*;
pub use info::*;
pub use matching::*;
