pub mod process;

pub use process::{WaitpidChild, WaitpidLauncher};
