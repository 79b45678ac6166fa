//! Hardware backends for the shutter controller.
//!
//! `sim` is always available. The GPIO and UART backends need the `hardware`
//! feature and a Linux target.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod uart;

pub use error::HwError;
pub use sim::{SimButton, SimLimit, SimMechanism, SimProbe, SimStepper};
