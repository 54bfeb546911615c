//! 🍒欢迎光临🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::xim::{ParseError, PropertyTable, PropertyValue, XimHeader, XimImage};

pub use crate::gamma::{gamma_2d, GammaConfig, GammaError};

#[cfg(feature = "rayon")]
pub use crate::gamma::par_gamma_2d;

pub use crate::{DisplayWindow, ImgWriteRaw, ImgWriteVis};

pub use crate::consts;
