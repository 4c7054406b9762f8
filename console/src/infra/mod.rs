//! Infrastructure layer

pub mod credentials;
pub mod navigation;
pub mod storage;
pub mod theme;
