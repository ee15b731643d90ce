pub mod cc1800;

pub use cc1800::{Cc1800, CpuInfo, ProtocolConfig, RegisterContext, Request};
