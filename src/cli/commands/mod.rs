pub mod apply;
pub mod audit_helpers;
pub mod check;
pub mod describe;
pub mod list;
pub mod log;
