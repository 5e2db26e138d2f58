pub mod excel_read;
pub mod qbxml;
pub mod report;
pub mod session;
