//! Core Module - Business Logic
//!
//! Scanning, risk classification, the revoke flow and the result session.

pub mod revoke;
pub mod risk;
pub mod scanner;
pub mod session;

pub use revoke::{revoke, RevokeReceipt};
pub use risk::{classify, recommendation};
pub use scanner::{sort_findings, Scanner};
pub use session::{ScanSession, ScanStatus, ScanTicket, SessionSnapshot};
