//! Entity type definitions

pub mod batch;
pub mod battery;
pub mod dispatch;
pub mod finding;
pub mod warranty;

pub use batch::{Batch, BatchStatus};
pub use battery::{Battery, BatteryStatus, CustodyStatus, EolResult, InventoryStatus, QaDisposition};
pub use dispatch::{DispatchOrder, DispatchStatus};
pub use finding::{Finding, FindingStatus, Severity};
pub use warranty::{ClaimStatus, WarrantyClaim};
