pub mod complaint;
pub mod pnr;

pub use complaint::{ComplaintEntry, ComplaintGroup};
pub use pnr::{PnrRecord, PENDING_STATUS};
