/**
 * Receipt tracking records, identifiers and the
 *  job message handed to the processing worker.
 * Shared between the intake service and anything
 *  consuming its queue.
 */
pub mod receipt;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::receipt::{
        ImageKind, Receipt, ReceiptId, ReceiptIdError, ReceiptJob, ReceiptStatus,
        MAX_RECEIPT_SIZE_BYTES,
    };
    pub use crate::version::{build_info, BuildInfo};
}
