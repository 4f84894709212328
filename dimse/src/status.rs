//! DIMSE status codes, byte-exact on the wire.

use std::fmt;

/// A DIMSE response status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u16);

impl Status {
    /// The operation completed.
    pub const SUCCESS: Status = Status(0x0000);
    /// More responses are coming.
    pub const PENDING: Status = Status(0xFF00);
    /// More responses are coming; some optional keys were not matched.
    pub const PENDING_WARNING: Status = Status(0xFF01);
    /// The operation was cancelled on request.
    pub const CANCEL: Status = Status(0xFE00);
    /// The requested SOP class is not supported on this context.
    pub const SOP_CLASS_NOT_SUPPORTED: Status = Status(0x0122);
    /// Refused: out of resources.
    pub const OUT_OF_RESOURCES: Status = Status(0xA700);
    /// Refused: the move destination is unknown.
    pub const MOVE_DESTINATION_UNKNOWN: Status = Status(0xA801);
    /// Error: the data set does not match the SOP class.
    pub const DATASET_DOES_NOT_MATCH_SOP_CLASS: Status = Status(0xA900);
    /// Failure: general processing failure.
    pub const PROCESSING_FAILURE: Status = Status(0x0110);
    /// Failure: the SOP instance already exists.
    pub const DUPLICATE_SOP_INSTANCE: Status = Status(0x0111);
    /// Failure: no such object instance.
    pub const NO_SUCH_OBJECT_INSTANCE: Status = Status(0x0112);
    /// Warning: data elements were coerced.
    pub const COERCION_OF_DATA_ELEMENTS: Status = Status(0xB000);
    /// Error: cannot understand (start of the C000 range).
    pub const CANNOT_UNDERSTAND: Status = Status(0xC000);

    /// Whether this is the success status.
    pub fn is_success(self) -> bool {
        self.0 == 0x0000
    }

    /// Whether this is one of the pending statuses.
    pub fn is_pending(self) -> bool {
        self.0 == 0xFF00 || self.0 == 0xFF01
    }

    /// Whether the operation was cancelled.
    pub fn is_cancel(self) -> bool {
        self.0 == 0xFE00
    }

    /// Whether this is a warning status.
    pub fn is_warning(self) -> bool {
        (0xB000..=0xBFFF).contains(&self.0) || self.0 == 0x0001
    }

    /// Whether this is a failure status.
    pub fn is_failure(self) -> bool {
        !(self.is_success() || self.is_pending() || self.is_cancel() || self.is_warning())
    }

    /// Whether this status terminates a multi-response operation.
    pub fn is_terminal(self) -> bool {
        !self.is_pending()
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn classification() {
        assert!(Status::SUCCESS.is_success());
        assert!(Status::PENDING.is_pending());
        assert!(Status::PENDING_WARNING.is_pending());
        assert!(Status::CANCEL.is_cancel());
        assert!(Status::COERCION_OF_DATA_ELEMENTS.is_warning());
        assert!(Status::OUT_OF_RESOURCES.is_failure());
        assert!(Status(0xC123).is_failure());
        assert!(!Status::PENDING.is_terminal());
        assert!(Status::SUCCESS.is_terminal());
    }
}
