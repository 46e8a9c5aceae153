//! Change detection — did the last action do anything observable?
//!
//! An action counts as effective when the address changed (navigation) or
//! the rendered pixels changed (in-place mutation). Checking both catches
//! silent no-ops like a click that lands on nothing. The signal is
//! deliberately weak; replanning downstream is tuned to exactly this
//! false-positive/false-negative profile, so don't swap it for DOM
//! diffing.

/// Page identity plus content fingerprint, captured around an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current address.
    pub url: String,
    /// Hex digest of the rendered screenshot bytes.
    pub fingerprint: String,
}

/// True if either the address or the pixel fingerprint moved.
pub fn changed(before: &Snapshot, after: &Snapshot) -> bool {
    before.url != after.url || before.fingerprint != after.fingerprint
}
