//! Marker checks on captured command output.

use tracing::debug;

/// Marker `curl -I` prints for a link that is ready to download
pub const HTTP_OK_MARKER: &str = "HTTP/2 200";

/// Returns true if `output` contains `marker`.
///
/// An empty marker never matches; a check for "nothing" is always a caller bug.
pub fn contains_marker(output: &str, marker: &str) -> bool {
    if marker.is_empty() || marker.len() > output.len() {
        debug!("Marker {:?} not found (output too short)", marker);
        return false;
    }

    let found = output.contains(marker);
    if found {
        debug!("Found marker {:?}", marker);
    } else {
        debug!("Marker {:?} not found", marker);
    }
    found
}
