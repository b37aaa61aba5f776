//! Run dialog history decoder.

/// Value holding the MRU ordering letters rather than a command.
const ORDER_VALUE: &str = "MRUList";

/// Marker the shell appends to every stored command.
const COMMAND_SUFFIX: &str = "\\1";

/// Decodes one RunMRU value into the typed command.
///
/// Returns `None` for the ordering value and for blank commands.
pub fn decode_run_mru(name: &str, text: &str) -> Option<String> {
    if name.eq_ignore_ascii_case(ORDER_VALUE) {
        return None;
    }

    let command = text.strip_suffix(COMMAND_SUFFIX).unwrap_or(text).trim();
    if command.is_empty() {
        return None;
    }

    Some(command.to_string())
}
