//! Decoders for the individual execution-history artifacts.
//!
//! Each decoder works on raw bytes, names and timestamps handed over by a
//! collaborator and returns `None` for anything it cannot make sense of.
//! None of them touch the registry or filesystem directly.

pub mod bam;
pub mod prefetch;
pub mod run_mru;
pub mod userassist;

pub use bam::*;
pub use prefetch::*;
pub use run_mru::*;
pub use userassist::*;

/// Returns the last path segment after `\` or `/`.
pub(crate) fn last_path_segment(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("C:\\Windows\\notepad.exe"), "notepad.exe");
        assert_eq!(last_path_segment("{GUID}/app.lnk"), "app.lnk");
        assert_eq!(last_path_segment("calc.exe"), "calc.exe");
        assert_eq!(last_path_segment("dir\\"), "");
    }
}
