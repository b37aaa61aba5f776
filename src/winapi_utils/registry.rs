//! Read-only registry access.
//!
//! Provides an RAII key handle that enumerates subkeys and values, plus the
//! key paths of the execution-history artifacts.

use crate::collect::{RegistryData, RegistryValue};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS,
    ERROR_SUCCESS, WIN32_ERROR,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegEnumValueW, RegOpenKeyExW, HKEY, KEY_READ, REG_BINARY,
    REG_EXPAND_SZ, REG_SZ, REG_VALUE_TYPE,
};

pub use windows::Win32::System::Registry::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};

/// UserAssist `Count` keys under HKCU (executables, shortcuts).
pub const USERASSIST_KEYS: [&str; 2] = [
    "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Explorer\\UserAssist\\{CEBFF5CD-ACE2-4F4F-9178-9926F41749EA}\\Count",
    "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Explorer\\UserAssist\\{F4E57C4B-2036-45F0-A9AB-443BCFE33D9F}\\Count",
];

/// BAM per-user roots under HKLM (current layout first, pre-1809 second).
pub const BAM_KEYS: [&str; 2] = [
    "SYSTEM\\CurrentControlSet\\Services\\bam\\State\\UserSettings",
    "SYSTEM\\CurrentControlSet\\Services\\bam\\UserSettings",
];

/// Run dialog history under HKCU.
pub const RUN_MRU_KEY: &str = "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Explorer\\RunMRU";

/// Longest value name the registry allows, in UTF-16 units.
const MAX_VALUE_NAME: usize = 16_384;

/// Longest key name the registry allows, in UTF-16 units.
const MAX_KEY_NAME: usize = 256;

/// RAII wrapper for an open registry key.
///
/// Closes the handle when dropped.
pub struct RegKey(HKEY);

impl RegKey {
    /// Opens `path` under `root` for reading.
    pub fn open(root: HKEY, path: &str) -> Result<Self, String> {
        let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();
        let mut hkey = HKEY::default();

        let status = unsafe { RegOpenKeyExW(root, PCWSTR(wide.as_ptr()), 0, KEY_READ, &mut hkey) };

        if status == ERROR_SUCCESS {
            Ok(Self(hkey))
        } else {
            Err(describe(status))
        }
    }

    /// Names of the direct subkeys.
    pub fn subkey_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut buffer = vec![0u16; MAX_KEY_NAME];

        for index in 0.. {
            let mut len = buffer.len() as u32;
            let status = unsafe {
                RegEnumKeyExW(
                    self.0,
                    index,
                    PWSTR(buffer.as_mut_ptr()),
                    &mut len,
                    None,
                    PWSTR::null(),
                    None,
                    None,
                )
            };

            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status != ERROR_SUCCESS {
                tracing::debug!(index, error = %describe(status), "Skipping unreadable subkey");
                continue;
            }
            names.push(String::from_utf16_lossy(&buffer[..len as usize]));
        }

        names
    }

    /// All values of this key. Values that fail to read are skipped.
    pub fn values(&self) -> Vec<RegistryValue> {
        let mut values = Vec::new();
        let mut name_buf = vec![0u16; MAX_VALUE_NAME];
        let mut data_buf = vec![0u8; 1024];

        let mut index = 0u32;
        loop {
            let mut name_len = name_buf.len() as u32;
            let mut data_len = data_buf.len() as u32;
            let mut kind = 0u32;

            let status = unsafe {
                RegEnumValueW(
                    self.0,
                    index,
                    PWSTR(name_buf.as_mut_ptr()),
                    &mut name_len,
                    None,
                    Some(&mut kind as *mut u32),
                    Some(data_buf.as_mut_ptr()),
                    Some(&mut data_len as *mut u32),
                )
            };

            if status == ERROR_MORE_DATA {
                // Grow to the reported size and retry the same index
                data_buf.resize((data_len as usize).max(data_buf.len() * 2), 0);
                continue;
            }
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            index += 1;
            if status != ERROR_SUCCESS {
                tracing::debug!(index, error = %describe(status), "Skipping unreadable value");
                continue;
            }

            let name = String::from_utf16_lossy(&name_buf[..name_len as usize]);
            let bytes = &data_buf[..data_len as usize];
            let data = match REG_VALUE_TYPE(kind) {
                REG_BINARY => RegistryData::Binary(bytes.to_vec()),
                REG_SZ | REG_EXPAND_SZ => RegistryData::Text(utf16_le_to_string(bytes)),
                _ => RegistryData::Other,
            };
            values.push(RegistryValue { name, data });
        }

        values
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

/// Decodes a REG_SZ payload, dropping the terminating NULs.
fn utf16_le_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}

fn describe(status: WIN32_ERROR) -> String {
    match status {
        ERROR_FILE_NOT_FOUND => "key not found".to_string(),
        ERROR_ACCESS_DENIED => "access denied".to_string(),
        other => format!("registry error {}", other.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_decoding() {
        let bytes: Vec<u8> = "cmd\\1\0"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(utf16_le_to_string(&bytes), "cmd\\1");
    }

    #[test]
    fn test_missing_key() {
        let result = RegKey::open(HKEY_CURRENT_USER, "SOFTWARE\\exectrail-test-missing-key");
        assert_eq!(result.err().as_deref(), Some("key not found"));
    }
}
