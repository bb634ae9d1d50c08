//! Collaborators used at session start-up: finding the target process and
//! loading the pipe server payload into it.

use crate::error::Result;
#[cfg(windows)]
use crate::error::BridgeError;
use std::path::Path;

/// Finds the process that hosts the remote interpreter.
pub trait ProcessLocator: Send + Sync {
    fn locate(&self) -> Result<u32>;
}

/// Introduces the pipe server payload into a running process.
pub trait PayloadLoader: Send + Sync {
    /// Returns `Ok(false)` when the loader ran but the payload was not accepted.
    fn load(&self, payload: &Path, pid: u32) -> Result<bool>;
}

/// Locator returning a process id known up front.
#[derive(Debug, Clone, Copy)]
pub struct FixedProcess(pub u32);

impl ProcessLocator for FixedProcess {
    fn locate(&self) -> Result<u32> {
        Ok(self.0)
    }
}

/// Finds the first running process with the given image name.
#[cfg(windows)]
#[derive(Debug, Clone)]
pub struct ExecutableLocator {
    image_name: String,
}

#[cfg(windows)]
impl ExecutableLocator {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
        }
    }
}

#[cfg(windows)]
impl ProcessLocator for ExecutableLocator {
    fn locate(&self) -> Result<u32> {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Diagnostics::ToolHelp::{
            CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
            TH32CS_SNAPPROCESS,
        };

        unsafe {
            let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
                .map_err(|e| BridgeError::Locator(format!("Process snapshot failed: {}", e)))?;

            let mut entry = PROCESSENTRY32W {
                dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };

            let mut found = None;
            let mut more = Process32FirstW(snapshot, &mut entry).is_ok();
            while more {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let name = String::from_utf16_lossy(&entry.szExeFile[..len]);
                if name.eq_ignore_ascii_case(&self.image_name) {
                    found = Some(entry.th32ProcessID);
                    break;
                }
                more = Process32NextW(snapshot, &mut entry).is_ok();
            }

            let _ = CloseHandle(snapshot);
            found.ok_or_else(|| BridgeError::ProcessNotFound(self.image_name.clone()))
        }
    }
}
