//! Process name lookup via the ToolHelp snapshot API.

use super::backend::{ProcessSnapshot, ProcessTable};
use super::device::AudioResult;
use std::path::Path;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};

/// Process table backed by ToolHelp snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolhelpProcesses;

struct Snapshot(HANDLE);

impl Drop for Snapshot {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Executable name without extension, e.g. `Spotify.exe` -> `Spotify`.
fn process_name(exe_file: &[u16]) -> String {
    let len = exe_file.iter().position(|&c| c == 0).unwrap_or(exe_file.len());
    let exe = String::from_utf16_lossy(&exe_file[..len]);
    Path::new(&exe)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(exe)
}

impl ProcessTable for ToolhelpProcesses {
    fn snapshot(&self) -> AudioResult<ProcessSnapshot> {
        let mut names = Vec::new();
        unsafe {
            let snapshot = Snapshot(CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)?);

            let mut entry = PROCESSENTRY32W {
                dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };

            let mut more = Process32FirstW(snapshot.0, &mut entry).is_ok();
            while more {
                names.push((entry.th32ProcessID, process_name(&entry.szExeFile)));
                more = Process32NextW(snapshot.0, &mut entry).is_ok();
            }
        }
        Ok(names.into_iter().collect())
    }
}
