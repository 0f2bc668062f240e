use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use rbxluau_core::api::{ExecError, HostInstall, HostLauncher, HostProcess};

use super::discovery::find_windows_install;
use super::process::StudioProcess;

static INSTALL: OnceLock<Result<HostInstall, String>> = OnceLock::new();

pub struct WindowsLauncher;

#[async_trait]
impl HostLauncher for WindowsLauncher {
    fn name(&self) -> &str {
        "windows"
    }

    fn locate(&self) -> Result<HostInstall, ExecError> {
        INSTALL
            .get_or_init(|| {
                let local = dirs::data_local_dir()
                    .ok_or_else(|| "LOCALAPPDATA is not set".to_string())?;
                find_windows_install(&local).map_err(|e| e.to_string())
            })
            .clone()
            .map_err(ExecError::Discovery)
    }

    async fn launch(
        &self,
        install: &HostInstall,
        place: &Path,
    ) -> Result<Box<dyn HostProcess>, ExecError> {
        Ok(Box::new(StudioProcess::spawn(&install.application_path, place)?))
    }

    fn supports_window_hiding(&self) -> bool {
        true
    }

    fn hide_windows(&self, pid: u32) -> anyhow::Result<()> {
        hide_first_window(pid);
        Ok(())
    }
}

struct WindowSearch {
    pid: u32,
    found: Option<::windows::Win32::Foundation::HWND>,
}

unsafe extern "system" fn find_owned_window(
    hwnd: ::windows::Win32::Foundation::HWND,
    lparam: ::windows::Win32::Foundation::LPARAM,
) -> ::windows::Win32::Foundation::BOOL {
    use ::windows::Win32::Foundation::BOOL;
    use ::windows::Win32::UI::WindowsAndMessaging::{GetWindowThreadProcessId, IsWindowVisible};

    let search = &mut *(lparam.0 as *mut WindowSearch);
    let mut owner = 0u32;
    GetWindowThreadProcessId(hwnd, Some(&mut owner as *mut u32));
    if owner == search.pid && IsWindowVisible(hwnd).as_bool() {
        search.found = Some(hwnd);
        return BOOL(0);
    }
    BOOL(1)
}

/// Hides the first visible top-level window owned by `pid`.
fn hide_first_window(pid: u32) {
    use ::windows::Win32::Foundation::LPARAM;
    use ::windows::Win32::UI::WindowsAndMessaging::{EnumWindows, ShowWindow, SW_HIDE};

    let mut search = WindowSearch { pid, found: None };
    unsafe {
        // Stopping the enumeration early is reported as an error.
        let _ = EnumWindows(
            Some(find_owned_window),
            LPARAM(&mut search as *mut WindowSearch as isize),
        );
        if let Some(hwnd) = search.found {
            let _ = ShowWindow(hwnd, SW_HIDE);
        }
    }
}
