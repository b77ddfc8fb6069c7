use std::process::{Command, Stdio};

use bevy::prelude::*;

/// Fire-and-forget side effect run when a gesture triggers.
pub trait ExternalAction: Send + Sync {
    fn open_external_resource(&self, url: &str);
}

#[derive(Resource)]
pub struct ExternalActions(pub Box<dyn ExternalAction>);

impl ExternalActions {
    pub fn new(action: impl ExternalAction + 'static) -> Self {
        Self(Box::new(action))
    }
}

/// Hands the URL to the platform's default opener.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn opener(url: &str) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut command = Command::new("open");
            command.arg(url);
            command
        }
        #[cfg(target_os = "windows")]
        {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", "", url]);
            command
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut command = Command::new("xdg-open");
            command.arg(url);
            command
        }
    }
}

impl ExternalAction for SystemBrowser {
    fn open_external_resource(&self, url: &str) {
        info!("Opening {}", url);
        let spawned = Self::opener(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(error) = spawned {
            warn!("Failed to open {}: {}", url, error);
        }
    }
}
