// Host platform detection for the capability descriptor and version string
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    MacOs,
    Windows,
    Linux,
    Unknown(String),
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "android")]
        {
            Platform::Android
        }

        #[cfg(target_os = "ios")]
        {
            Platform::Ios
        }

        #[cfg(target_os = "macos")]
        {
            Platform::MacOs
        }

        #[cfg(target_os = "windows")]
        {
            Platform::Windows
        }

        #[cfg(target_os = "linux")]
        {
            Platform::Linux
        }

        #[cfg(not(any(
            target_os = "android",
            target_os = "ios",
            target_os = "macos",
            target_os = "windows",
            target_os = "linux"
        )))]
        {
            Platform::Unknown(std::env::consts::OS.to_string())
        }
    }

    /// Parses the tag a host passes in when it creates a session.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "android" => Platform::Android,
            "ios" => Platform::Ios,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            other => Platform::Unknown(other.to_string()),
        }
    }

    /// Lower-case tag reported in the capability descriptor.
    pub fn tag(&self) -> &str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Unknown(name) => name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::MacOs => "macOS",
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Unknown(name) => name,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub os_version: String,
    pub has_front_camera: bool,
}

impl PlatformInfo {
    pub fn new(platform: Platform, os_version: impl Into<String>) -> Self {
        Self {
            platform,
            os_version: os_version.into(),
            has_front_camera: true,
        }
    }

    /// Desktop hosts don't report an OS release; mobile hosts pass theirs in.
    pub fn current() -> Self {
        Self::new(Platform::current(), "unknown")
    }

    pub fn with_front_camera(mut self, has_front_camera: bool) -> Self {
        self.has_front_camera = has_front_camera;
        self
    }

    /// e.g. "Android 14", "iOS 17.2"
    pub fn version_string(&self) -> String {
        format!("{} {}", self.platform.display_name(), self.os_version)
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::current()
    }
}
