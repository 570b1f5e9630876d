//! User-agent parsing for the diagnostic fields stored on a session.

/// Coarse device category derived from a user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

/// Parsed user-agent details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDetails {
    pub browser: &'static str,
    pub os: &'static str,
    pub device_type: DeviceType,
}

impl DeviceDetails {
    /// Human readable label such as `"Chrome on macOS"`.
    pub fn display_name(&self) -> String {
        format!("{} on {}", self.browser, self.os)
    }
}

/// Parse browser, operating system and device type from a user agent.
pub fn parse_user_agent(user_agent: &str) -> DeviceDetails {
    let ua = user_agent.to_lowercase();
    DeviceDetails {
        browser: detect_browser(&ua),
        os: detect_os(&ua),
        device_type: detect_device_type(&ua),
    }
}

/// Device name recorded on the session, or `None` when no user agent was sent.
pub fn device_name(user_agent: Option<&str>) -> Option<String> {
    user_agent
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .map(|ua| parse_user_agent(ua).display_name())
}

// Edge and Opera embed "chrome/", Chrome embeds "safari/": order matters.
fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("edg/") || ua.contains("edge/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("firefox/") {
        "Firefox"
    } else if ua.contains("chrome/") && !ua.contains("chromium") {
        "Chrome"
    } else if ua.contains("safari/") {
        "Safari"
    } else if ua.contains("curl/") {
        "curl"
    } else {
        "Unknown Browser"
    }
}

fn detect_os(ua: &str) -> &'static str {
    if ua.contains("windows") {
        "Windows"
    } else if ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    } else if ua.contains("mac os x") || ua.contains("macintosh") {
        "macOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("cros") {
        "ChromeOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown OS"
    }
}

fn detect_device_type(ua: &str) -> DeviceType {
    if ua.contains("ipad") || ua.contains("tablet") {
        DeviceType::Tablet
    } else if ua.contains("mobile") || ua.contains("iphone") || ua.contains("android") {
        DeviceType::Mobile
    } else if ua.contains("windows")
        || ua.contains("macintosh")
        || ua.contains("linux")
        || ua.contains("cros")
    {
        DeviceType::Desktop
    } else {
        DeviceType::Unknown
    }
}
