//! Browser impersonation profiles
//!
//! A profile names a browser whose request fingerprint should be mimicked.
//! The reqwest-backed session can only reproduce the header layer of that
//! fingerprint; TLS/HTTP2 handshake shaping is left to transports that
//! support it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Browser fingerprint target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Impersonate {
    /// Latest stable desktop Chrome
    #[default]
    #[serde(rename = "chrome")]
    Chrome,
    #[serde(rename = "chrome120")]
    Chrome120,
    #[serde(rename = "chrome124")]
    Chrome124,
    #[serde(rename = "chrome131")]
    Chrome131,
    /// Chrome on Android
    #[serde(rename = "chrome_android")]
    ChromeAndroid,
    /// Latest stable desktop Edge
    #[serde(rename = "edge")]
    Edge,
    #[serde(rename = "edge101")]
    Edge101,
    /// Latest stable desktop Firefox
    #[serde(rename = "firefox")]
    Firefox,
    #[serde(rename = "firefox133")]
    Firefox133,
    /// Latest stable desktop Safari
    #[serde(rename = "safari")]
    Safari,
    #[serde(rename = "safari17_0")]
    Safari17_0,
    #[serde(rename = "safari18_0")]
    Safari18_0,
    /// Safari on iOS
    #[serde(rename = "safari_ios")]
    SafariIos,
}

const PROFILES: &[(Impersonate, &str)] = &[
    (Impersonate::Chrome, "chrome"),
    (Impersonate::Chrome120, "chrome120"),
    (Impersonate::Chrome124, "chrome124"),
    (Impersonate::Chrome131, "chrome131"),
    (Impersonate::ChromeAndroid, "chrome_android"),
    (Impersonate::Edge, "edge"),
    (Impersonate::Edge101, "edge101"),
    (Impersonate::Firefox, "firefox"),
    (Impersonate::Firefox133, "firefox133"),
    (Impersonate::Safari, "safari"),
    (Impersonate::Safari17_0, "safari17_0"),
    (Impersonate::Safari18_0, "safari18_0"),
    (Impersonate::SafariIos, "safari_ios"),
];

const NAVIGATE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const PLAIN_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

enum Family {
    Chromium {
        brand: &'static str,
        version: u16,
        mobile: bool,
    },
    Firefox {
        version: u16,
    },
    Safari {
        version: &'static str,
        ios: bool,
    },
}

impl Impersonate {
    /// All supported profiles
    pub fn all() -> impl Iterator<Item = Impersonate> {
        PROFILES.iter().map(|(profile, _)| *profile)
    }

    /// Wire name of this profile
    pub fn as_str(&self) -> &'static str {
        PROFILES
            .iter()
            .find(|(profile, _)| profile == self)
            .map(|(_, name)| *name)
            .unwrap_or("chrome")
    }

    fn family(&self) -> Family {
        match self {
            Impersonate::Chrome | Impersonate::Chrome131 => Family::Chromium {
                brand: "Google Chrome",
                version: 131,
                mobile: false,
            },
            Impersonate::Chrome120 => Family::Chromium {
                brand: "Google Chrome",
                version: 120,
                mobile: false,
            },
            Impersonate::Chrome124 => Family::Chromium {
                brand: "Google Chrome",
                version: 124,
                mobile: false,
            },
            Impersonate::ChromeAndroid => Family::Chromium {
                brand: "Google Chrome",
                version: 131,
                mobile: true,
            },
            Impersonate::Edge => Family::Chromium {
                brand: "Microsoft Edge",
                version: 131,
                mobile: false,
            },
            Impersonate::Edge101 => Family::Chromium {
                brand: "Microsoft Edge",
                version: 101,
                mobile: false,
            },
            Impersonate::Firefox | Impersonate::Firefox133 => Family::Firefox { version: 133 },
            Impersonate::Safari | Impersonate::Safari18_0 => Family::Safari {
                version: "18.0",
                ios: false,
            },
            Impersonate::Safari17_0 => Family::Safari {
                version: "17.0",
                ios: false,
            },
            Impersonate::SafariIos => Family::Safari {
                version: "18.0",
                ios: true,
            },
        }
    }

    /// User-Agent string sent by this profile
    pub fn user_agent(&self) -> String {
        match self.family() {
            Family::Chromium {
                brand,
                version,
                mobile,
            } => {
                let platform = if mobile {
                    "Linux; Android 10; K"
                } else {
                    "Windows NT 10.0; Win64; x64"
                };
                let suffix = if mobile { "Mobile Safari/537.36" } else { "Safari/537.36" };
                let edge = if brand == "Microsoft Edge" {
                    format!(" Edg/{version}.0.0.0")
                } else {
                    String::new()
                };
                format!(
                    "Mozilla/5.0 ({platform}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version}.0.0.0 {suffix}{edge}"
                )
            }
            Family::Firefox { version } => format!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:{version}.0) Gecko/20100101 Firefox/{version}.0"
            ),
            Family::Safari { version, ios } => {
                if ios {
                    format!(
                        "Mozilla/5.0 (iPhone; CPU iPhone OS 18_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{version} Mobile/15E148 Safari/604.1"
                    )
                } else {
                    format!(
                        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/{version} Safari/605.1.15"
                    )
                }
            }
        }
    }

    /// Default request headers a real browser of this family sends
    pub fn default_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("user-agent", self.user_agent())];
        match self.family() {
            Family::Chromium {
                brand,
                version,
                mobile,
            } => {
                headers.push((
                    "sec-ch-ua",
                    format!(
                        "\"{brand}\";v=\"{version}\", \"Chromium\";v=\"{version}\", \"Not_A Brand\";v=\"24\""
                    ),
                ));
                headers.push(("sec-ch-ua-mobile", if mobile { "?1" } else { "?0" }.to_string()));
                headers.push((
                    "sec-ch-ua-platform",
                    if mobile { "\"Android\"" } else { "\"Windows\"" }.to_string(),
                ));
                headers.push(("upgrade-insecure-requests", "1".to_string()));
                headers.push(("accept", NAVIGATE_ACCEPT.to_string()));
                headers.push(("sec-fetch-site", "none".to_string()));
                headers.push(("sec-fetch-mode", "navigate".to_string()));
                headers.push(("sec-fetch-user", "?1".to_string()));
                headers.push(("sec-fetch-dest", "document".to_string()));
                headers.push(("accept-language", "en-US,en;q=0.9".to_string()));
            }
            Family::Firefox { .. } => {
                headers.push(("accept", PLAIN_ACCEPT.to_string()));
                headers.push(("accept-language", "en-US,en;q=0.5".to_string()));
                headers.push(("upgrade-insecure-requests", "1".to_string()));
                headers.push(("sec-fetch-dest", "document".to_string()));
                headers.push(("sec-fetch-mode", "navigate".to_string()));
                headers.push(("sec-fetch-site", "none".to_string()));
                headers.push(("sec-fetch-user", "?1".to_string()));
            }
            Family::Safari { .. } => {
                headers.push(("accept", PLAIN_ACCEPT.to_string()));
                headers.push(("accept-language", "en-US,en;q=0.9".to_string()));
                headers.push(("sec-fetch-dest", "document".to_string()));
                headers.push(("sec-fetch-mode", "navigate".to_string()));
                headers.push(("sec-fetch-site", "none".to_string()));
            }
        }
        headers
    }
}

impl FromStr for Impersonate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PROFILES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(profile, _)| *profile)
            .ok_or_else(|| {
                let names: Vec<&str> = PROFILES.iter().map(|(_, name)| *name).collect();
                format!(
                    "Unknown impersonate target '{}'. Expected one of: {}",
                    s,
                    names.join(", ")
                )
            })
    }
}

impl fmt::Display for Impersonate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
