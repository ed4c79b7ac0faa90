//! WebRTC leak suppression policy.
//!
//! Independent of the override engine: the host applies the network policy,
//! blocks media capture, cancels signaling requests, and removes the
//! peer-connection globals before page scripts run.

/// Most restrictive IP handling policy that still allows proxied traffic.
pub const IP_HANDLING_POLICY: &str = "disable_non_proxied_udp";

/// Content settings forced to [`MEDIA_SETTING`] for every origin.
pub const BLOCKED_MEDIA: [&str; 2] = ["camera", "microphone"];
pub const MEDIA_SETTING: &str = "block";
pub const ALL_URLS: &str = "<all_urls>";

/// Substrings marking a request as WebRTC signaling. Matched against the
/// lower-cased URL.
pub const SIGNALING_MARKERS: [&str; 8] = [
    "stun:",
    "turn:",
    "stun.",
    "turn.",
    "webrtc",
    "rtc",
    "ice",
    "candidate",
];

/// Window globals set to `undefined` at document start.
pub const WINDOW_ENTRY_POINTS: [&str; 3] = [
    "RTCPeerConnection",
    "webkitRTCPeerConnection",
    "mozRTCPeerConnection",
];

/// Navigator members set to `undefined` at document start.
pub const NAVIGATOR_ENTRY_POINTS: [&str; 3] = ["getUserMedia", "webkitGetUserMedia", "mozGetUserMedia"];

/// `navigator.mediaDevices` member removed alongside the legacy entries.
pub const MEDIA_DEVICES_ENTRY_POINT: &str = "getUserMedia";

/// Whether a request URL should be cancelled.
///
/// The marker set is broad (`"ice"` also matches `"service"`), trading
/// collateral blocking for leak coverage.
pub fn is_signaling_url(url: &str) -> bool {
    let url = url.to_lowercase();
    SIGNALING_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Document-start script that removes every entry point above.
pub fn suppression_script() -> String {
    let mut script = String::new();
    for name in WINDOW_ENTRY_POINTS {
        script.push_str(&format!("if (window.{0}) {{ window.{0} = undefined; }}\n", name));
    }
    for name in NAVIGATOR_ENTRY_POINTS {
        script.push_str(&format!("if (navigator.{0}) {{ navigator.{0} = undefined; }}\n", name));
    }
    script.push_str(&format!(
        "if (navigator.mediaDevices && navigator.mediaDevices.{0}) {{ navigator.mediaDevices.{0} = undefined; }}\n",
        MEDIA_DEVICES_ENTRY_POINT
    ));
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signaling_urls() {
        assert!(is_signaling_url("stun:stun.l.google.com:19302"));
        assert!(is_signaling_url("TURN:relay.example.net"));
        assert!(is_signaling_url("https://example.com/WebRTC/offer"));
        assert!(is_signaling_url("https://example.com/candidate?id=1"));
    }

    #[test]
    fn test_plain_urls_pass() {
        assert!(!is_signaling_url("https://example.com/index.html"));
        assert!(!is_signaling_url("https://cdn.example.org/app.js"));
    }

    #[test]
    fn test_suppression_script_covers_entry_points() {
        let script = suppression_script();
        for name in WINDOW_ENTRY_POINTS {
            assert!(script.contains(&format!("window.{} = undefined", name)));
        }
        for name in NAVIGATOR_ENTRY_POINTS {
            assert!(script.contains(&format!("navigator.{} = undefined", name)));
        }
        assert!(script.contains("navigator.mediaDevices.getUserMedia = undefined"));
        assert_eq!(script.lines().count(), 7);
    }

    #[test]
    fn test_broad_markers_catch_substrings() {
        assert!(is_signaling_url("https://example.com/services"));
    }
}
