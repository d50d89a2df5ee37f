//! Detection pattern tables.
//!
//! Each detector fires independently of the others and may fire multiple
//! times per input. All patterns are case-insensitive.

use std::sync::LazyLock;

use regex::Regex;

/// One substitution detector: what it matches, the label recorded per
/// firing, and the placeholder written into the output.
pub(crate) struct Detector {
    pub label: &'static str,
    pub placeholder: &'static str,
    pub regex: Regex,
}

pub(crate) static DETECTORS: LazyLock<Vec<Detector>> = LazyLock::new(|| {
    vec![
        // Numeric metrics: comma-grouped counts ("10,000") and numbers
        // with measurement units ("8500 steps", "5.2 km", "72 bpm").
        Detector {
            label: "METRIC_VALUE",
            placeholder: "[metric]",
            regex: Regex::new(
                r"(?i)\b\d{1,3}(?:,\d{3})+\b|\b\d+(?:\.\d+)?\s*(?:steps?|km|mi|miles?|kg|lbs?|pounds?|calories|kcal|bpm|reps?)\b",
            )
            .unwrap(),
        },
        // Relative and absolute date/time references. "may" is omitted:
        // the modal verb dominates real inputs.
        Detector {
            label: "TIMEFRAME",
            placeholder: "[timeframe]",
            regex: Regex::new(
                r"(?i)\b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|yesterday|today|tomorrow|tonight|last\s+(?:night|week|month)|this\s+(?:morning|week|month)|january|february|march|april|june|july|august|september|october|november|december)\b|\b\d{1,2}[/-]\d{1,2}(?:[/-]\d{2,4})?\b|\b\d{1,2}:\d{2}(?:\s*(?:am|pm))?\b",
            )
            .unwrap(),
        },
        // Named consumer fitness applications and services.
        Detector {
            label: "FITNESS_APP",
            placeholder: "[fitness app]",
            regex: Regex::new(
                r"(?i)\b(?:strava|myfitnesspal|apple\s+health|google\s+fit|samsung\s+health|nike\s+run\s+club|peloton|runkeeper|mapmyrun|zwift)\b",
            )
            .unwrap(),
        },
        // Named consumer wearable devices and models.
        Detector {
            label: "DEVICE_NAME",
            placeholder: "[wearable device]",
            regex: Regex::new(
                r"(?i)\b(?:apple\s+watch(?:\s+(?:series\s+\d+|ultra))?|fitbit(?:\s+(?:charge|versa|sense|inspire)\s*\d*)?|garmin(?:\s+(?:forerunner|fenix|venu)\s*\d*)?|oura\s+ring|whoop(?:\s+\d+\.0)?|galaxy\s+watch\s*\d*|pixel\s+watch\s*\d*|polar\s+(?:vantage|ignite)\s*\d*)\b",
            )
            .unwrap(),
        },
        // Place references. Curated venue nouns rather than a gazetteer;
        // overfires on e.g. "office hours" by design tradeoff.
        Detector {
            label: "LOCATION",
            placeholder: "[location]",
            regex: Regex::new(
                r"(?i)\b(?:(?:at|in|near|around)\s+(?:the\s+)?)?(?:gym|park|trailhead|swimming\s+pool|downtown|office|beach)\b",
            )
            .unwrap(),
        },
    ]
});

/// High-severity identifiers. These are never substituted: strict mode
/// aborts on them, non-strict mode flags the result.
pub(crate) static STRICT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "email address",
            Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
        ),
        (
            "phone number",
            Regex::new(r"(?:\+?\d{1,2}[\s.-]?)?\(?\d{3}\)?[\s.-]\d{3}[\s.-]?\d{4}\b").unwrap(),
        ),
    ]
});

/// Check whether text contains any detectable sensitive pattern,
/// substitutable or high-severity.
pub fn contains_sensitive(text: &str) -> bool {
    DETECTORS.iter().any(|d| d.regex.is_match(text))
        || STRICT_PATTERNS.iter().any(|(_, re)| re.is_match(text))
}
