// Kernel log event detection with dedup and OOM-loop escalation

use crate::events::Severity;
use crate::watchdog::{Event, Findings, Remediation};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

/// Lines of context kept on each side of a matched line
const CONTEXT_LINES: usize = 3;
/// Upper bound for the context block attached to an alert
const MAX_CONTEXT_CHARS: usize = 1000;

pub const OOM_LOOP_WINDOW: Duration = Duration::minutes(30);
pub const OOM_LOOP_THRESHOLD: usize = 5;

static OOM_PROCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)killed process \d+ \(([^)]+)\)").expect("valid OOM process regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelEventKind {
    Oom,
    KernelPanic,
    FsReadOnly,
    IoError,
    HungTask,
}

impl KernelEventKind {
    pub const ALL: [KernelEventKind; 5] = [
        KernelEventKind::Oom,
        KernelEventKind::KernelPanic,
        KernelEventKind::FsReadOnly,
        KernelEventKind::IoError,
        KernelEventKind::HungTask,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KernelEventKind::Oom => "OOM killer",
            KernelEventKind::KernelPanic => "Kernel panic",
            KernelEventKind::FsReadOnly => "Filesystem read-only",
            KernelEventKind::IoError => "I/O error",
            KernelEventKind::HungTask => "Hung task",
        }
    }

    /// Lowercase substrings that identify this event
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            KernelEventKind::Oom => &["out of memory", "oom-killer", "oom_kill_process"],
            KernelEventKind::KernelPanic => &["kernel panic", "not syncing"],
            KernelEventKind::FsReadOnly => &["remounting filesystem read-only", "read-only file system"],
            KernelEventKind::IoError => &["i/o error", "blk_update_request", "buffer i/o error"],
            KernelEventKind::HungTask => &["blocked for more than", "hung_task"],
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }
}

/// Extract the killed process name from an OOM killer line
pub fn oom_process_name(line: &str) -> Option<String> {
    OOM_PROCESS
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Sliding window of OOM detections
#[derive(Debug, Clone)]
pub struct OomLoopDetector {
    hits: VecDeque<DateTime<Utc>>,
    window: Duration,
    threshold: usize,
}

impl Default for OomLoopDetector {
    fn default() -> Self {
        Self::new(OOM_LOOP_WINDOW, OOM_LOOP_THRESHOLD)
    }
}

impl OomLoopDetector {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            hits: VecDeque::new(),
            window,
            threshold: threshold.max(1),
        }
    }

    /// Record a detection. Returns true (and clears the window) when the loop threshold is hit.
    pub fn record(&mut self, now: DateTime<Utc>) -> bool {
        self.hits.push_back(now);
        while let Some(oldest) = self.hits.front() {
            if now - *oldest > self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }

        if self.hits.len() >= self.threshold {
            self.hits.clear();
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Scans kernel log windows for critical events.
///
/// The first scan only records baselines so that old entries still in the
/// ring buffer at startup do not alert. Afterwards each event kind alerts
/// once per distinct matched line.
#[derive(Debug, Clone)]
pub struct KernelWatchdog {
    initialized: bool,
    last_signature: HashMap<KernelEventKind, String>,
    oom_loop: OomLoopDetector,
    reboot_on_oom_loop: bool,
}

impl KernelWatchdog {
    pub fn new(reboot_on_oom_loop: bool) -> Self {
        Self {
            initialized: false,
            last_signature: HashMap::new(),
            oom_loop: OomLoopDetector::default(),
            reboot_on_oom_loop,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn oom_loop(&self) -> &OomLoopDetector {
        &self.oom_loop
    }

    pub fn scan(&mut self, lines: &[String], now: DateTime<Utc>) -> Findings {
        let mut findings = Findings::default();
        if lines.is_empty() {
            return findings;
        }

        for kind in KernelEventKind::ALL {
            let Some(index) = lines.iter().rposition(|l| kind.matches(l)) else {
                continue;
            };
            let line = &lines[index];

            if !self.initialized {
                tracing::debug!("Kernel baseline for {}: {}", kind.name(), line);
                self.last_signature.insert(kind, line.clone());
                continue;
            }

            if self.last_signature.get(&kind) == Some(line) {
                continue;
            }
            self.last_signature.insert(kind, line.clone());

            tracing::warn!("Kernel event {}: {}", kind.name(), line);
            let context = context_window(lines, index);
            let headline = match kind {
                KernelEventKind::Oom => match oom_process_name(line) {
                    Some(process) => format!("🚨 OOM killer terminated process '{}'", process),
                    None => "🚨 OOM killer invoked".to_string(),
                },
                other => format!("🚨 {} detected", other.name()),
            };
            findings.push(Event::critical(format!("{}\n\n{}", headline, context)));

            if kind == KernelEventKind::Oom {
                findings.extend(self.record_oom(now));
            }
        }

        self.initialized = true;
        findings
    }

    fn record_oom(&mut self, now: DateTime<Utc>) -> Findings {
        let mut findings = Findings::default();
        if !self.oom_loop.record(now) {
            return findings;
        }

        tracing::error!(
            "OOM loop: {} kills within {} minutes",
            OOM_LOOP_THRESHOLD,
            OOM_LOOP_WINDOW.num_minutes()
        );
        if self.reboot_on_oom_loop {
            findings.push(Event::critical(format!(
                "🔄 OOM loop detected ({} kills in {} min). Rebooting host now.",
                OOM_LOOP_THRESHOLD,
                OOM_LOOP_WINDOW.num_minutes()
            )));
            findings.act(Remediation::Reboot);
        } else {
            findings.push(Event::critical(format!(
                "🔄 OOM loop detected ({} kills in {} min). Automatic reboot is disabled.",
                OOM_LOOP_THRESHOLD,
                OOM_LOOP_WINDOW.num_minutes()
            )));
        }
        findings.push(Event::log(Severity::Action, "OOM loop escalation triggered"));
        findings
    }
}

/// ±CONTEXT_LINES around `index`, truncated to MAX_CONTEXT_CHARS
fn context_window(lines: &[String], index: usize) -> String {
    let start = index.saturating_sub(CONTEXT_LINES);
    let end = (index + CONTEXT_LINES + 1).min(lines.len());
    let joined = lines[start..end].join("\n");
    truncate_chars(&joined, MAX_CONTEXT_CHARS)
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
