//! Ordered error and permission signatures.
//!
//! Rule order is priority order: the first rule whose pattern matches the
//! message body decides the classification.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Error signature recognised in a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FatalException,
    NativeCrash,
    OutOfMemory,
    NullPointer,
    PermissionDenied,
    NetworkError,
    StorageError,
    CrashAnr,
    SecurityException,
    IllegalState,
    RuntimeException,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FatalException => "fatal_exception",
            Self::NativeCrash => "native_crash",
            Self::OutOfMemory => "out_of_memory",
            Self::NullPointer => "null_pointer",
            Self::PermissionDenied => "permission_denied",
            Self::NetworkError => "network_error",
            Self::StorageError => "storage_error",
            Self::CrashAnr => "crash_anr",
            Self::SecurityException => "security_exception",
            Self::IllegalState => "illegal_state",
            Self::RuntimeException => "runtime_exception",
        }
    }

    pub const fn severity(&self) -> Severity {
        match self {
            Self::FatalException | Self::NativeCrash | Self::OutOfMemory => Severity::Critical,
            Self::PermissionDenied => Severity::High,
            _ => Severity::Medium,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission family named by a permission-denied message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Camera,
    Location,
    Storage,
    Network,
    PhoneState,
    Contacts,
    Sms,
}

impl PermissionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Location => "location",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::PhoneState => "phone_state",
            Self::Contacts => "contacts",
            Self::Sms => "sms",
        }
    }
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ERROR_SIGNATURES: &[(ErrorKind, &str)] = &[
    (ErrorKind::FatalException, r"FATAL EXCEPTION:"),
    (ErrorKind::NativeCrash, r"(?:\*\*\*\s*)?FATAL EXCEPTION IN SYSTEM PROCESS"),
    (ErrorKind::OutOfMemory, r"OutOfMemoryError"),
    (ErrorKind::NullPointer, r"java\.lang\.NullPointerException"),
    (ErrorKind::PermissionDenied, r"Permission denied"),
    (
        ErrorKind::NetworkError,
        r"java\.net\.ConnectException|Connection refused|Network is unreachable",
    ),
    (ErrorKind::StorageError, r"java\.io\.FileNotFoundException"),
    (ErrorKind::CrashAnr, r"ANR in (.+)"),
    (ErrorKind::SecurityException, r"SecurityException"),
    (ErrorKind::IllegalState, r"IllegalStateException"),
    (ErrorKind::RuntimeException, r"RuntimeException"),
];

const PERMISSION_SIGNATURES: &[(PermissionKind, &str)] = &[
    (PermissionKind::Camera, r"camera"),
    (PermissionKind::Location, r"location|gps|ACCESS_FINE_LOCATION"),
    (
        PermissionKind::Storage,
        r"storage|external|READ_EXTERNAL_STORAGE|WRITE_EXTERNAL_STORAGE",
    ),
    (
        PermissionKind::Network,
        r"network|internet|ACCESS_NETWORK_STATE",
    ),
    (PermissionKind::PhoneState, r"phone_state|READ_PHONE_STATE"),
    (PermissionKind::Contacts, r"contacts|READ_CONTACTS|WRITE_CONTACTS"),
    (PermissionKind::Sms, r"sms|SEND_SMS|READ_SMS"),
];

static STANDARD_CATALOG: LazyLock<PatternCatalog> = LazyLock::new(PatternCatalog::standard);

fn case_insensitive(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("Invalid regex pattern")
}

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub kind: ErrorKind,
    pub pattern: Regex,
    pub severity: Severity,
}

impl ClassificationRule {
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct PermissionRule {
    pub kind: PermissionKind,
    pub pattern: Regex,
}

impl PermissionRule {
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Immutable ordered rule tables.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    rules: Vec<ClassificationRule>,
    permission_rules: Vec<PermissionRule>,
}

impl PatternCatalog {
    /// Build the Android error taxonomy.
    pub fn standard() -> Self {
        let rules = ERROR_SIGNATURES
            .iter()
            .map(|(kind, pattern)| ClassificationRule {
                kind: *kind,
                pattern: case_insensitive(pattern),
                severity: kind.severity(),
            })
            .collect();

        let permission_rules = PERMISSION_SIGNATURES
            .iter()
            .map(|(kind, pattern)| PermissionRule {
                kind: *kind,
                pattern: case_insensitive(pattern),
            })
            .collect();

        Self {
            rules,
            permission_rules,
        }
    }

    /// Shared instance of the standard catalog.
    pub fn global() -> &'static PatternCatalog {
        &STANDARD_CATALOG
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn permission_rules(&self) -> &[PermissionRule] {
        &self.permission_rules
    }

    /// First error rule matching `body`.
    pub fn match_error(&self, body: &str) -> Option<&ClassificationRule> {
        self.rules.iter().find(|rule| rule.pattern.is_match(body))
    }

    /// First permission family named in `body`.
    pub fn match_permission(&self, body: &str) -> Option<PermissionKind> {
        self.permission_rules
            .iter()
            .find(|rule| rule.pattern.is_match(body))
            .map(|rule| rule.kind)
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
