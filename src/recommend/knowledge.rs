//! The static recommendation knowledge base.
//!
//! Maps a module name (exact, case-sensitive) to candidate features and
//! business rules. The built-in table is assembled once per process; other
//! tables can be loaded from JSON shaped like
//! `{"Module Name": {"features": [...], "rules": [...]}}`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::RecommendationKind;

/// Candidate features and business rules for one module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl Recommendations {
    pub fn get(&self, kind: RecommendationKind) -> &[String] {
        match kind {
            RecommendationKind::Feature => &self.features,
            RecommendationKind::BusinessRule => &self.rules,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.rules.is_empty()
    }

    /// Drop blank and repeated entries, keeping first occurrences in order.
    pub(crate) fn normalized(self) -> Self {
        Self {
            features: dedup(self.features),
            rules: dedup(self.rules),
        }
    }
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

static EMPTY: Recommendations = Recommendations {
    features: Vec::new(),
    rules: Vec::new(),
};

static BUILTIN: Lazy<KnowledgeBase> = Lazy::new(|| {
    let entries = BUILTIN_TABLE
        .iter()
        .map(|(name, features, rules)| {
            (
                name.to_string(),
                Recommendations {
                    features: features.iter().map(|s| s.to_string()).collect(),
                    rules: rules.iter().map(|s| s.to_string()).collect(),
                },
            )
        })
        .collect();
    KnowledgeBase { entries }
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    entries: HashMap<String, Recommendations>,
}

impl KnowledgeBase {
    /// The table shipped with the crate.
    pub fn builtin() -> &'static KnowledgeBase {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, Recommendations> =
            serde_json::from_str(json).context("Failed to parse knowledge base")?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(name, recs)| (name, recs.normalized()))
                .collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge base {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Candidates for a module name. Unknown names get empty lists.
    pub fn lookup(&self, module_name: &str) -> &Recommendations {
        self.entries.get(module_name).unwrap_or(&EMPTY)
    }

    pub fn candidates(&self, module_name: &str, kind: RecommendationKind) -> &[String] {
        self.lookup(module_name).get(kind)
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.entries.contains_key(module_name)
    }

    /// Known module names, sorted.
    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn insert(&mut self, module_name: impl Into<String>, recs: Recommendations) {
        self.entries.insert(module_name.into(), recs.normalized());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type Entry = (&'static str, &'static [&'static str], &'static [&'static str]);

const BUILTIN_TABLE: &[Entry] = &[
    (
        "Login & Authentication",
        &[
            "Email and password login",
            "Social login (Google, GitHub)",
            "Password reset via email",
            "Two-factor authentication",
            "JWT token management",
            "Session timeout and auto-logout",
            "Remember me option",
            "Account lockout after failed attempts",
        ],
        &[
            "Passwords must be at least 8 characters with one number and one symbol",
            "Lock the account for 15 minutes after 5 failed login attempts",
            "Password reset links expire after 1 hour",
            "Access tokens expire after 15 minutes; refresh tokens after 7 days",
            "Users must verify their email address before first login",
        ],
    ),
    (
        "User Management",
        &[
            "User registration",
            "Profile editing",
            "Role-based access control",
            "User invitation by email",
            "Account deactivation",
            "Bulk user import",
            "Activity log per user",
        ],
        &[
            "Email addresses must be unique across all users",
            "Only administrators can change user roles",
            "Deactivated users cannot log in but their data is retained",
            "Users can only edit their own profile unless they are administrators",
        ],
    ),
    (
        "Dashboard",
        &[
            "Key metrics overview cards",
            "Recent activity feed",
            "Customizable widget layout",
            "Date range selector",
            "Quick action shortcuts",
            "Charts for trends over time",
        ],
        &[
            "Dashboard data refreshes at most every 5 minutes",
            "Users only see metrics for data they have access to",
            "Widget layout is saved per user",
        ],
    ),
    (
        "Payment Processing",
        &[
            "Credit and debit card payments",
            "Digital wallet support",
            "Saved payment methods",
            "Refund processing",
            "Payment receipts by email",
            "Recurring billing",
            "Failed payment retry",
        ],
        &[
            "Card data is never stored on our servers",
            "Refunds cannot exceed the original payment amount",
            "Failed recurring payments are retried 3 times over 7 days",
            "All amounts are stored in the smallest currency unit",
            "Payments above the fraud threshold require manual review",
        ],
    ),
    (
        "Shopping Cart",
        &[
            "Add and remove items",
            "Quantity adjustment",
            "Persistent cart across sessions",
            "Discount code entry",
            "Estimated shipping cost",
            "Save for later",
        ],
        &[
            "Cart items are reserved for 30 minutes during checkout",
            "Only one discount code can be applied per order",
            "Quantities cannot exceed available stock",
            "Guest carts expire after 7 days",
        ],
    ),
    (
        "Product Catalog",
        &[
            "Product listing with pagination",
            "Product detail page",
            "Category navigation",
            "Product image gallery",
            "Product variants (size, color)",
            "Stock availability indicator",
            "Related products",
        ],
        &[
            "Every product must belong to at least one category",
            "Out-of-stock products remain visible but cannot be purchased",
            "Prices are displayed including applicable taxes",
        ],
    ),
    (
        "Order Management",
        &[
            "Order history",
            "Order status tracking",
            "Order cancellation",
            "Invoice generation",
            "Return requests",
            "Admin order search",
        ],
        &[
            "Orders can only be cancelled before they ship",
            "Returns are accepted within 30 days of delivery",
            "Order numbers are sequential and never reused",
            "Status changes are recorded with a timestamp and actor",
        ],
    ),
    (
        "Notifications",
        &[
            "In-app notification center",
            "Email notifications",
            "Push notifications",
            "Notification preferences",
            "Mark all as read",
            "Digest emails",
        ],
        &[
            "Users can opt out of every non-transactional notification",
            "Transactional emails are sent within 1 minute of the event",
            "Notifications older than 90 days are archived",
        ],
    ),
    (
        "Reporting & Analytics",
        &[
            "Predefined reports",
            "Custom report builder",
            "Export to CSV and PDF",
            "Scheduled report delivery",
            "Interactive charts",
            "Data filters and drill-down",
        ],
        &[
            "Reports only include data the requesting user may access",
            "Exports larger than 10,000 rows are generated asynchronously",
            "Scheduled reports are delivered in the recipient's time zone",
        ],
    ),
    (
        "Search",
        &[
            "Full-text search",
            "Autocomplete suggestions",
            "Faceted filtering",
            "Sort by relevance, date, or name",
            "Recent searches",
            "Typo tolerance",
        ],
        &[
            "Search results respect the user's access permissions",
            "Queries shorter than 2 characters are not executed",
            "Recent searches are kept for 30 days",
        ],
    ),
    (
        "Messaging",
        &[
            "One-to-one chat",
            "Group conversations",
            "File attachments",
            "Read receipts",
            "Typing indicators",
            "Message search",
        ],
        &[
            "Messages can be edited for 15 minutes after sending",
            "Attachments are limited to 25 MB",
            "Blocked users cannot start conversations",
        ],
    ),
    (
        "File Management",
        &[
            "File upload with drag and drop",
            "Folder organization",
            "File preview",
            "Sharing with permissions",
            "Version history",
            "Storage quota display",
        ],
        &[
            "Uploads are scanned for malware before becoming available",
            "Deleted files stay in the trash for 30 days",
            "Shared links can be set to expire",
        ],
    ),
    (
        "Settings",
        &[
            "Account settings",
            "Theme selection",
            "Language and region",
            "Privacy controls",
            "Connected apps management",
            "Data export request",
        ],
        &[
            "Changing the email address requires re-verification",
            "Data export requests are fulfilled within 30 days",
            "Settings changes take effect immediately",
        ],
    ),
    (
        "Admin Panel",
        &[
            "User administration",
            "System configuration",
            "Audit log viewer",
            "Content moderation queue",
            "Feature flag management",
            "System health overview",
        ],
        &[
            "Every admin action is written to the audit log",
            "Admin access requires two-factor authentication",
            "Audit logs are retained for at least 1 year",
        ],
    ),
];
