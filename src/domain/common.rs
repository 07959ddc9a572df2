//! Shared traits and constants for ledger entities.

/// Exposes a stable identifier for entities stored in the ledger.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// First entity in `items` carrying `id`.
pub fn find_by_id<'a, T: Identifiable>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

/// Conventional transaction categories. Categories are free strings; this is
/// the set offered by default and the order used by expense breakdowns.
pub const DEFAULT_CATEGORIES: [&str; 11] = [
    "Food",
    "Transport",
    "Salary",
    "Bonus",
    "Shopping",
    "Rent",
    "Medical",
    "Education",
    "Investment",
    "Entertainment",
    "Other",
];

/// Display-only color tags offered when creating an account.
pub const ACCOUNT_COLORS: [&str; 6] = [
    "bg-blue-500",
    "bg-green-500",
    "bg-purple-500",
    "bg-orange-500",
    "bg-pink-500",
    "bg-indigo-500",
];

/// Label used wherever an account reference no longer resolves.
pub const UNKNOWN_ACCOUNT: &str = "Unknown account";
