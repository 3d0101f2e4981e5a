//! Vendor → category cache
//!
//! Seeded once per run from the ledger's history and grown as transactions are
//! categorized, so a vendor is only ever sent to the classifier once per run.

use std::collections::HashMap;

use crate::models::Category;

#[derive(Debug, Clone, Default)]
pub struct VendorCategoryCache {
    entries: HashMap<String, Category>,
}

impl VendorCategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from historical `(vendor, category)` pairs ordered oldest first.
    ///
    /// Later pairs overwrite earlier ones, so the most recent category wins.
    pub fn from_history<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Category)>,
    {
        let mut cache = Self::new();
        for (vendor, category) in pairs {
            cache.record(&vendor, category);
        }
        cache
    }

    pub fn lookup(&self, vendor: &str) -> Option<Category> {
        let key = vendor.trim();
        if key.is_empty() {
            return None;
        }
        self.entries.get(key).copied()
    }

    /// Remember a vendor's category. Empty vendors and `Debit` are ignored.
    pub fn record(&mut self, vendor: &str, category: Category) {
        let key = vendor.trim();
        if key.is_empty() || category == Category::Debit {
            return;
        }
        self.entries.insert(key.to_string(), category);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by vendor
    pub fn entries(&self) -> Vec<(&str, Category)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(vendor, category)| (vendor.as_str(), *category))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_miss_is_none() {
        let cache = VendorCategoryCache::new();
        assert_eq!(cache.lookup("Woolworths"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_record_and_lookup() {
        let mut cache = VendorCategoryCache::new();
        cache.record("Woolworths", Category::Groceries);
        assert_eq!(cache.lookup("Woolworths"), Some(Category::Groceries));
        assert_eq!(cache.lookup(" Woolworths "), Some(Category::Groceries));
        assert_eq!(cache.lookup("woolworths"), None);
    }

    #[test]
    fn test_record_ignores_empty_vendor_and_debit() {
        let mut cache = VendorCategoryCache::new();
        cache.record("", Category::Groceries);
        cache.record("   ", Category::Travel);
        cache.record("Transfer", Category::Debit);
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(""), None);
    }

    #[test]
    fn test_from_history_most_recent_wins() {
        let cache = VendorCategoryCache::from_history(vec![
            ("Bunnings".to_string(), Category::RentAndBills),
            ("Qantas".to_string(), Category::Travel),
            ("Bunnings".to_string(), Category::Car),
        ]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("Bunnings"), Some(Category::Car));
    }

    #[test]
    fn test_entries_sorted() {
        let cache = VendorCategoryCache::from_history(vec![
            ("Qantas".to_string(), Category::Travel),
            ("Aldi".to_string(), Category::Groceries),
        ]);
        let entries = cache.entries();
        assert_eq!(entries[0], ("Aldi", Category::Groceries));
        assert_eq!(entries[1], ("Qantas", Category::Travel));
    }
}
