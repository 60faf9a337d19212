use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Package tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Basic,
    Standard,
    Premium,
}

/// Entitlements copied from the purchased package onto the post.
///
/// The snapshot is taken at creation time so later package edits never
/// change the timing arithmetic of an already-running post. Stored as a
/// JSONB column on the post row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSnapshot {
    pub package_id: Uuid,
    pub name: String,
    pub package_type: PackageType,
    pub price: f64,
    pub currency_id: String,
    /// How long the package entitlements (boosting included) stay valid
    pub duration_days: i64,
    /// Lifetime granted to the post itself
    pub post_lifetime_days: i64,
    /// Interval between scheduled boosts
    pub boost_interval_days: i64,
    pub has_photo: bool,
    pub has_highlight: bool,
    pub has_boost: bool,
}

impl PackageSnapshot {
    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: f64) -> PackageSnapshot {
        PackageSnapshot {
            package_id: Uuid::new_v4(),
            name: "Standard".to_string(),
            package_type: PackageType::Standard,
            price,
            currency_id: "EUR".to_string(),
            duration_days: 7,
            post_lifetime_days: 30,
            boost_interval_days: 3,
            has_photo: true,
            has_highlight: false,
            has_boost: true,
        }
    }

    #[test]
    fn test_free_package() {
        assert!(snapshot(0.0).is_free());
        assert!(!snapshot(9.99).is_free());
    }
}
