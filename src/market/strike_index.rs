//! Sorted strike lookup.
//!
//! "Exact strike, else nearest" is the common leg-selection primitive. The
//! index sorts one option type's contracts by strike once and answers nearest
//! queries by binary search.

use super::types::Contract;

/// Contracts of a single type ordered by strike ascending.
#[derive(Debug, Clone, Default)]
pub struct StrikeIndex<'a> {
    contracts: Vec<&'a Contract>,
}

impl<'a> StrikeIndex<'a> {
    pub fn new(contracts: impl IntoIterator<Item = &'a Contract>) -> Self {
        let mut contracts: Vec<&'a Contract> = contracts.into_iter().collect();
        contracts.sort_by(|a, b| a.strike_price.total_cmp(&b.strike_price));
        Self { contracts }
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Contract> + '_ {
        self.contracts.iter().copied()
    }

    /// Contract whose strike is closest to `price`. Ties go to the lower strike.
    pub fn nearest(&self, price: f64) -> Option<&'a Contract> {
        nearest_in(&self.contracts, price)
    }

    /// Closest to `price` among strikes strictly below `ceiling`.
    pub fn nearest_below(&self, price: f64, ceiling: f64) -> Option<&'a Contract> {
        let end = self.contracts.partition_point(|c| c.strike_price < ceiling);
        nearest_in(&self.contracts[..end], price)
    }

    /// Closest to `price` among strikes strictly above `floor`.
    pub fn nearest_above(&self, price: f64, floor: f64) -> Option<&'a Contract> {
        let start = self.contracts.partition_point(|c| c.strike_price <= floor);
        nearest_in(&self.contracts[start..], price)
    }

    /// Contracts with strikes in `[low, high]`.
    pub fn within(&self, low: f64, high: f64) -> &[&'a Contract] {
        let start = self.contracts.partition_point(|c| c.strike_price < low);
        let end = self.contracts.partition_point(|c| c.strike_price <= high);
        if start >= end {
            return &[];
        }
        &self.contracts[start..end]
    }
}

fn nearest_in<'a>(sorted: &[&'a Contract], price: f64) -> Option<&'a Contract> {
    if sorted.is_empty() || price.is_nan() {
        return None;
    }
    let idx = sorted.partition_point(|c| c.strike_price < price);
    let above = sorted.get(idx).copied();
    let below = idx.checked_sub(1).and_then(|i| sorted.get(i)).copied();
    match (below, above) {
        (Some(b), Some(a)) => {
            if (price - b.strike_price) <= (a.strike_price - price) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (b, a) => b.or(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::OptionType;

    fn chain(strikes: &[f64]) -> Vec<Contract> {
        strikes
            .iter()
            .map(|k| Contract::new(format!("C{k}"), OptionType::Call, *k))
            .collect()
    }

    #[test]
    fn test_sorted_on_build() {
        let contracts = chain(&[110.0, 95.0, 100.0, 105.0]);
        let index = StrikeIndex::new(&contracts);
        let strikes: Vec<f64> = index.iter().map(|c| c.strike_price).collect();
        assert_eq!(strikes, vec![95.0, 100.0, 105.0, 110.0]);
    }

    #[test]
    fn test_nearest() {
        let contracts = chain(&[95.0, 100.0, 105.0, 110.0]);
        let index = StrikeIndex::new(&contracts);
        assert_eq!(index.nearest(100.0).map(|c| c.strike_price), Some(100.0));
        assert_eq!(index.nearest(103.0).map(|c| c.strike_price), Some(105.0));
        assert_eq!(index.nearest(102.5).map(|c| c.strike_price), Some(100.0));
        assert_eq!(index.nearest(50.0).map(|c| c.strike_price), Some(95.0));
        assert_eq!(index.nearest(500.0).map(|c| c.strike_price), Some(110.0));
        assert!(StrikeIndex::default().nearest(100.0).is_none());
    }

    #[test]
    fn test_nearest_strictly_outside() {
        let contracts = chain(&[90.0, 95.0, 100.0, 105.0, 110.0]);
        let index = StrikeIndex::new(&contracts);
        // Target would be the ceiling itself; must fall strictly below
        assert_eq!(index.nearest_below(100.0, 100.0).map(|c| c.strike_price), Some(95.0));
        assert_eq!(index.nearest_above(100.0, 100.0).map(|c| c.strike_price), Some(105.0));
        assert_eq!(index.nearest_below(70.0, 100.0).map(|c| c.strike_price), Some(90.0));
        assert!(index.nearest_below(80.0, 90.0).is_none());
        assert!(index.nearest_above(120.0, 110.0).is_none());
    }

    #[test]
    fn test_within() {
        let contracts = chain(&[90.0, 95.0, 100.0, 105.0, 110.0]);
        let index = StrikeIndex::new(&contracts);
        let strikes: Vec<f64> = index.within(95.0, 105.0).iter().map(|c| c.strike_price).collect();
        assert_eq!(strikes, vec![95.0, 100.0, 105.0]);
        assert!(index.within(111.0, 120.0).is_empty());
        assert!(index.within(105.0, 95.0).is_empty());
    }
}
