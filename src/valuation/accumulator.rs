use crate::models::AddressValuation;

/// Holds the valuation of the address currently being accumulated.
///
/// A group closes only when a contribution for a different address arrives,
/// or when the stream ends. Page boundaries are invisible here, which is what
/// lets one address straddle two pages.
#[derive(Debug, Default)]
pub struct GroupAccumulator {
    open: Option<AddressValuation>,
}

impl GroupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a one-record contribution. Returns the group it closed, if any.
    pub fn push(&mut self, contribution: AddressValuation) -> Option<AddressValuation> {
        if let Some(open) = self.open.as_mut() {
            if open.address == contribution.address {
                open.accumulate(contribution);
                return None;
            }
        }
        self.open.replace(contribution)
    }

    /// End of stream: hand back the last open group.
    pub fn finish(&mut self) -> Option<AddressValuation> {
        self.open.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainScope, SymbolKind, ValuationKind};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn part(address: &str, value: i64) -> AddressValuation {
        AddressValuation::contribution(
            address,
            ChainScope::All,
            ValuationKind::Daily,
            Utc::now(),
            SymbolKind::Fungible,
            Decimal::from(value),
        )
    }

    #[test]
    fn closes_a_group_only_on_address_change() {
        let mut groups = GroupAccumulator::new();

        assert!(groups.push(part("A", 1)).is_none());
        assert!(groups.push(part("A", 2)).is_none());

        let closed = groups.push(part("B", 4)).expect("A closes");
        assert_eq!(closed.address, "A");
        assert_eq!(closed.total_fungible_value, Decimal::from(3));
        assert_eq!(closed.record_count, 2);

        let last = groups.finish().expect("B still open");
        assert_eq!(last.address, "B");
        assert!(groups.finish().is_none());
    }
}
