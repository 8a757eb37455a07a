use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ChainScope, SymbolKind};

/// Which cadence produced a valuation. Part of the persistence key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationKind {
    Current,
    Daily,
}

/// Aggregate holdings value of one address.
///
/// Native fields are in native-coin units; fiat fields are derived from them
/// when the address's group is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressValuation {
    pub address: String,
    pub chain: ChainScope,
    pub kind: ValuationKind,
    pub as_of: DateTime<Utc>,
    pub total_fungible_value: Decimal,
    pub total_non_fungible_value: Decimal,
    #[serde(default)]
    pub fungible_fiat_value: Decimal,
    #[serde(default)]
    pub non_fungible_fiat_value: Decimal,
    pub record_count: u64,
    /// Total records seen by a single-address run. Absent for batch runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_record_count: Option<u64>,
}

impl AddressValuation {
    pub fn empty(
        address: impl Into<String>,
        chain: ChainScope,
        kind: ValuationKind,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            chain,
            kind,
            as_of,
            total_fungible_value: Decimal::ZERO,
            total_non_fungible_value: Decimal::ZERO,
            fungible_fiat_value: Decimal::ZERO,
            non_fungible_fiat_value: Decimal::ZERO,
            record_count: 0,
            run_record_count: None,
        }
    }

    /// A one-record partial valuation, routed into the bucket for `kind`.
    pub fn contribution(
        address: impl Into<String>,
        chain: ChainScope,
        kind: ValuationKind,
        as_of: DateTime<Utc>,
        symbol_kind: SymbolKind,
        value: Decimal,
    ) -> Self {
        let mut valuation = Self::empty(address, chain, kind, as_of);
        match symbol_kind {
            SymbolKind::Fungible => valuation.total_fungible_value = value,
            SymbolKind::NonFungible | SymbolKind::Unknown => {
                valuation.total_non_fungible_value = value
            }
        }
        valuation.record_count = 1;
        valuation
    }

    /// Merge another partial valuation of the same address into this one.
    pub fn accumulate(&mut self, other: AddressValuation) {
        debug_assert_eq!(self.address, other.address, "accumulate across addresses");
        self.total_fungible_value =
            self.saturating_sum(self.total_fungible_value, other.total_fungible_value);
        self.total_non_fungible_value =
            self.saturating_sum(self.total_non_fungible_value, other.total_non_fungible_value);
        self.record_count += other.record_count;
    }

    /// Fill the fiat fields from the native totals. A total too large to
    /// convert gets a zero fiat value.
    pub fn with_fiat(mut self, native_fiat_price: Decimal, fiat_decimals: u32) -> Self {
        self.fungible_fiat_value =
            self.fiat_of(self.total_fungible_value, native_fiat_price, fiat_decimals);
        self.non_fungible_fiat_value =
            self.fiat_of(self.total_non_fungible_value, native_fiat_price, fiat_decimals);
        self
    }

    pub fn total_value(&self) -> Decimal {
        self.total_fungible_value
            .saturating_add(self.total_non_fungible_value)
    }

    pub fn total_fiat_value(&self) -> Decimal {
        self.fungible_fiat_value
            .saturating_add(self.non_fungible_fiat_value)
    }

    fn saturating_sum(&self, total: Decimal, value: Decimal) -> Decimal {
        total.checked_add(value).unwrap_or_else(|| {
            warn!(
                address = %self.address,
                total = %total,
                value = %value,
                "holdings total overflowed, capping"
            );
            if value.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        })
    }

    fn fiat_of(&self, native: Decimal, native_fiat_price: Decimal, fiat_decimals: u32) -> Decimal {
        match native.checked_mul(native_fiat_price) {
            Some(value) => value.round_dp(fiat_decimals),
            None => {
                warn!(
                    address = %self.address,
                    native = %native,
                    price = %native_fiat_price,
                    "fiat value overflowed, valuing at zero"
                );
                Decimal::ZERO
            }
        }
    }
}
