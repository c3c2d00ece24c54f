//! Property tests for the store invariants over random mutation sequences.

use chrono::NaiveDate;
use proptest::collection::vec;
use proptest::prelude::*;
use rust_decimal::Decimal;

use ratebook_common::{reciprocal_factor, Currency, CurrencyCode, NewRate, RateKey, RatebookError};
use ratebook_store::{MemoryStore, RateStore};

const CODES: [&str; 4] = ["EUR", "GBP", "JPY", "USD"];

#[derive(Debug, Clone)]
enum Op {
    SaveCurrency(usize, bool),
    DeleteCurrency(usize),
    SaveRate(usize, usize, i64, u32),
    DeleteRate(usize, usize, u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, any::<bool>()).prop_map(|(c, base)| Op::SaveCurrency(c, base)),
        (0..4usize).prop_map(Op::DeleteCurrency),
        (0..4usize, 0..4usize, factor_units(), 1..4u32)
            .prop_map(|(from, to, units, d)| Op::SaveRate(from, to, units, d)),
        (0..4usize, 0..4usize, 1..4u32).prop_map(|(from, to, d)| Op::DeleteRate(from, to, d)),
    ]
}

/// Factors in ten-thousandths, spanning values whose reciprocal vanishes at
/// scale 4 as well as ordinary ones.
fn factor_units() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        1..500_000i64,
        150_000_000..400_000_000i64,
    ]
}

fn code(i: usize) -> CurrencyCode {
    CurrencyCode::parse(CODES[i]).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

async fn apply(store: &MemoryStore, op: Op) {
    let result = match op {
        Op::SaveCurrency(c, base) => {
            let mut currency = Currency::new(code(c), CODES[c], "");
            currency.is_base = base;
            store.upsert_currency(currency).await.map(|_| ())
        }
        Op::DeleteCurrency(c) => store.delete_currency(&code(c)).await.map(|_| ()),
        Op::SaveRate(from, to, units, d) => store
            .upsert_rate(NewRate::new(code(from), code(to), Decimal::new(units, 4)).on(day(d)))
            .await
            .map(|_| ()),
        Op::DeleteRate(from, to, d) => store
            .delete_rate(&RateKey::new(code(from), code(to), day(d)))
            .await
            .map(|_| ()),
    };

    match result {
        Ok(())
        | Err(RatebookError::CurrencyNotFound(_))
        | Err(RatebookError::SameCurrencyRate(_))
        | Err(RatebookError::UnrepresentableFactor { .. }) => {}
        Err(e) => panic!("unexpected store error: {e}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn exactly_one_base_whenever_currencies_exist(ops in vec(op(), 1..40)) {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            for op in ops {
                apply(&store, op).await;

                let currencies = store.list_currencies().await.unwrap();
                let bases = currencies.iter().filter(|c| c.is_base).count();
                prop_assert_eq!(bases, usize::from(!currencies.is_empty()));
                prop_assert_eq!(store.find_base().await.unwrap().is_some(), !currencies.is_empty());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn every_rate_has_a_matching_reciprocal(ops in vec(op(), 1..60)) {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            for c in 0..CODES.len() {
                apply(&store, Op::SaveCurrency(c, false)).await;
            }

            for op in ops {
                apply(&store, op).await;

                for rate in store.all_rates() {
                    let reciprocal = store.get_rate(&rate.key().reciprocal()).await.unwrap();
                    prop_assert!(reciprocal.is_some(), "missing reciprocal of {}", rate);
                    let reciprocal = reciprocal.unwrap();

                    prop_assert_eq!(rate.factor.is_zero(), reciprocal.factor.is_zero());
                    // Whichever direction was written last determines the other.
                    prop_assert!(
                        reciprocal.factor == reciprocal_factor(rate.factor, 4)
                            || rate.factor == reciprocal_factor(reciprocal.factor, 4),
                        "{} and {} are not reciprocal",
                        rate,
                        reciprocal
                    );
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn resaving_rates_keeps_record_identity(ops in vec(op(), 1..40)) {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            for c in 0..CODES.len() {
                apply(&store, Op::SaveCurrency(c, false)).await;
            }
            for op in ops {
                apply(&store, op).await;
            }

            let before = store.all_rates();
            for rate in &before {
                store
                    .upsert_rate(NewRate::new(rate.from.clone(), rate.to.clone(), rate.factor).on(rate.date))
                    .await
                    .unwrap();
            }
            let after = store.all_rates();

            prop_assert_eq!(before.len(), after.len());
            for (b, a) in before.iter().zip(after.iter()) {
                prop_assert_eq!(b.id, a.id);
                prop_assert_eq!(b.key(), a.key());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
