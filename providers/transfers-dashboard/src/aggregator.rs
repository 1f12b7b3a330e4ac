//! Hourly rollup of transfer records
//!
//! Buckets are left-closed hours anchored at the top of the hour. Every hour
//! between the first and the last populated bucket is emitted, empty hours as
//! zero-valued points, so the chart's time axis has no gaps.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;
use warehouse_common::TransferRecord;

/// Per-hour totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBucket {
    /// Top of the hour, inclusive
    pub bucket_start: NaiveDateTime,
    /// Sum of `amount_usd`; transfers without a price contribute 0
    pub total_usd: f64,
    /// Distinct transaction hashes
    pub transaction_count: usize,
    /// Transfer rows (one transaction may emit several)
    pub transfer_count: usize,
}

impl HourlyBucket {
    fn empty(bucket_start: NaiveDateTime) -> Self {
        Self {
            bucket_start,
            total_usd: 0.0,
            transaction_count: 0,
            transfer_count: 0,
        }
    }
}

/// Width of one bucket
pub fn bucket_width() -> Duration {
    Duration::hours(1)
}

/// Start of the hour containing `ts`
pub fn bucket_start(ts: &NaiveDateTime) -> NaiveDateTime {
    let into_hour = Duration::seconds(ts.minute() as i64 * 60 + ts.second() as i64)
        + Duration::nanoseconds(ts.nanosecond() as i64);
    *ts - into_hour
}

#[derive(Default)]
struct Accumulator<'a> {
    total_usd: f64,
    transactions: HashSet<&'a str>,
    transfers: usize,
}

/// Group records into hourly buckets, sorted by bucket start.
///
/// Input order does not matter; the same records always produce the same
/// series.
pub fn aggregate_hourly(records: &[TransferRecord]) -> Vec<HourlyBucket> {
    let mut by_hour: BTreeMap<NaiveDateTime, Accumulator<'_>> = BTreeMap::new();

    for record in records {
        let acc = by_hour
            .entry(bucket_start(&record.block_timestamp))
            .or_default();
        acc.total_usd += record.amount_usd.unwrap_or(0.0);
        acc.transactions.insert(record.transaction_hash.as_str());
        acc.transfers += 1;
    }

    let (first, last) = match (by_hour.keys().next(), by_hour.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let mut buckets = Vec::new();
    let mut hour = first;
    while hour <= last {
        let bucket = match by_hour.get(&hour) {
            Some(acc) => HourlyBucket {
                bucket_start: hour,
                total_usd: acc.total_usd,
                transaction_count: acc.transactions.len(),
                transfer_count: acc.transfers,
            },
            None => HourlyBucket::empty(hour),
        };
        buckets.push(bucket);
        hour += bucket_width();
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn transfer(ts: NaiveDateTime, tx: &str, usd: Option<f64>) -> TransferRecord {
        TransferRecord {
            blockchain: "ethereum".to_string(),
            block_timestamp: ts,
            block_number: 1,
            block_hash: "0xblock".to_string(),
            transaction_hash: tx.to_string(),
            event_index: 0,
            from_address: "0xfrom".to_string(),
            to_address: "0xto".to_string(),
            token_address: "0xtoken".to_string(),
            raw_amount: None,
            amount: None,
            amount_usd: usd,
        }
    }

    #[test]
    fn test_three_transfers_two_hours() {
        let records = vec![
            transfer(at(9, 10), "0xa", Some(10.0)),
            transfer(at(9, 50), "0xb", Some(20.0)),
            transfer(at(10, 5), "0xc", Some(5.0)),
        ];

        assert_eq!(
            aggregate_hourly(&records),
            vec![
                HourlyBucket {
                    bucket_start: at(9, 0),
                    total_usd: 30.0,
                    transaction_count: 2,
                    transfer_count: 2,
                },
                HourlyBucket {
                    bucket_start: at(10, 0),
                    total_usd: 5.0,
                    transaction_count: 1,
                    transfer_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_gaps_are_zero_filled() {
        let records = vec![
            transfer(at(9, 0), "0xa", Some(1.0)),
            transfer(at(12, 59), "0xb", Some(2.0)),
        ];
        let buckets = aggregate_hourly(&records);

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[1], HourlyBucket::empty(at(10, 0)));
        assert_eq!(buckets[2], HourlyBucket::empty(at(11, 0)));
        assert_eq!(buckets[3].bucket_start, at(12, 0));
    }

    #[test]
    fn test_same_transaction_counted_once() {
        let records = vec![
            transfer(at(9, 1), "0xa", Some(1.0)),
            transfer(at(9, 2), "0xa", Some(2.0)),
        ];
        let buckets = aggregate_hourly(&records);
        assert_eq!(buckets[0].transaction_count, 1);
        assert_eq!(buckets[0].transfer_count, 2);
        assert_eq!(buckets[0].total_usd, 3.0);
    }

    #[test]
    fn test_missing_price_counts_but_adds_nothing() {
        let records = vec![
            transfer(at(9, 1), "0xa", None),
            transfer(at(9, 2), "0xb", Some(4.0)),
        ];
        let buckets = aggregate_hourly(&records);
        assert_eq!(buckets[0].total_usd, 4.0);
        assert_eq!(buckets[0].transaction_count, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_hourly(&[]).is_empty());
    }

    #[test]
    fn test_bucket_start_is_left_closed() {
        assert_eq!(bucket_start(&at(10, 0)), at(10, 0));
        let just_before = at(10, 0) - Duration::nanoseconds(1);
        assert_eq!(bucket_start(&just_before), at(9, 0));
    }

    fn arb_records() -> impl Strategy<Value = Vec<TransferRecord>> {
        prop::collection::vec(
            (0i64..72 * 3600, 0u8..16, prop::option::of(0.0f64..1_000_000.0)),
            0..200,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(offset, tx, usd)| {
                    transfer(
                        at(0, 0) + Duration::seconds(offset),
                        &format!("0x{:02x}", tx),
                        usd,
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_aggregation_is_idempotent(records in arb_records()) {
            prop_assert_eq!(aggregate_hourly(&records), aggregate_hourly(&records));
        }

        #[test]
        fn prop_order_does_not_matter(records in arb_records()) {
            let mut reversed = records.clone();
            reversed.reverse();
            let forward = aggregate_hourly(&records);
            let backward = aggregate_hourly(&reversed);
            prop_assert_eq!(forward.len(), backward.len());
            for (a, b) in forward.iter().zip(backward.iter()) {
                prop_assert_eq!(a.bucket_start, b.bucket_start);
                prop_assert_eq!(a.transaction_count, b.transaction_count);
                prop_assert!((a.total_usd - b.total_usd).abs() <= 1e-6 * a.total_usd.abs().max(1.0));
            }
        }

        #[test]
        fn prop_totals_are_preserved(records in arb_records()) {
            let buckets = aggregate_hourly(&records);
            let bucketed: f64 = buckets.iter().map(|b| b.total_usd).sum();
            let direct: f64 = records.iter().filter_map(|r| r.amount_usd).sum();
            prop_assert!((bucketed - direct).abs() <= 1e-6 * direct.abs().max(1.0));

            let rows: usize = buckets.iter().map(|b| b.transfer_count).sum();
            prop_assert_eq!(rows, records.len());
        }

        #[test]
        fn prop_distinct_never_exceeds_rows(records in arb_records()) {
            for bucket in aggregate_hourly(&records) {
                prop_assert!(bucket.transaction_count <= bucket.transfer_count);
            }
        }

        #[test]
        fn prop_buckets_are_contiguous(records in arb_records()) {
            let buckets = aggregate_hourly(&records);
            for pair in buckets.windows(2) {
                prop_assert_eq!(pair[1].bucket_start - pair[0].bucket_start, bucket_width());
            }
        }
    }
}
