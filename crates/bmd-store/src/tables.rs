//! Shared in-memory keyed tables.
//!
//! Both store implementations hold the same keyed maps; the file-backed
//! store adds load/save on top.

use bmd_core::{Asset, CandleRecord, FundingRecord, OpenInterestRecord, Series};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub(crate) type Key = (Asset, DateTime<Utc>);

/// The three keyed series tables.
#[derive(Debug, Default)]
pub(crate) struct SeriesTables {
    pub candles: BTreeMap<Key, CandleRecord>,
    pub funding: BTreeMap<Key, FundingRecord>,
    pub open_interest: BTreeMap<Key, OpenInterestRecord>,
}

fn asset_range<'a, V>(
    map: &'a BTreeMap<Key, V>,
    asset: &Asset,
) -> impl DoubleEndedIterator<Item = (DateTime<Utc>, &'a V)> + 'a {
    let lo = (asset.clone(), DateTime::<Utc>::MIN_UTC);
    let hi = (asset.clone(), DateTime::<Utc>::MAX_UTC);
    map.range(lo..=hi).map(|((_, ts), v)| (*ts, v))
}

impl SeriesTables {
    pub fn upsert_candles(&mut self, rows: &[CandleRecord]) -> usize {
        for row in rows {
            self.candles
                .insert((row.asset.clone(), row.ts), row.clone());
        }
        rows.len()
    }

    pub fn upsert_funding(&mut self, rows: &[FundingRecord]) -> usize {
        for row in rows {
            self.funding
                .insert((row.asset.clone(), row.ts), row.clone());
        }
        rows.len()
    }

    pub fn upsert_open_interest(&mut self, rows: &[OpenInterestRecord]) -> usize {
        for row in rows {
            self.open_interest
                .insert((row.asset.clone(), row.ts), row.clone());
        }
        rows.len()
    }

    pub fn last_timestamp(&self, series: Series, asset: &Asset) -> Option<DateTime<Utc>> {
        match series {
            Series::Candles => asset_range(&self.candles, asset).next_back().map(|(ts, _)| ts),
            Series::Funding => asset_range(&self.funding, asset).next_back().map(|(ts, _)| ts),
            Series::OpenInterest => asset_range(&self.open_interest, asset)
                .next_back()
                .map(|(ts, _)| ts),
        }
    }

    pub fn last_open_interest(&self, asset: &Asset) -> Option<(DateTime<Utc>, Decimal)> {
        asset_range(&self.open_interest, asset)
            .next_back()
            .map(|(ts, row)| (ts, row.open_interest))
    }

    pub fn series_timestamps(&self, series: Series, asset: &Asset) -> Vec<DateTime<Utc>> {
        match series {
            Series::Candles => asset_range(&self.candles, asset).map(|(ts, _)| ts).collect(),
            Series::Funding => asset_range(&self.funding, asset).map(|(ts, _)| ts).collect(),
            Series::OpenInterest => asset_range(&self.open_interest, asset)
                .map(|(ts, _)| ts)
                .collect(),
        }
    }
}
