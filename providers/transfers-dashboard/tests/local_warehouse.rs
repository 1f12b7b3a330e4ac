//! End-to-end tests against an on-disk DuckDB warehouse

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::Connection;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use transfers_dashboard::{
    DashboardConfig, DateRange, DisplayMode, TransferReader, TransferSource, TransfersDashboard,
    ViewQuery, WarehouseConfig, WarehouseError,
};
use warehouse_common::create_token_transfers_table_sql;

/// (block_timestamp, transaction_hash, amount_usd)
const FIXTURE: [(&str, &str, Option<f64>); 6] = [
    ("2024-02-29 23:59:59", "0x01", Some(1.0)),
    ("2024-03-01 00:00:00", "0x02", Some(2.0)),
    ("2024-03-01 09:10:00", "0x03", Some(10.0)),
    ("2024-03-01 09:50:00", "0x04", None),
    ("2024-03-02 23:59:59", "0x05", Some(5.0)),
    ("2024-03-03 00:00:00", "0x06", Some(6.0)),
];

struct Warehouse {
    dir: TempDir,
}

impl Warehouse {
    fn seeded() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(Self::db_path(dir.path())).unwrap();
        conn.execute_batch(&create_token_transfers_table_sql(
            "TOKEN_TRANSFERS",
            "EZ_TOKEN_TRANSFERS",
        ))
        .unwrap();

        for (idx, (ts, tx, usd)) in FIXTURE.iter().enumerate() {
            let usd = usd.map_or("NULL".to_string(), |v| v.to_string());
            conn.execute_batch(&format!(
                "INSERT INTO \"TOKEN_TRANSFERS\".\"EZ_TOKEN_TRANSFERS\" VALUES (
                    'ethereum', TIMESTAMP '{ts}', {block}, '0xblock{idx}', '{tx}', {idx},
                    '0xfrom', '0xto', '0xtoken',
                    1000000000000000000000, 1000.5, {usd}
                );",
                ts = ts,
                block = 19_000_000 + idx,
                idx = idx,
                tx = tx,
                usd = usd,
            ))
            .unwrap();
        }

        // Postgres NUMERIC amounts surface as DOUBLE through the postgres extension
        conn.execute_batch(
            "CREATE SCHEMA \"NUMERIC_AMOUNTS\";
             CREATE TABLE \"NUMERIC_AMOUNTS\".\"EZ_TOKEN_TRANSFERS\" (
                blockchain VARCHAR, block_timestamp TIMESTAMP, block_number BIGINT,
                block_hash VARCHAR, transaction_hash VARCHAR, event_index INTEGER,
                from_address VARCHAR, to_address VARCHAR, token_address VARCHAR,
                raw_amount DOUBLE, amount DOUBLE, amount_usd DOUBLE
             );
             INSERT INTO \"NUMERIC_AMOUNTS\".\"EZ_TOKEN_TRANSFERS\" VALUES (
                'ethereum', TIMESTAMP '2024-03-01 09:10:00', 19000000, '0xblock', '0x10', 0,
                '0xfrom', '0xto', '0xtoken', 1e21, 1000.0, 2500.0
             );",
        )
        .unwrap();

        // Narrow table for the column-count check
        conn.execute_batch(
            "CREATE SCHEMA \"NARROW\";
             CREATE TABLE \"NARROW\".\"EZ_TOKEN_TRANSFERS\" (blockchain VARCHAR, block_timestamp TIMESTAMP);",
        )
        .unwrap();

        drop(conn);
        Self { dir }
    }

    fn db_path(dir: &Path) -> String {
        dir.join("warehouse.duckdb").to_string_lossy().into_owned()
    }

    fn config(&self) -> WarehouseConfig {
        let mut config = WarehouseConfig::local(Self::db_path(self.dir.path()));
        config.temp_directory = self.dir.path().to_string_lossy().into_owned();
        config.threads = 1;
        config
    }

    fn dashboard(&self) -> TransfersDashboard {
        let mut config = DashboardConfig::default();
        config.warehouse = self.config();
        TransfersDashboard::with_config(&config).unwrap()
    }
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
}

#[tokio::test]
async fn test_unfiltered_query_returns_every_row() {
    let warehouse = Warehouse::seeded();
    let reader = TransferReader::new(warehouse.config());

    let records = reader.fetch_transfers(None).await.unwrap();
    assert_eq!(records.len(), FIXTURE.len());
}

#[rstest]
#[case("2024-03-01", "2024-03-02")]
#[case("2024-03-01", "2024-03-01")]
#[case("2024-02-29", "2024-03-03")]
#[case("2024-03-03", "2024-03-10")]
#[tokio::test]
async fn test_range_keeps_exactly_the_rows_inside(#[case] start: &str, #[case] end: &str) {
    let warehouse = Warehouse::seeded();
    let reader = TransferReader::new(warehouse.config());
    let range = range(start, end);

    let records = reader.fetch_transfers(Some(range)).await.unwrap();

    let mut fetched: Vec<&str> = records.iter().map(|r| r.transaction_hash.as_str()).collect();
    fetched.sort_unstable();
    let expected: Vec<&str> = FIXTURE
        .iter()
        .filter(|(t, _, _)| range.contains(&ts(t)))
        .map(|(_, tx, _)| *tx)
        .collect();

    assert_eq!(fetched, expected);
    assert!(records.iter().all(|r| range.contains(&r.block_timestamp)));
}

#[tokio::test]
async fn test_end_date_is_inclusive() {
    let warehouse = Warehouse::seeded();
    let reader = TransferReader::new(warehouse.config());

    let records = reader
        .fetch_transfers(Some(range("2024-03-02", "2024-03-02")))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].block_timestamp, ts("2024-03-02 23:59:59"));
}

#[tokio::test]
async fn test_empty_range_is_not_an_error() {
    let warehouse = Warehouse::seeded();
    let reader = TransferReader::new(warehouse.config());

    let records = reader
        .fetch_transfers(Some(range("2023-01-01", "2023-01-31")))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_values_decode_positionally() {
    let warehouse = Warehouse::seeded();
    let reader = TransferReader::new(warehouse.config());

    let records = reader
        .fetch_transfers(Some(range("2024-03-01", "2024-03-01")))
        .await
        .unwrap();
    let record = records
        .iter()
        .find(|r| r.transaction_hash == "0x04")
        .unwrap();

    assert_eq!(record.blockchain, "ethereum");
    assert_eq!(record.block_number, 19_000_003);
    assert_eq!(record.event_index, 3);
    assert_eq!(
        record.raw_amount.as_ref().map(|v| v.to_string()).as_deref(),
        Some("1000000000000000000000")
    );
    assert_eq!(record.amount, Some(1000.5));
    assert_eq!(record.amount_usd, None);
}

#[tokio::test]
async fn test_double_raw_amount_decodes() {
    let warehouse = Warehouse::seeded();
    let mut config = warehouse.config();
    config.schema = "NUMERIC_AMOUNTS".to_string();

    let records = TransferReader::new(config)
        .fetch_transfers(None)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].raw_amount.as_ref().map(|v| v.to_string()).as_deref(),
        Some("1000000000000000000000")
    );
    assert_eq!(records[0].amount_usd, Some(2500.0));
}

#[tokio::test]
async fn test_wrong_column_count_is_query_error() {
    let warehouse = Warehouse::seeded();
    let mut config = warehouse.config();
    config.schema = "NARROW".to_string();

    let err = TransferReader::new(config)
        .fetch_transfers(None)
        .await
        .unwrap_err();
    match err {
        WarehouseError::QueryError(message) => assert!(message.contains("expected 12 columns")),
        other => panic!("expected query error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_table_is_query_error() {
    let warehouse = Warehouse::seeded();
    let mut config = warehouse.config();
    config.table = "NO_SUCH_TABLE".to_string();

    let err = TransferReader::new(config)
        .fetch_transfers(None)
        .await
        .unwrap_err();
    assert!(matches!(err, WarehouseError::QueryError(_)));
}

#[tokio::test]
async fn test_health_check() {
    let warehouse = Warehouse::seeded();
    assert!(TransferReader::new(warehouse.config()).is_healthy().await);

    let dir = tempfile::tempdir().unwrap();
    let missing = WarehouseConfig::local(dir.path().join("absent.duckdb").to_string_lossy());
    assert!(!TransferReader::new(missing).is_healthy().await);
}

#[tokio::test]
async fn test_dashboard_hourly_series() {
    let warehouse = Warehouse::seeded();
    let dashboard = warehouse.dashboard();

    let buckets = dashboard
        .hourly(&ViewQuery::new(Some("2024-03-01"), Some("2024-03-01")))
        .await
        .unwrap();

    // 00:00 through 09:00, gaps zero-filled
    assert_eq!(buckets.len(), 10);
    assert_eq!(buckets[0].total_usd, 2.0);
    assert_eq!(buckets[1].transaction_count, 0);

    let nine = buckets.last().unwrap();
    assert_eq!(
        nine.bucket_start,
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    );
    assert_eq!(nine.total_usd, 10.0);
    assert_eq!(nine.transaction_count, 2);
}

#[tokio::test]
async fn test_dashboard_pages() {
    let warehouse = Warehouse::seeded();
    let dashboard = warehouse.dashboard();

    let table = dashboard
        .render(
            DisplayMode::Table,
            &ViewQuery::new(Some("2024-03-01"), Some("2024-03-02")).with_fetch(),
        )
        .await
        .unwrap();
    assert!(table.contains("4 transfers from 2024-03-01 to 2024-03-02"));

    let chart = dashboard
        .render(
            DisplayMode::Chart,
            &ViewQuery::new(Some("2024-03-10"), Some("2024-03-11")),
        )
        .await
        .unwrap();
    assert!(chart.contains("hourly-chart"));
    assert!(!chart.contains("class=\"error\""));
}

#[tokio::test]
async fn test_unreachable_warehouse_renders_one_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DashboardConfig::default();
    config.warehouse = WarehouseConfig::local(dir.path().join("absent.duckdb").to_string_lossy());
    let dashboard = TransfersDashboard::with_config(&config).unwrap();

    let html = dashboard
        .render(DisplayMode::Table, &ViewQuery::default().with_fetch())
        .await
        .unwrap();

    assert_eq!(html.matches("class=\"error\"").count(), 1);
    assert!(html.contains("Could not connect to the warehouse"));
    assert!(!html.contains("<table"));
}
