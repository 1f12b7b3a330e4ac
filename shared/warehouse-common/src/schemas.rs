//! Token transfer table layout
//!
//! The warehouse returns `SELECT *` rows that are bound to fields by
//! position only. `TRANSFER_COLUMNS` is that positional contract; a result
//! with any other column count is rejected before a single row is decoded.

use crate::error::WarehouseError;

/// Default source table for token transfer events
pub const TOKEN_TRANSFERS_TABLE: &str = "EZ_TOKEN_TRANSFERS";

/// Number of columns a transfer row must carry
pub const TRANSFER_COLUMN_COUNT: usize = 12;

/// Column labels in warehouse result order
pub const TRANSFER_COLUMNS: [&str; TRANSFER_COLUMN_COUNT] = [
    "blockchain",
    "block_timestamp",
    "block_number",
    "block_hash",
    "transaction_hash",
    "event_index",
    "from_address",
    "to_address",
    "token_address",
    "raw_amount",
    "amount",
    "amount_usd",
];

/// Column holding the event time, used by the date-range predicate
pub const BLOCK_TIMESTAMP_COLUMN: &str = "block_timestamp";

/// Ensure a configured table/schema name is a plain SQL identifier.
///
/// Identifiers cannot be bound as statement parameters, so anything that is
/// quoted into SQL text must pass this check first.
pub fn validate_identifier(name: &str) -> Result<(), WarehouseError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(WarehouseError::ConfigError(format!(
            "'{}' is not a valid SQL identifier",
            name
        )));
    }

    Ok(())
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// DDL for a transfer table with the positional layout above.
///
/// Used to seed local DuckDB warehouses (development fixtures, tests).
pub fn create_token_transfers_table_sql(schema: &str, table: &str) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS {schema};
         CREATE TABLE IF NOT EXISTS {schema}.{table} (
            blockchain VARCHAR NOT NULL,
            block_timestamp TIMESTAMP NOT NULL,
            block_number BIGINT NOT NULL,
            block_hash VARCHAR NOT NULL,
            transaction_hash VARCHAR NOT NULL,
            event_index INTEGER NOT NULL,
            from_address VARCHAR NOT NULL,
            to_address VARCHAR NOT NULL,
            token_address VARCHAR NOT NULL,
            raw_amount HUGEINT,
            amount DECIMAL(38, 18),
            amount_usd DOUBLE
         );",
        schema = quote_identifier(schema),
        table = quote_identifier(table),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_column_contract() {
        assert_eq!(TRANSFER_COLUMNS.len(), TRANSFER_COLUMN_COUNT);
        assert_eq!(TRANSFER_COLUMNS[1], BLOCK_TIMESTAMP_COLUMN);
        assert_eq!(TRANSFER_COLUMNS[4], "transaction_hash");
        assert_eq!(TRANSFER_COLUMNS[11], "amount_usd");
    }

    #[rstest]
    #[case("EZ_TOKEN_TRANSFERS")]
    #[case("token_transfers")]
    #[case("_staging$1")]
    fn test_valid_identifiers(#[case] name: &str) {
        assert!(validate_identifier(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("1transfers")]
    #[case("transfers; DROP TABLE x")]
    #[case("tab\"le")]
    #[case("my-table")]
    fn test_invalid_identifiers(#[case] name: &str) {
        assert!(matches!(
            validate_identifier(name),
            Err(WarehouseError::ConfigError(_))
        ));
    }

    #[test]
    fn test_ddl_declares_every_column_in_order() {
        let ddl = create_token_transfers_table_sql("TOKEN_TRANSFERS", TOKEN_TRANSFERS_TABLE);
        let mut last = 0;
        for column in TRANSFER_COLUMNS {
            let pos = ddl
                .find(&format!("{} ", column))
                .unwrap_or_else(|| panic!("missing column {}", column));
            assert!(pos >= last, "column {} out of order", column);
            last = pos;
        }
        assert!(ddl.contains("\"TOKEN_TRANSFERS\".\"EZ_TOKEN_TRANSFERS\""));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("acct\"x"), "\"acct\"\"x\"");
    }
}
