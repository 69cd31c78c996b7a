//! SQL query constants and builders
//!
//! Catalog queries are scoped to the `public` schema.

/// List all tables in public schema
pub const LIST_TABLES: &str = r#"
    SELECT
        n.nspname::text AS schema,
        c.relname::text AS name,
        CASE c.relkind
            WHEN 'r' THEN 'table'
            WHEN 'p' THEN 'partitioned table'
        END AS type,
        pg_catalog.pg_get_userbyid(c.relowner)::text AS owner
    FROM pg_catalog.pg_class c
        LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE c.relkind IN ('r','p')
        AND n.nspname = 'public'
    ORDER BY name
"#;

/// Get column information for a table
pub const GET_COLUMNS: &str = r#"
    SELECT
        c.column_name::text AS name,
        c.data_type::text AS data_type,
        c.is_nullable = 'YES' AS nullable,
        c.column_default::text AS column_default,
        c.character_maximum_length::int4 AS max_length,
        COALESCE(pk.is_pk, false) AS is_primary_key,
        COALESCE(uq.is_unique, false) AS is_unique
    FROM information_schema.columns c
    LEFT JOIN (
        SELECT DISTINCT kcu.column_name, true AS is_pk
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        WHERE tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_schema = 'public'
            AND tc.table_name = $1
    ) pk ON c.column_name = pk.column_name
    LEFT JOIN (
        SELECT DISTINCT kcu.column_name, true AS is_unique
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        WHERE tc.constraint_type = 'UNIQUE'
            AND tc.table_schema = 'public'
            AND tc.table_name = $1
    ) uq ON c.column_name = uq.column_name
    WHERE c.table_schema = 'public'
        AND c.table_name = $1
    ORDER BY c.ordinal_position
"#;

/// Check whether a column exists on a table
pub const COLUMN_EXISTS: &str = r#"
    SELECT EXISTS(
        SELECT 1
        FROM information_schema.columns
        WHERE table_schema = 'public'
            AND table_name = $1
            AND column_name = $2
    ) AS column_exists
"#;

/// SQL builder for safe identifier quoting
pub struct SqlBuilder;

impl SqlBuilder {
    /// Quote an identifier (table/column name) safely
    pub fn quote_ident(ident: &str) -> String {
        // PostgreSQL identifier quoting
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Build ALTER TABLE ADD COLUMN query; `definition` is type, nullability
    /// and default
    pub fn add_column(table_name: &str, column_name: &str, definition: &str) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            Self::quote_ident(table_name),
            Self::quote_ident(column_name),
            definition
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(SqlBuilder::quote_ident("users"), "\"users\"");
        assert_eq!(SqlBuilder::quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_add_column() {
        assert_eq!(
            SqlBuilder::add_column("users", "phone", "VARCHAR(50) NULL"),
            "ALTER TABLE \"users\" ADD COLUMN \"phone\" VARCHAR(50) NULL"
        );
    }
}
