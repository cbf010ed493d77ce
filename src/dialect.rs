//! SQL text rendering for the supported databases.
//!
//! Table and column names are trusted identifiers supplied by the DAO
//! implementations themselves and are concatenated into the statement text
//! as-is. Values (ids, offsets, deltas) are never rendered here; they are
//! always bound as positional parameters.

/// Number of rows returned by a paged listing.
pub const PAGE_SIZE: i64 = 10;

/// SQL flavour spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    /// Infers the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once("://")?.0;
        match scheme {
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            _ => None,
        }
    }

    /// Session character set used when none is configured.
    pub fn default_charset(&self) -> &'static str {
        match self {
            Dialect::MySql => "utf8mb4",
            Dialect::Postgres => "UTF8",
        }
    }

    /// Positional placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    pub fn set_charset(&self, charset: &str) -> String {
        match self {
            Dialect::MySql => format!("SET NAMES '{charset}'"),
            Dialect::Postgres => format!("SET client_encoding TO '{charset}'"),
        }
    }

    /// Session-level access mode. Pooled sessions keep this setting, so the
    /// transactional path always sets it back to read-write.
    pub fn set_read_only(&self, read_only: bool) -> &'static str {
        match (self, read_only) {
            (Dialect::MySql, true) => "SET SESSION TRANSACTION READ ONLY",
            (Dialect::MySql, false) => "SET SESSION TRANSACTION READ WRITE",
            (Dialect::Postgres, true) => "SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY",
            (Dialect::Postgres, false) => "SET SESSION CHARACTERISTICS AS TRANSACTION READ WRITE",
        }
    }

    pub fn begin(&self) -> &'static str {
        match self {
            Dialect::MySql => "START TRANSACTION",
            Dialect::Postgres => "BEGIN",
        }
    }

    pub fn commit(&self) -> &'static str {
        "COMMIT"
    }

    pub fn rollback(&self) -> &'static str {
        "ROLLBACK"
    }

    /// `column = column + ?` for the row with the given id.
    /// Parameters: delta, id.
    pub fn increment(&self, table: &str, column: &str) -> String {
        format!(
            "UPDATE {table} SET {column} = {column} + {} WHERE id = {}",
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    /// Recomputes `count_column` from the rows of `ref_table` pointing at the
    /// row. Parameters: id (reference side), id (target row).
    pub fn derived_count(
        &self,
        table: &str,
        count_column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> String {
        format!(
            "UPDATE {table} SET {count_column} = (SELECT COUNT(id) FROM {ref_table} WHERE {ref_column} = {}) WHERE id = {}",
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    /// One page of `table`, newest first. Parameters: offset.
    pub fn page(&self, table: &str, order_column: &str) -> String {
        match self {
            Dialect::MySql => format!(
                "SELECT * FROM {table} ORDER BY {order_column} DESC LIMIT ?, {PAGE_SIZE}"
            ),
            Dialect::Postgres => format!(
                "SELECT * FROM {table} ORDER BY {order_column} DESC LIMIT {PAGE_SIZE} OFFSET $1"
            ),
        }
    }

    pub fn select_all(&self, table: &str, order_column: Option<&str>) -> String {
        match order_column {
            Some(order_column) => format!("SELECT * FROM {table} ORDER BY {order_column} DESC"),
            None => format!("SELECT * FROM {table}"),
        }
    }

    /// Parameters: id.
    pub fn select_by_id(&self, table: &str) -> String {
        format!("SELECT * FROM {table} WHERE id = {}", self.placeholder(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_statements() {
        let d = Dialect::MySql;
        assert_eq!(d.set_charset(d.default_charset()), "SET NAMES 'utf8mb4'");
        assert_eq!(
            d.increment("posts", "views"),
            "UPDATE posts SET views = views + ? WHERE id = ?"
        );
        assert_eq!(
            d.page("posts", "create_date"),
            "SELECT * FROM posts ORDER BY create_date DESC LIMIT ?, 10"
        );
        assert_eq!(d.select_by_id("posts"), "SELECT * FROM posts WHERE id = ?");
    }

    #[test]
    fn postgres_statements() {
        let d = Dialect::Postgres;
        assert_eq!(
            d.set_charset(d.default_charset()),
            "SET client_encoding TO 'UTF8'"
        );
        assert_eq!(
            d.derived_count("posts", "comment_count", "comments", "post_id"),
            "UPDATE posts SET comment_count = (SELECT COUNT(id) FROM comments WHERE post_id = $1) WHERE id = $2"
        );
        assert_eq!(
            d.page("posts", "create_date"),
            "SELECT * FROM posts ORDER BY create_date DESC LIMIT 10 OFFSET $1"
        );
        assert_eq!(d.select_by_id("posts"), "SELECT * FROM posts WHERE id = $1");
    }

    #[test]
    fn select_all_orders_only_when_asked() {
        let d = Dialect::MySql;
        assert_eq!(d.select_all("tags", None), "SELECT * FROM tags");
        assert_eq!(
            d.select_all("tags", Some("hits")),
            "SELECT * FROM tags ORDER BY hits DESC"
        );
    }

    #[test]
    fn dialect_from_url() {
        assert_eq!(
            Dialect::from_url("mysql://root@localhost/blog"),
            Some(Dialect::MySql)
        );
        assert_eq!(
            Dialect::from_url("postgresql://localhost/blog"),
            Some(Dialect::Postgres)
        );
        assert_eq!(Dialect::from_url("sqlite::memory:"), None);
    }
}
