//! Macros for per-driver dispatch and parameter construction.

/// Macro for generating database dispatch match arms.
///
/// Works over any of the per-driver enums (`DbPool`, `Session`) whose variants
/// are named `MySql`, `Postgres` and `SQLite`.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, pool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::pool::$enum::$variant($p) => $body,
            )+
        }
    };
}

/// Build a [`Params`](crate::models::Params) mapping.
///
/// ```
/// use db_facade::params;
/// use db_facade::models::QueryParam;
///
/// let p = params! { "id" => 98, "name" => "test" };
/// assert_eq!(p["id"], QueryParam::Int(98));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::models::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::models::Params::new();
        $(
            params.insert(
                ::std::string::ToString::to_string(&$key),
                $crate::models::QueryParam::from($value),
            );
        )+
        params
    }};
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use crate::models::QueryParam;

    #[test]
    fn test_params_macro() {
        let p = params! { "name" => "test", "id" => 98, "gone" => None::<i64> };
        assert_eq!(p.len(), 3);
        assert_eq!(p["id"], QueryParam::Int(98));
        assert!(p["gone"].is_null());
    }

    #[test]
    fn test_params_macro_empty() {
        let p = params! {};
        assert!(p.is_empty());
    }
}
