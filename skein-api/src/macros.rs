/// Builds a [`Values`](crate::types::Values) list from a comma-separated set of expressions.
///
/// Every element accepts whatever `serde_json::json!` accepts, so literals, variables and
/// nested structures all work.
///
/// ```rust
/// use skein_api::values;
///
/// let name = "left";
/// let args = values![1, 2.5, name, [true, false]];
/// assert_eq!(args.len(), 4);
/// assert_eq!(args[2], "left");
/// ```
#[macro_export]
macro_rules! values {
    () => {
        $crate::types::Values::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::serde_json::json!($value)),+]
    };
}
