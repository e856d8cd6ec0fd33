//! Read-through caching macro.

/// Macro for defining cached async functions whose entries carry tags.
///
/// The function result is serialized with `serde_json` and stored under
/// `{name}_{key}`. Cache failures never fail the wrapped function; the body
/// runs whenever the cached value is missing or unreadable.
///
/// # Usage
///
/// ```ignore
/// // With explicit cache parameter
/// tag_cached! {
///     name = "room",
///     tags = ["rooms"],
///     lifetime = Lifetime::Seconds(60),
///     key = |room_id: &str| room_id.to_string(),
///     async fn get_cached_room(cache: &CacheManager, room_id: &str) -> AppResult<Room> {
///         provider.get_room(room_id).await
///     }
/// }
///
/// // Using global cache (no cache parameter)
/// tag_cached! {
///     name = "user",
///     key = |user_id: i32| user_id.to_string(),
///     async fn get_cached_user(user_id: i32) -> AppResult<User> {
///         db.find_user(user_id).await
///     }
/// }
/// ```
///
/// # Parameters
///
/// - `name`: Prefix of the entry identifier, must itself be a valid identifier
/// - `tags` (optional): Tags attached to every stored entry
/// - `lifetime` (optional): [`Lifetime`](crate::cache::Lifetime) of stored entries
/// - `key`: A closure that builds the identifier suffix from function arguments
/// - `async fn`: The async function definition
#[macro_export]
macro_rules! tag_cached {
    // Version with explicit cache parameter
    (
        name = $cache_name:literal,
        $(tags = [$($tag:expr),* $(,)?],)?
        $(lifetime = $lifetime:expr,)?
        key = |$($key_arg:ident : $key_ty:ty),* $(,)?| $key_expr:expr,
        async fn $fn_name:ident($cache_param:ident : &CacheManager $(, $arg:ident : $arg_ty:ty)* $(,)?) -> $ret_ty:ty $body:block
    ) => {
        pub async fn $fn_name(
            $cache_param: &$crate::cache::CacheManager,
            $($arg: $arg_ty),*
        ) -> $ret_ty {
            let identifier = {
                $(let $key_arg: $key_ty = &$arg;)*
                format!("{}_{}", $cache_name, $key_expr)
            };

            if let Ok(Some(cached_bytes)) = $cache_param.get(&identifier).await {
                if let Ok(cached_value) = serde_json::from_slice(&cached_bytes) {
                    return Ok(cached_value);
                }
            }

            let result: $ret_ty = (|| async $body)().await;

            if let Ok(ref value) = result {
                if let Ok(bytes) = serde_json::to_vec(value) {
                    let tags: &[&str] = &[$($($tag),*)?];
                    let lifetime = $crate::tag_cached!(@lifetime $($lifetime)?);
                    if let Err(e) = $cache_param.set(&identifier, bytes, tags, lifetime).await {
                        tracing::warn!(identifier = %identifier, error = %e, "Failed to store cached value");
                    }
                }
            }

            result
        }
    };

    // Version using global cache (no cache parameter)
    (
        name = $cache_name:literal,
        $(tags = [$($tag:expr),* $(,)?],)?
        $(lifetime = $lifetime:expr,)?
        key = |$($key_arg:ident : $key_ty:ty),* $(,)?| $key_expr:expr,
        async fn $fn_name:ident($($arg:ident : $arg_ty:ty),* $(,)?) -> $ret_ty:ty $body:block
    ) => {
        pub async fn $fn_name($($arg: $arg_ty),*) -> $ret_ty {
            if let Some(cache) = $crate::cache::get_cache() {
                let identifier = {
                    $(let $key_arg: $key_ty = &$arg;)*
                    format!("{}_{}", $cache_name, $key_expr)
                };

                if let Ok(Some(cached_bytes)) = cache.get(&identifier).await {
                    if let Ok(cached_value) = serde_json::from_slice(&cached_bytes) {
                        return Ok(cached_value);
                    }
                }

                let result: $ret_ty = (|| async $body)().await;

                if let Ok(ref value) = result {
                    if let Ok(bytes) = serde_json::to_vec(value) {
                        let tags: &[&str] = &[$($($tag),*)?];
                        let lifetime = $crate::tag_cached!(@lifetime $($lifetime)?);
                        if let Err(e) = cache.set(&identifier, bytes, tags, lifetime).await {
                            tracing::warn!(identifier = %identifier, error = %e, "Failed to store cached value");
                        }
                    }
                }

                result
            } else {
                (|| async $body)().await
            }
        }
    };

    (@lifetime) => { None };
    (@lifetime $lifetime:expr) => { Some($lifetime) };
}
