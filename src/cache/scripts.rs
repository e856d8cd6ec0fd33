//! Lua scripts executed atomically by the Redis server.

use std::sync::LazyLock;

use redis::Script;

/// Delete every key of one cache instance.
///
/// # Arguments
///
/// - `ARGV[1]`: glob pattern matching the instance prefix (already escaped)
const FLUSH_SCRIPT_SOURCE: &str = r"
local keys = redis.call('KEYS', ARGV[1])
for _, key in ipairs(keys) do
    redis.call('DEL', key)
end
return #keys
";

/// Delete a tag and every entry it references.
///
/// Each entry loses its payload key and its own tag set. The entry is not
/// detached from its other tags: walking them would cost one set operation per
/// tag of every entry, which is what the tag index exists to avoid.
///
/// # Arguments
///
/// - `KEYS[1]`: tag key
/// - `ARGV[1]`: instance prefix
const FLUSH_BY_TAG_SCRIPT_SOURCE: &str = r"
local prefix = ARGV[1]
local entries = redis.call('SMEMBERS', KEYS[1])
for _, identifier in ipairs(entries) do
    redis.call('DEL', prefix .. 'entry:' .. identifier)
    redis.call('DEL', prefix .. 'tags:' .. identifier)
end
redis.call('DEL', KEYS[1])
return #entries
";

pub(crate) static FLUSH_SCRIPT: LazyLock<Script> =
    LazyLock::new(|| Script::new(FLUSH_SCRIPT_SOURCE));

pub(crate) static FLUSH_BY_TAG_SCRIPT: LazyLock<Script> =
    LazyLock::new(|| Script::new(FLUSH_BY_TAG_SCRIPT_SOURCE));
