/// Lua script for one atomic sliding-window check-and-record.
///
/// KEYS\[1\] = the window key (a sorted set of event members scored by ms)
/// ARGV\[1\] = current time in milliseconds
/// ARGV\[2\] = window length in milliseconds
/// ARGV\[3\] = unique member for the new event
///
/// Prunes events older than the trailing window, reads the surviving count,
/// records the new event, and refreshes the entry's expiry to the window
/// length, all in one unit. Returns the count before the insert.
pub const WINDOW_CHECK_AND_RECORD: &str = r"
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
redis.call('ZREMRANGEBYSCORE', KEYS[1], 0, now_ms - window_ms)
local count = redis.call('ZCARD', KEYS[1])
redis.call('ZADD', KEYS[1], now_ms, ARGV[3])
redis.call('PEXPIRE', KEYS[1], window_ms)
return count
";

/// Lua script for an atomic quota increment with expiry-on-create.
///
/// KEYS\[1\] = the day-bucketed quota key
/// ARGV\[1\] = TTL in milliseconds
///
/// The expiry is set only when the increment created the key, so repeated
/// consumptions within the same day never reset the clock. Returns the
/// post-increment value.
pub const QUOTA_INCREMENT: &str = r"
local value = redis.call('INCR', KEYS[1])
if value == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return value
";
