//! Lua scripts for owner-checked lease operations

use lazy_static::lazy_static;
use redis::Script;

/// Can only delete the lease when it exists and the owner token matches
pub const RELEASE_LOCK: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// Can only extend the lease when it exists and the owner token matches.
/// ARGV[2] is the new lifetime in milliseconds.
pub const EXTEND_LOCK: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    end
    return 0
"#;

lazy_static! {
    pub static ref RELEASE_SCRIPT: Script = Script::new(RELEASE_LOCK);
    pub static ref EXTEND_SCRIPT: Script = Script::new(EXTEND_LOCK);
}
