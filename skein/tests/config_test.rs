// Integration tests for config types in skein::config

use skein::config::*;
use skein::UnitId;

#[test]
fn test_thread_config_defaults() {
    let config = ThreadConfig::default();

    assert!(config.name.is_none());
    assert!(config.stack_size.is_none());
    assert_eq!(config.thread_name(UnitId::new(17)), "skein-unit-17");
}

#[test]
fn test_thread_config_explicit_name() {
    let config = ThreadConfig {
        name: Some("render".to_string()),
        stack_size: Some(1 << 20),
    };
    assert_eq!(config.thread_name(UnitId::new(3)), "render");
}

#[test]
fn test_pool_config_defaults() {
    let config = PoolConfig::default();

    assert_eq!(config.size, num_cpus::get());
    assert_eq!(config.thread_name_prefix, DEFAULT_POOL_THREAD_NAME_PREFIX);
    assert!(config.stack_size.is_none());
    assert_eq!(PoolConfig::with_size(3).size, 3);
}

#[test]
fn test_pool_config_derives_member_config() {
    let config = PoolConfig {
        size: 4,
        thread_name_prefix: "crunch-".to_string(),
        stack_size: Some(64 * 1024),
    };

    let member = config.thread_config(2);
    assert_eq!(member.name.as_deref(), Some("crunch-2"));
    assert_eq!(member.stack_size, Some(64 * 1024));
    assert_eq!(member.thread_name(UnitId::new(99)), "crunch-2");
}

// Basic check that Debug formatting includes the fields
#[test]
fn test_config_debug_format() {
    assert!(format!("{:?}", PoolConfig::default()).contains("thread_name_prefix"));
    assert!(format!("{:?}", ThreadConfig::default()).contains("stack_size"));
}
