use std::{env, panic, time::Duration};

use serial_test::serial;
use tokengate::{AppConfig, config::Env};

const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "TOKEN_SECRET",
    "TOKEN_TTL_SECS",
    "STORE_TIMEOUT_MS",
    "PUBLIC_PATHS",
    "USERS_FILE",
    "BIND_ADDR",
    "DEMO_PASSWORD",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with a clean set of config variables and restores the originals afterwards,
/// even if the test panics.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
            }
            // TOKEN_SECRET is missing
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic on a missing token secret"
    );
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.security.token_secret, "super-secure-test-secret-value-local");
    assert_eq!(config.security.token_ttl, Duration::from_secs(3600));
    assert_eq!(config.security.store_timeout, Duration::from_millis(2000));
    assert!(config.security.public_paths.contains(&"/auth/token".to_string()));
    assert_eq!(config.users_file, None);
}

#[test]
#[serial]
fn test_app_config_reads_overrides() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("TOKEN_SECRET", "prod-secret");
            env::set_var("TOKEN_TTL_SECS", "900");
            env::set_var("STORE_TIMEOUT_MS", "250");
            env::set_var("PUBLIC_PATHS", "/login, /status ,");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.security.token_secret, "prod-secret");
    assert_eq!(config.security.token_ttl, Duration::from_secs(900));
    assert_eq!(config.security.store_timeout, Duration::from_millis(250));
    assert_eq!(config.security.public_paths, vec!["/login", "/status"]);
}

#[test]
#[serial]
fn test_app_config_rejects_zero_ttl() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("TOKEN_TTL_SECS", "0");
            }
            AppConfig::load()
        })
    });

    assert!(result.is_err());
}
