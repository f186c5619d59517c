use std::{env, fmt, time::Duration};

/// Fallback signing secret for local runs and tests. Never accepted in production.
const LOCAL_TOKEN_SECRET: &str = "super-secure-test-secret-value-local";

/// Paths that bypass the authentication filter unless `PUBLIC_PATHS` overrides them.
const DEFAULT_PUBLIC_PATHS: &[&str] = &["/health", "/auth/token", "/swagger-ui/*", "/api-docs/*"];

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and treated as
/// immutable afterwards; it is pulled into handlers and middleware through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and demo user seeding.
    pub env: Env,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Optional JSON file with the user records served by the in-memory store.
    pub users_file: Option<String>,
    // Password given to the demo users seeded in `Env::Local`.
    pub demo_password: String,
    pub security: SecurityConfig,
}

/// SecurityConfig
///
/// The explicit security configuration value consumed by the token service, the credential
/// validator and the authentication filter.
#[derive(Clone)]
pub struct SecurityConfig {
    // Shared HMAC secret. Read-only for the process lifetime.
    pub token_secret: String,
    // Lifetime of issued tokens.
    pub token_ttl: Duration,
    // Upper bound on a single user store lookup.
    pub store_timeout: Duration,
    // Paths exempt from the authentication filter. Entries ending in `/*` match by prefix.
    pub public_paths: Vec<String>,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences (pretty
/// logs, demo users, fallback secret) and hardened production behaviour.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

// The secret never reaches a log line.
impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("public_paths", &self.public_paths)
            .finish()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_secret: LOCAL_TOKEN_SECRET.to_string(),
            token_ttl: Duration::from_secs(3600),
            store_timeout: Duration::from_millis(2000),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            users_file: None,
            demo_password: "password".to_string(),
            security: SecurityConfig::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if `TOKEN_SECRET` is missing in production, or if a numeric setting cannot be
    /// parsed. The application must not start with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The production secret is mandatory and must be explicitly set.
        let token_secret = match env {
            Env::Production => {
                env::var("TOKEN_SECRET").expect("FATAL: TOKEN_SECRET must be set in production.")
            }
            Env::Local => {
                env::var("TOKEN_SECRET").unwrap_or_else(|_| LOCAL_TOKEN_SECRET.to_string())
            }
        };
        if token_secret.is_empty() {
            panic!("FATAL: TOKEN_SECRET must not be empty.");
        }

        let token_ttl = Duration::from_secs(parse_var("TOKEN_TTL_SECS", 3600));
        if token_ttl.is_zero() {
            panic!("FATAL: TOKEN_TTL_SECS must be greater than zero.");
        }
        let store_timeout = Duration::from_millis(parse_var("STORE_TIMEOUT_MS", 2000));

        let public_paths = match env::var("PUBLIC_PATHS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            users_file: env::var("USERS_FILE").ok(),
            demo_password: env::var("DEMO_PASSWORD").unwrap_or_else(|_| "password".to_string()),
            security: SecurityConfig {
                token_secret,
                token_ttl,
                store_timeout,
                public_paths,
            },
        }
    }
}

fn parse_var(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {name} must be a non-negative integer.")),
        Err(_) => default,
    }
}
