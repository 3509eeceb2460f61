use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub promotions: PromotionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 只校验外部认证服务签发的访问令牌，本服务不签发令牌
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionConfig {
    /// 生成唯一促销码的最大尝试次数
    #[serde(default = "default_code_generation_attempts")]
    pub code_generation_attempts: u32,
    /// 自动生成的随机部分长度
    #[serde(default = "default_generated_code_length")]
    pub generated_code_length: usize,
    /// 多少天内到期视为"即将到期"
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: i64,
    /// 统计接口默认回溯天数
    #[serde(default = "default_analytics_days")]
    pub analytics_default_days: i64,
}

fn default_code_generation_attempts() -> u32 {
    5
}

fn default_generated_code_length() -> usize {
    8
}

fn default_expiring_soon_days() -> i64 {
    7
}

fn default_analytics_days() -> i64 {
    30
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            code_generation_attempts: default_code_generation_attempts(),
            generated_code_length: default_generated_code_length(),
            expiring_soon_days: default_expiring_soon_days(),
            analytics_default_days: default_analytics_days(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                    },
                    promotions: PromotionConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        Ok(config)
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("PROMO_CODE_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            self.promotions.code_generation_attempts = n;
        }
        if let Ok(v) = env::var("PROMO_CODE_LENGTH")
            && let Ok(n) = v.parse()
        {
            self.promotions.generated_code_length = n;
        }
        if let Ok(v) = env::var("PROMO_EXPIRING_SOON_DAYS")
            && let Ok(n) = v.parse()
        {
            self.promotions.expiring_soon_days = n;
        }
        if let Ok(v) = env::var("PROMO_ANALYTICS_DEFAULT_DAYS")
            && let Ok(n) = v.parse()
        {
            self.promotions.analytics_default_days = n;
        }
    }
}
