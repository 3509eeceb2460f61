use crate::error::{AppError, AppResult};
use rand::Rng;
use regex::Regex;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const BASE36_DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const MAX_CODE_LEN: usize = 32;
pub const MAX_PREFIX_LEN: usize = 12;

/// 统一促销码格式: 去掉首尾空白并转大写
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// 校验 (已规范化的) 促销码: 3-32 位大写字母、数字、`-`、`_`
pub fn validate_code_format(code: &str) -> AppResult<()> {
    let code_regex = Regex::new(r"^[A-Z0-9_-]{3,32}$")
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    if !code_regex.is_match(code) {
        return Err(AppError::ValidationError(format!(
            "Invalid promotion code '{code}': use 3-32 characters A-Z, 0-9, '-' or '_'"
        )));
    }

    Ok(())
}

/// 规范化前缀/后缀，仅保留允许的字符
pub fn sanitize_affix(raw: Option<&str>) -> AppResult<String> {
    let affix: String = raw
        .map(normalize_code)
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if affix.len() > MAX_PREFIX_LEN {
        return Err(AppError::ValidationError(format!(
            "Code prefix/suffix must be at most {MAX_PREFIX_LEN} characters"
        )));
    }

    Ok(affix)
}

/// 生成指定长度的大写字母数字随机串
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// 单个促销码候选: PREFIX + 随机串 + SUFFIX
pub fn random_code(prefix: &str, suffix: &str, length: usize) -> String {
    let body_len = length
        .min(MAX_CODE_LEN.saturating_sub(prefix.len() + suffix.len()))
        .max(1);
    format!("{prefix}{}{suffix}", random_alphanumeric(body_len))
}

pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize] as char);
        n /= 36;
    }
    digits.iter().rev().collect()
}

/// 批量生成时的候选: PREFIX + 品牌标识 + 时间戳(base36 末 5 位) + 序号
pub fn timestamped_code(prefix: &str, brand_tag: &str, timestamp_millis: i64, counter: u32) -> String {
    let ts = to_base36(timestamp_millis.unsigned_abs());
    let ts_tail = &ts[ts.len().saturating_sub(5)..];
    format!("{prefix}{brand_tag}{ts_tail}{counter}")
}

/// 渲染调用方模板，支持 `{BRAND}` 与 `{N}` 占位符。
/// 模板中没有 `{N}` 且每个品牌需要多个码时，追加 `-{n}` 作为后缀序号。
pub fn render_template(template: &str, brand_tag: &str, counter: u32, count_per_brand: u32) -> String {
    let has_counter = template.contains("{N}");
    let mut code = template
        .replace("{BRAND}", brand_tag)
        .replace("{N}", &counter.to_string());
    if !has_counter && count_per_brand > 1 {
        code = format!("{code}-{counter}");
    }
    normalize_code(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  summer10 "), "SUMMER10");
        assert_eq!(normalize_code("Black-Friday_24"), "BLACK-FRIDAY_24");
    }

    #[test]
    fn test_validate_code_format() {
        assert!(validate_code_format("SUMMER10").is_ok());
        assert!(validate_code_format("BF-2024_A").is_ok());
        assert!(validate_code_format("AB").is_err());
        assert!(validate_code_format("summer").is_err());
        assert!(validate_code_format("HAS SPACE").is_err());
        assert!(validate_code_format(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_random_code_shape() {
        let code = random_code("VIP", "", 8);
        assert_eq!(code.len(), 11);
        assert!(code.starts_with("VIP"));
        assert!(code[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(validate_code_format(&code).is_ok());
    }

    #[test]
    fn test_random_code_stays_within_max_len() {
        let code = random_code("ABCDEFGHIJKL", "MNOPQRSTUVWX", 20);
        assert_eq!(code.len(), MAX_CODE_LEN);
    }

    #[test]
    fn test_sanitize_affix() {
        assert_eq!(sanitize_affix(Some(" sale! ")).unwrap(), "SALE");
        assert_eq!(sanitize_affix(None).unwrap(), "");
        assert!(sanitize_affix(Some("THIS-PREFIX-IS-TOO-LONG")).is_err());
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_timestamped_codes_differ_by_counter() {
        let a = timestamped_code("SALE", "ACME", 1_700_000_000_000, 1);
        let b = timestamped_code("SALE", "ACME", 1_700_000_000_000, 2);
        assert_ne!(a, b);
        assert!(a.starts_with("SALEACME"));
        assert!(validate_code_format(&a).is_ok());
    }

    #[test]
    fn test_render_template() {
        assert_eq!(render_template("spring-{BRAND}-{N}", "ACME", 3, 5), "SPRING-ACME-3");
        assert_eq!(render_template("SPRING-{BRAND}", "ACME", 2, 2), "SPRING-ACME-2");
        assert_eq!(render_template("SPRING-{BRAND}", "ACME", 1, 1), "SPRING-ACME");
    }
}
