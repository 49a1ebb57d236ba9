//! Lazily compiled regular expressions shared by the document parsers

/// Define a function returning a lazily compiled, process-wide regex
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static regex::Regex {
            static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            RE.get_or_init(|| {
                regex::Regex::new($pattern).expect(concat!("invalid regex ", stringify!($name)))
            })
        }
    };
}

pub(crate) use static_regex;

static_regex!(number_token_re, r"[\d.,]+");
static_regex!(es_amount_re, r"\d{1,3}(?:\.\d{3})+,\d+|\d+[,.]\d+");

/// Every run of digits, dots and commas in `s`
pub(crate) fn number_tokens(s: &str) -> Vec<&str> {
    number_token_re()
        .find_iter(s)
        .map(|m| m.as_str())
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .collect()
}

/// Decimal amounts only (`1,398`, `1.234,56`), skipping bare integers
pub(crate) fn decimal_tokens(s: &str) -> Vec<&str> {
    es_amount_re().find_iter(s).map(|m| m.as_str()).collect()
}
