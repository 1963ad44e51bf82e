// src/services/serial_allocator.rs

// Número de série legível: DC-<ano>-<sequência com 4 dígitos no mínimo>

pub const SERIAL_PREFIX: &str = "DC";
/// Maior sequência aceita (9 dígitos). Acima disso o ano está esgotado.
pub const MAX_SEQUENCE: u64 = 999_999_999;

/// Prefixo de um ano, com o hífen final (`DC-2025-`). Também é a chave do advisory lock.
pub fn year_prefix(year: i32) -> String {
    format!("{SERIAL_PREFIX}-{year}-")
}

pub fn format_serial(year: i32, sequence: u64) -> String {
    format!("{}{:04}", year_prefix(year), sequence)
}

/// Sequência de um sufixo na forma canônica: exatamente o que `format_serial`
/// produziria (4 dígitos com zeros, ou mais dígitos sem zero à esquerda),
/// entre 1 e `MAX_SEQUENCE`.
pub fn canonical_sequence(suffix: &str) -> Option<u64> {
    if suffix.len() < 4 || suffix.len() > 9 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if suffix.len() > 4 && suffix.starts_with('0') {
        return None;
    }
    let sequence: u64 = suffix.parse().ok()?;
    (1..=MAX_SEQUENCE).contains(&sequence).then_some(sequence)
}

/// Ano e sequência de um sr_no completo (`DC-2025-0001`).
pub fn parse_serial(sr_no: &str) -> Option<(i32, u64)> {
    let rest = sr_no.strip_prefix(SERIAL_PREFIX)?.strip_prefix('-')?;
    let (year, suffix) = rest.split_once('-')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((year.parse().ok()?, canonical_sequence(suffix)?))
}

/// Sequência numérica de um sr_no do ano, ou `None` se não seguir o formato.
pub fn parse_sequence(sr_no: &str, year: i32) -> Option<u64> {
    canonical_sequence(sr_no.strip_prefix(&year_prefix(year))?)
}

/// Próximo número a partir do maior existente no ano (excluídos incluídos).
/// `None` quando a sequência do ano chegou a `MAX_SEQUENCE`.
pub fn next_serial(year: i32, last: Option<&str>) -> Option<String> {
    let next = last
        .and_then(|sr_no| parse_sequence(sr_no, year))
        .map_or(1, |seq| seq + 1);
    (next <= MAX_SEQUENCE).then(|| format_serial(year, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_serial_of_the_year() {
        assert_eq!(next_serial(2025, None).as_deref(), Some("DC-2025-0001"));
    }

    #[test]
    fn sequential_allocation() {
        let mut last: Option<String> = None;
        for expected in ["DC-2025-0001", "DC-2025-0002", "DC-2025-0003"] {
            let next = next_serial(2025, last.as_deref()).unwrap();
            assert_eq!(next, expected);
            last = Some(next);
        }
    }

    #[test]
    fn sequence_grows_past_four_digits() {
        assert_eq!(next_serial(2025, Some("DC-2025-9999")).as_deref(), Some("DC-2025-10000"));
        assert_eq!(next_serial(2025, Some("DC-2025-10000")).as_deref(), Some("DC-2025-10001"));
    }

    #[test]
    fn the_year_runs_out_at_nine_digits() {
        assert_eq!(next_serial(2025, Some("DC-2025-999999998")).as_deref(), Some("DC-2025-999999999"));
        assert_eq!(next_serial(2025, Some("DC-2025-999999999")), None);
    }

    #[test]
    fn other_years_and_malformed_values_restart_at_one() {
        assert_eq!(next_serial(2026, Some("DC-2025-0042")).as_deref(), Some("DC-2026-0001"));
        assert_eq!(parse_sequence("DC-2025-00a1", 2025), None);
        assert_eq!(parse_sequence("DC-2025-", 2025), None);
        assert_eq!(parse_sequence("DC-2025-0042", 2025), Some(42));
    }

    #[test]
    fn only_canonical_sequences_are_accepted() {
        assert_eq!(canonical_sequence("0001"), Some(1));
        assert_eq!(canonical_sequence("12345"), Some(12345));
        assert_eq!(canonical_sequence("00001"), None);
        assert_eq!(canonical_sequence("0000"), None);
        assert_eq!(canonical_sequence("001"), None);
        assert_eq!(canonical_sequence("1000000000"), None);
        assert_eq!(canonical_sequence(&"9".repeat(24)), None);
    }

    #[test]
    fn parse_serial_splits_year_and_sequence() {
        assert_eq!(parse_serial("DC-2025-0001"), Some((2025, 1)));
        assert_eq!(parse_serial("DC-25-0001"), None);
        assert_eq!(parse_serial("XX-2025-0001"), None);
        assert_eq!(parse_serial("DC-2025-0001-1"), None);
        assert_eq!(parse_serial("DC-2025-00001"), None);
    }
}
