//! Keyword sniffing for the issuing bank.

use cardstmt_core::BankId;

/// Keywords per bank, checked in this order; the first hit wins.
const SIGNATURES: &[(BankId, &[&str])] = &[
    (BankId::Icici, &["icici"]),
    (BankId::Hdfc, &["hdfc"]),
    (BankId::Sbi, &["sbi", "state bank"]),
    (BankId::Kotak, &["kotak"]),
    (BankId::Amex, &["american express", "amex"]),
];

/// Guess the issuer from a text sample. `None` means unsupported.
pub fn detect_bank(sample: &str) -> Option<BankId> {
    let text = sample.to_lowercase();
    SIGNATURES
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(bank, _)| *bank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_bank() {
        assert_eq!(detect_bank("ICICI Bank Credit Card"), Some(BankId::Icici));
        assert_eq!(detect_bank("HDFC BANK Ltd"), Some(BankId::Hdfc));
        assert_eq!(detect_bank("SBI Card statement"), Some(BankId::Sbi));
        assert_eq!(detect_bank("State Bank of India"), Some(BankId::Sbi));
        assert_eq!(detect_bank("Kotak Mahindra"), Some(BankId::Kotak));
        assert_eq!(detect_bank("AMERICAN EXPRESS"), Some(BankId::Amex));
        assert_eq!(detect_bank("amex platinum"), Some(BankId::Amex));
    }

    #[test]
    fn test_first_signature_wins() {
        // a Kotak statement that mentions an ICICI payment is detected as ICICI
        assert_eq!(detect_bank("Kotak ... PAYMENT FROM ICICI"), Some(BankId::Icici));
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(detect_bank("Chase Sapphire"), None);
        assert_eq!(detect_bank(""), None);
    }
}
