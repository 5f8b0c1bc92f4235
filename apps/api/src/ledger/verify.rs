//! Ledger verification: does a candidate text match what is stored on-chain,
//! once both are normalized?

use chrono::{DateTime, Utc};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::info;

use crate::documents::normalize::normalize;
use crate::errors::AppError;
use crate::ledger::store::fetch_contract_text;
use crate::ledger::{Address, Ledger};

#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub address: Address,
    pub matched: bool,
    /// Unified diff of the normalized texts (on-chain first); present only on mismatch.
    pub diff: Option<String>,
    pub changed_lines: usize,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Comparison {
    pub matched: bool,
    pub diff: Option<String>,
    pub changed_lines: usize,
}

pub async fn verify_at(
    ledger: &dyn Ledger,
    address: &Address,
    candidate: &str,
) -> Result<Verification, AppError> {
    let record = fetch_contract_text(ledger, address).await?;
    let comparison = compare_texts(&record.contract_content, candidate);
    info!(
        "Verified {} against on-chain text: matched={} changed_lines={}",
        address, comparison.matched, comparison.changed_lines
    );

    Ok(Verification {
        address: *address,
        matched: comparison.matched,
        diff: comparison.diff,
        changed_lines: comparison.changed_lines,
        checked_at: Utc::now(),
    })
}

/// `matched` iff the normalized texts are equal. On mismatch the diff is never empty.
pub fn compare_texts(stored: &str, candidate: &str) -> Comparison {
    let stored_norm = normalize(stored);
    let candidate_norm = normalize(candidate);
    if stored_norm == candidate_norm {
        return Comparison {
            matched: true,
            diff: None,
            changed_lines: 0,
        };
    }

    // Diff line by line so the output points at the offending lines. Markdown that
    // spans lines can make per-line forms agree while the whole texts do not; fall
    // back to the single-line normalized forms in that case.
    let stored_lines = normalized_lines(stored);
    let candidate_lines = normalized_lines(candidate);
    let (old, new) = if stored_lines != candidate_lines {
        (stored_lines, candidate_lines)
    } else {
        (format!("{stored_norm}\n"), format!("{candidate_norm}\n"))
    };

    let diff = TextDiff::from_lines(&old, &new);
    let changed_lines = diff
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .count();
    let rendered = diff
        .unified_diff()
        .context_radius(2)
        .header("on-chain", "candidate")
        .to_string();

    Comparison {
        matched: false,
        diff: Some(rendered),
        changed_lines,
    }
}

/// Normalizes each source line on its own, dropping lines that normalize to nothing.
fn normalized_lines(text: &str) -> String {
    text.lines()
        .map(normalize)
        .filter(|line| !line.is_empty())
        .fold(String::new(), |mut acc, line| {
            acc.push_str(&line);
            acc.push('\n');
            acc
        })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::documents::extract::extract_pdf_text;
    use crate::documents::render::render_pdf;
    use crate::ledger::fake::FakeLedger;
    use crate::ledger::parse_address;
    use crate::ledger::storage::creation_code;

    const STORED: &str = "# Service Agreement\n\nParty One: **Acme Corp**\nParty Two: Globex LLC\n\nPayment due within 30 days.\nSignature: ________";

    fn ledger_with(text: &str) -> (FakeLedger, Address) {
        let address = parse_address("0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB").unwrap();
        let runtime = creation_code(text).unwrap()[10..].to_vec();
        (FakeLedger::default().with_code(address, runtime), address)
    }

    #[test]
    fn test_formatting_only_changes_match() {
        let candidate = "SERVICE AGREEMENT\nParty One:   Acme Corp\nParty Two: Globex LLC\nPayment due within 30 days.\nSignature: ___";
        let comparison = compare_texts(STORED, candidate);
        assert!(comparison.matched);
        assert_eq!(comparison.diff, None);
    }

    #[test]
    fn test_mismatch_produces_line_diff() {
        let candidate = STORED.replace("30 days", "90 days");
        let comparison = compare_texts(STORED, &candidate);
        assert!(!comparison.matched);
        let diff = comparison.diff.unwrap();
        assert!(diff.contains("-payment due within 30 days."));
        assert!(diff.contains("+payment due within 90 days."));
        assert!(diff.contains("--- on-chain"));
        assert_eq!(comparison.changed_lines, 2);
    }

    #[test]
    fn test_matched_iff_normalized_equal() {
        let pairs = [
            ("Hello   World", "hello world"),
            ("A___B", "a_b"),
            ("Alpha", "Beta"),
            ("", "something"),
            ("line one\nline two", "line one line two"),
        ];
        for (stored, candidate) in pairs {
            let comparison = compare_texts(stored, candidate);
            assert_eq!(comparison.matched, normalize(stored) == normalize(candidate));
            if !comparison.matched {
                assert!(
                    comparison.diff.as_deref().is_some_and(|d| !d.is_empty()),
                    "empty diff for {stored:?} vs {candidate:?}"
                );
            }
        }
    }

    #[test]
    fn test_multiline_markup_falls_back_to_whole_text_diff() {
        // Per line both sides read "*a" / "b*"; as a whole one side is emphasis.
        let comparison = compare_texts("*a\nb*", "\\*a\nb\\*");
        assert!(!comparison.matched);
        assert!(comparison.diff.is_some_and(|d| !d.is_empty()));
    }

    #[tokio::test]
    async fn test_rendered_pdf_verifies_against_source_text() {
        let samples = [
            format!("Signature: {}", "_".repeat(100)),
            format!("Witness {}\nDate: ____", "_".repeat(120)),
            format!(
                "Schedule A is published at https://example.com/{} and forms part of this agreement.",
                "a".repeat(120)
            ),
            "# Lease\n\nTenant: **Jane Roe**\nRent: $1,200 per month".to_string(),
        ];
        for text in samples {
            let pdf = render_pdf(&text, "roundtrip").unwrap();
            let extracted = extract_pdf_text(Bytes::from(pdf)).await.unwrap();
            let comparison = compare_texts(&text, &extracted);
            assert!(
                comparison.matched,
                "{text:?} read back as {extracted:?}: {:?}",
                comparison.diff
            );
        }
    }

    #[tokio::test]
    async fn test_verify_matches_stored_text() {
        let (ledger, address) = ledger_with(STORED);
        let verification = verify_at(&ledger, &address, STORED).await.unwrap();
        assert!(verification.matched);
        assert!(verification.diff.is_none());
        assert_eq!(verification.address, address);
    }

    #[tokio::test]
    async fn test_verify_reports_tampered_text() {
        let (ledger, address) = ledger_with(STORED);
        let verification = verify_at(&ledger, &address, &STORED.replace("Globex", "Initech"))
            .await
            .unwrap();
        assert!(!verification.matched);
        assert!(verification.diff.unwrap().contains("initech"));
    }

    #[tokio::test]
    async fn test_verify_unknown_address_is_not_found() {
        let ledger = FakeLedger::default();
        let address = parse_address("0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb").unwrap();
        let err = verify_at(&ledger, &address, STORED).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_verify_transport_error_is_reported() {
        let ledger = FakeLedger {
            fail_transport: true,
            ..Default::default()
        };
        let address = parse_address("0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb").unwrap();
        let err = verify_at(&ledger, &address, STORED).await.unwrap_err();
        assert!(matches!(err, AppError::Ledger(_)));
    }
}
