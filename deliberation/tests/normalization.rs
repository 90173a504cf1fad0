//! Domain normalization is deterministic and idempotent.

use deliberation::target::{display_name, normalize_domain};
use deliberation::{InputValidationError, Target};

const SAMPLES: &[&str] = &[
    "https://www.Acme-Corp.io/",
    "acme-corp.io",
    "HTTP://WWW.EXAMPLE.COM",
    "www.big_data.co.uk/",
    "stripe.com/",
    "https://app.notion.so/product",
    "ftp://files.example.org//",
    "localhost:3000",
];

#[test]
fn normalization_applied_twice_equals_once() {
    for raw in SAMPLES {
        let once = normalize_domain(raw).unwrap();
        assert_eq!(normalize_domain(&once).unwrap(), once, "{raw}");
    }
}

#[test]
fn display_name_is_stable_under_renormalization() {
    for raw in SAMPLES {
        let a = Target::parse(raw).unwrap();
        let b = Target::parse(&a.domain).unwrap();
        assert_eq!(a, b, "{raw}");
        assert_eq!(display_name(&a.domain), a.name);
    }
}

#[test]
fn acme_example() {
    let t = Target::parse("https://www.Acme-Corp.io/").unwrap();
    assert_eq!(t.name, "Acme Corp");
    assert_eq!(t.to_string(), "Acme Corp (acme-corp.io)");
}

#[test]
fn rejects_empty_input() {
    assert_eq!(Target::parse(""), Err(InputValidationError::EmptyDomain));
    assert_eq!(Target::parse("https://"), Err(InputValidationError::EmptyDomain));
}
