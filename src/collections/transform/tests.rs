use rstest::rstest;

use super::*;

#[rstest]
#[case(Mode::Live, "LIVE")]
#[case(Mode::Batch, "BATCH")]
fn mode_text(#[case] mode: Mode, #[case] text: &str) {
    assert_eq!(mode.to_string(), text);
    assert_eq!(text.parse::<Mode>().unwrap(), mode);
    assert_eq!(serde_json::to_string(&mode).unwrap(), format!("\"{text}\""));
    assert_eq!(serde_json::from_str::<Mode>(&format!("\"{text}\"")).unwrap(), mode);
}

#[test]
fn mode_rejects_unknown() {
    assert!("live".parse::<Mode>().is_err());
    assert_eq!(Mode::default(), Mode::Live);
}

#[test]
fn comparators() {
    let natural = Comparator::<f64>::natural();
    assert_eq!(natural.compare(&1.0, &2.0), Ok(Ordering::Less));
    assert_eq!(natural.reversed().compare(&1.0, &2.0), Ok(Ordering::Greater));
    assert_eq!(natural.compare(&1.0, &f64::NAN), Err(Error::Incomparable));

    let by_len = Comparator::by_key(|s: &&str| s.len());
    assert_eq!(by_len.compare(&"ab", &"c"), Ok(Ordering::Greater));
}

#[test]
fn matchers() {
    let even = Matcher::new(|v: &i32| v % 2 == 0);
    assert!(even.matches(&2));
    assert!(!even.matches(&3));
    assert!(Matcher::<i32>::all().matches(&3));
}
