//! Lexical complexity estimate for a single diff.
//!
//! The score is `1.0` plus a weighted count of control-flow keywords found
//! anywhere in the diff text. Nothing is parsed: headers, context lines and
//! removed lines are all counted, so deleting a loop raises the score just
//! like adding one does.

use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

/// Score of a diff with no matches.
pub const BASE_SCORE: f64 = 1.0;

/// One weighted pattern.
#[derive(Debug, Clone)]
pub struct ComplexityRule {
    /// Short name used in logs.
    pub name: &'static str,
    /// Pattern counted with non-overlapping matches.
    pub pattern: Regex,
    /// Added to the score once per match.
    pub weight: f64,
}

impl ComplexityRule {
    /// Build a rule from an already compiled pattern.
    pub fn new(name: &'static str, pattern: Regex, weight: f64) -> Self {
        Self {
            name,
            pattern,
            weight,
        }
    }

    fn builtin(name: &'static str, pattern: &str, weight: f64) -> Self {
        Self::new(name, Regex::new(pattern).expect("valid regex"), weight)
    }
}

/// Built-in rule table, compiled once.
pub fn default_rules() -> &'static [ComplexityRule] {
    static RULES: OnceLock<Vec<ComplexityRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            ComplexityRule::builtin("function", r"function\s+\w+\s*\(", 1.0),
            ComplexityRule::builtin("if", r"if\s*\(", 0.5),
            ComplexityRule::builtin("else", r"else\s*\{", 0.3),
            ComplexityRule::builtin("for", r"for\s*\(", 1.0),
            ComplexityRule::builtin("while", r"while\s*\(", 1.0),
            ComplexityRule::builtin("switch", r"switch\s*\(", 0.8),
            ComplexityRule::builtin("ternary", r"\?\s*:", 0.2),
            ComplexityRule::builtin("try", r"try\s*\{", 0.5),
            ComplexityRule::builtin("catch", r"catch\s*\(", 0.5),
        ]
    })
}

/// Scores diffs against an ordered rule table.
///
/// # Examples
///
/// ```
/// use revue_difflens::complexity::ComplexityEstimator;
///
/// let estimator = ComplexityEstimator::default();
/// assert_eq!(estimator.estimate(""), 1.0);
/// assert_eq!(estimator.estimate("+for (const x of xs) {"), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct ComplexityEstimator {
    rules: Vec<ComplexityRule>,
}

impl Default for ComplexityEstimator {
    fn default() -> Self {
        Self {
            rules: default_rules().to_vec(),
        }
    }
}

impl ComplexityEstimator {
    /// Use a custom rule table instead of the built-in one.
    pub fn with_rules(rules: Vec<ComplexityRule>) -> Self {
        Self { rules }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[ComplexityRule] {
        &self.rules
    }

    /// Score `diff_text`, rounded to two decimals.
    pub fn estimate(&self, diff_text: &str) -> f64 {
        score(&self.rules, diff_text)
    }
}

/// Score `diff_text` with the built-in rules.
///
/// # Examples
///
/// ```
/// use revue_difflens::complexity::estimate;
///
/// let diff = "+if (a) {}\n+if (b) {}\n+if (c) {}\n";
/// assert_eq!(estimate(diff), 2.5);
/// ```
pub fn estimate(diff_text: &str) -> f64 {
    score(default_rules(), diff_text)
}

fn score(rules: &[ComplexityRule], diff_text: &str) -> f64 {
    let total = rules.iter().fold(BASE_SCORE, |acc, rule| {
        let matches = rule.pattern.find_iter(diff_text).count();
        if matches > 0 {
            trace!(rule = rule.name, matches, "complexity rule matched");
        }
        acc + matches as f64 * rule.weight
    });
    round2(total)
}

/// Round to two decimals.
///
/// The stored double is rounded as written out exactly, so `1.005` (stored
/// just below) goes down. Exact ties go away from zero.
///
/// # Examples
///
/// ```
/// use revue_difflens::complexity::round2;
///
/// assert_eq!(round2(2.0 / 3.0), 0.67);
/// assert_eq!(round2(0.125), 0.13);
/// assert_eq!(round2(1.005), 1.0);
/// ```
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e15 {
        return value;
    }
    // 60 fractional digits hold the full binary expansion of any double
    // whose third decimal can matter.
    let exact = format!("{:.60}", value.abs());
    let (whole, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut cents = whole
        .bytes()
        .chain(frac.bytes().take(2))
        .fold(0u64, |acc, digit| acc * 10 + u64::from(digit - b'0'));
    if frac.as_bytes().get(2).is_some_and(|&digit| digit >= b'5') {
        cents += 1;
    }
    (cents as f64 / 100.0).copysign(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_scores_base() {
        assert_eq!(estimate(""), 1.0);
        assert_eq!(estimate("   \n\n"), 1.0);
    }

    #[test]
    fn three_ifs() {
        assert_eq!(estimate("if (a)\nif(b)\nif  (c)"), 2.5);
    }

    #[test]
    fn each_rule_contributes_its_weight() {
        let cases = [
            ("function load(", 2.0),
            ("} else {", 1.3),
            ("for (;;)", 2.0),
            ("while (true)", 2.0),
            ("switch (kind)", 1.8),
            ("a ? : b", 1.2),
            ("try {", 1.5),
            ("catch (err)", 1.5),
        ];
        for (text, expected) in cases {
            assert_eq!(estimate(text), expected, "text: {text}");
        }
    }

    #[test]
    fn removed_and_header_lines_count_too() {
        let diff = "\
--- a/loop.js
+++ b/loop.js
@@ -1,3 +1,1 @@
-while (busy) {
-}
 done();
";
        assert_eq!(estimate(diff), 2.0);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(estimate("IF (x) WHILE (y)"), 1.0);
    }

    #[test]
    fn function_needs_a_name() {
        assert_eq!(estimate("const f = function (a) {}"), 1.0);
    }

    #[test]
    fn mixed_diff_rounds_to_two_decimals() {
        let diff = "\
+function run(items) {
+  for (const item of items) {
+    if (item.ok) {
+      try {
+        handle(item);
+      } catch (e) {
+        log(e);
+      }
+    } else {
+      skip(item ? : null);
+    }
+  }
+}
";
        // 1 + 1.0 + 1.0 + 0.5 + 0.5 + 0.5 + 0.3 + 0.2
        assert_eq!(estimate(diff), 5.0);
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let estimator =
            ComplexityEstimator::with_rules(vec![ComplexityRule::new(
                "match",
                Regex::new(r"match\s").unwrap(),
                2.0,
            )]);
        assert_eq!(estimator.estimate("match x {\nif (y)"), 3.0);
        assert_eq!(estimator.rules().len(), 1);
    }

    #[test]
    fn estimator_matches_free_function() {
        let text = "if (a) { b() } else { c() }";
        assert_eq!(ComplexityEstimator::default().estimate(text), estimate(text));
    }

    #[test]
    fn rounding_is_stable() {
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(2.345_000_1), 2.35);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn rounding_uses_the_stored_value() {
        // 4.3 / 4 is stored as 1.07499999999999995559...
        assert_eq!(round2(4.3 / 4.0), 1.07);
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(8.345), 8.35);
        // Exact binary ties go up.
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(2.375), 2.38);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(12.999), 13.0);
    }

    #[test]
    fn estimate_is_deterministic() {
        let diff = "+for (;;) {\n+  if (x) { y() } else { z() }\n+}\n";
        let first = estimate(diff);
        for _ in 0..5 {
            assert_eq!(estimate(diff), first);
        }
        assert_eq!(ComplexityEstimator::default().estimate(diff), first);
        assert_eq!(first, 2.8);
    }
}
