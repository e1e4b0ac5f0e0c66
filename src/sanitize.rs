//! Markup stripping for message bodies.
//!
//! Rules live in [`RULES`], an ordered table of `(name, pattern, replacement)`.
//! Each rule is applied to every non-overlapping match in the whole body
//! before the next one runs. After the table, runs of three or more newlines
//! collapse to two and the body is trimmed.
//!
//! A single pass is not idempotent on nested fragments (`<pi<pic>x</pic>c>`
//! becomes `<pic>` once the inner pair is removed), so [`sanitize`] repeats
//! the pass until the text stops changing. Every rule strictly shortens the
//! text when it matches, so the loop terminates.

use regex::Regex;
use std::sync::LazyLock;

/// One row of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct RuleDef {
    pub name: &'static str,
    pub pattern: &'static str,
    pub replacement: &'static str,
}

/// Rule table, in application order.
pub const RULES: &[RuleDef] = &[
    // Reasoning blocks, optionally fenced.
    RuleDef {
        name: "thinking",
        pattern: r"(?:```?\w*[\r\n]?)?<(?:thought|cot|thinking|CoT|think|starter)[\s\S]*?</(?:thought|cot|thinking|CoT|think|starter)>(?:[\r\n]?```?)?",
        replacement: "",
    },
    RuleDef {
        name: "pic_block",
        pattern: r"<pic>[\s\S]*?</pic>",
        replacement: "",
    },
    RuleDef {
        name: "image_info",
        pattern: r"(?i)<imageinfo>[\s\S]*?</imageinfo>",
        replacement: "",
    },
    RuleDef {
        name: "pic_prompt",
        pattern: r#"<pic\s+prompt="[^"]*"\s*/?>"#,
        replacement: "",
    },
    RuleDef {
        name: "pic_close",
        pattern: r"</pic>",
        replacement: "",
    },
    RuleDef {
        name: "ooc_tag",
        pattern: r"(?i)<ooc>[\s\S]*?</ooc>",
        replacement: "",
    },
    RuleDef {
        name: "ooc_bracket",
        pattern: r"(?i)[\[(]\s*ooc\s*:[^\])]*[\])]",
        replacement: "",
    },
    RuleDef {
        name: "marker",
        pattern: r"➛",
        replacement: "",
    },
    // Status banner up to (not including) the closing fence.
    RuleDef {
        name: "status_banner",
        pattern: r"🥨 Sex Position[\s\S]*?(```)",
        replacement: "$1",
    },
];

static COMPILED: LazyLock<Vec<(&'static RuleDef, Regex)>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let re = Regex::new(rule.pattern)
                .unwrap_or_else(|e| panic!("invalid sanitize rule '{}': {}", rule.name, e));
            (rule, re)
        })
        .collect()
});

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strips markup from a message body. Total and idempotent.
pub fn sanitize(body: &str) -> String {
    let mut current = single_pass(body);
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Applies one named rule on its own.
pub fn apply_rule(name: &str, body: &str) -> Option<String> {
    COMPILED
        .iter()
        .find(|(rule, _)| rule.name == name)
        .map(|(rule, re)| re.replace_all(body, rule.replacement).into_owned())
}

fn single_pass(body: &str) -> String {
    let mut text = body.to_string();
    for (rule, re) in COMPILED.iter() {
        if re.is_match(&text) {
            text = re.replace_all(&text, rule.replacement).into_owned();
        }
    }
    BLANK_RUNS.replace_all(&text, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(COMPILED.len(), RULES.len());
    }

    #[test]
    fn test_plain_text_untouched() {
        let body = "Hello there.\n\nHow are you?";
        assert_eq!(sanitize(body), body);
    }

    #[test]
    fn test_thinking_block_removed() {
        let body = "<thinking>plan the reply</thinking>Hi!";
        assert_eq!(sanitize(body), "Hi!");
        let body = "Before\n<CoT>\nsteps\n</CoT>\nAfter";
        assert_eq!(sanitize(body), "Before\n\nAfter");
    }

    #[test]
    fn test_fenced_thinking_removed() {
        let body = "```\n<think>hidden</think>\n```\nVisible";
        assert_eq!(sanitize(body), "Visible");
    }

    #[test]
    fn test_thinking_with_attributes() {
        let body = "<thought type=\"x\">a</thought>b";
        assert_eq!(sanitize(body), "b");
    }

    #[test]
    fn test_pic_forms_removed() {
        assert_eq!(sanitize("a<pic>prompt text</pic>b"), "ab");
        assert_eq!(sanitize("a<pic prompt=\"sunset, beach\">b"), "ab");
        assert_eq!(sanitize("a<pic prompt=\"x\"/>b"), "ab");
        assert_eq!(sanitize("a</pic>b"), "ab");
    }

    #[test]
    fn test_image_info_case_insensitive() {
        assert_eq!(sanitize("x<imageInfo>seed: 1</imageInfo>y"), "xy");
        assert_eq!(sanitize("x<IMAGEINFO>seed</ImageInfo>y"), "xy");
    }

    #[test]
    fn test_ooc_removed() {
        assert_eq!(sanitize("Sure. (OOC: brb)"), "Sure.");
        assert_eq!(sanitize("[ooc: note] Go"), "Go");
        assert_eq!(sanitize("<OOC>aside</OOC>Go"), "Go");
    }

    #[test]
    fn test_marker_removed() {
        assert_eq!(sanitize("➛ Next"), "Next");
    }

    #[test]
    fn test_status_banner_keeps_fence() {
        let body = "Story\n```\n🥨 Sex Position: none\nmood: calm\n```";
        assert_eq!(sanitize(body), "Story\n```\n```");
    }

    #[test]
    fn test_blank_lines_collapsed_and_trimmed() {
        assert_eq!(sanitize("\n\na\n\n\n\n\nb\n\n"), "a\n\nb");
    }

    #[test]
    fn test_nested_fragments_reach_fixpoint() {
        let body = "<pi<pic>x</pic>c>y</pic>z";
        let once = sanitize(body);
        assert_eq!(once, "<pic>yz");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn test_idempotent_on_overlapping_markup() {
        let fragments = [
            "<pic>",
            "</pic>",
            "<think>",
            "</think>",
            "<imageInfo>",
            "</imageinfo>",
            "```",
            "\n",
            "\n\n\n",
            "➛",
            "(OOC: x)",
            "<pic prompt=\"p\">",
            "🥨 Sex Position",
            "text",
            " ",
            "<",
            ">",
        ];
        // Deterministic combinations of up to four fragments.
        for a in &fragments {
            for b in &fragments {
                for c in &fragments {
                    for d in &fragments[..6] {
                        let input = format!("{a}{b}{c}{d}{b}{a}");
                        let once = sanitize(&input);
                        assert_eq!(sanitize(&once), once, "not idempotent for {:?}", input);
                    }
                }
            }
        }
    }

    #[test]
    fn test_apply_rule_by_name() {
        assert_eq!(apply_rule("marker", "a➛b").as_deref(), Some("ab"));
        assert_eq!(apply_rule("no_such_rule", "a"), None);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n\n "), "");
    }
}
