use regex::RegexBuilder;

/// A contiguous run of translated text, either plain or carrying one of the
/// idioms reported by the gateway. Concatenating the `text()` of every
/// segment reproduces the input exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightSegment {
    Plain(String),
    Idiom {
        /// The matched substring, original casing preserved.
        text: String,
        /// The idiom from the gateway list this match corresponds to.
        source: String,
    },
}

impl HighlightSegment {
    pub fn text(&self) -> &str {
        match self {
            HighlightSegment::Plain(text) => text,
            HighlightSegment::Idiom { text, .. } => text,
        }
    }

    pub fn is_idiom(&self) -> bool {
        matches!(self, HighlightSegment::Idiom { .. })
    }
}

/// Splits `text` into plain and idiom segments.
///
/// Idioms are matched case-insensitively and literally (pattern-special
/// characters escaped), left to right, non-overlapping. When several idioms
/// could match at the same position, the one listed first wins. Idioms that
/// never occur in `text` simply produce no segment; a list reported by the
/// model is untrusted and may not match at all.
pub fn highlight(text: &str, idioms: &[String]) -> Vec<HighlightSegment> {
    if text.is_empty() {
        return Vec::new();
    }
    let patterns: Vec<&str> = idioms
        .iter()
        .map(String::as_str)
        .filter(|idiom| !idiom.trim().is_empty())
        .collect();
    if patterns.is_empty() {
        return vec![HighlightSegment::Plain(text.to_string())];
    }

    let alternation = patterns
        .iter()
        .map(|idiom| regex::escape(idiom))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(matcher) = RegexBuilder::new(&alternation).case_insensitive(true).build() else {
        return vec![HighlightSegment::Plain(text.to_string())];
    };

    let mut segments = Vec::new();
    let mut last_end = 0;
    for found in matcher.find_iter(text) {
        if found.start() > last_end {
            segments.push(HighlightSegment::Plain(
                text[last_end..found.start()].to_string(),
            ));
        }
        let matched = found.as_str();
        let source = patterns
            .iter()
            .find(|idiom| idiom.to_lowercase() == matched.to_lowercase())
            .copied()
            .unwrap_or(patterns[0]);
        segments.push(HighlightSegment::Idiom {
            text: matched.to_string(),
            source: source.to_string(),
        });
        last_end = found.end();
    }

    if segments.is_empty() {
        return vec![HighlightSegment::Plain(text.to_string())];
    }
    if last_end < text.len() {
        segments.push(HighlightSegment::Plain(text[last_end..].to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idioms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn rejoin(segments: &[HighlightSegment]) -> String {
        segments.iter().map(HighlightSegment::text).collect()
    }

    #[test]
    fn concatenation_reproduces_input() {
        let cases = [
            ("Break a leg before the show", vec!["break a leg"]),
            ("it rains cats and dogs, cats and dogs", vec!["cats and dogs"]),
            ("no idioms here at all", vec!["spill the beans"]),
            ("ünïcode piece of cake text", vec!["piece of cake"]),
        ];
        for (text, list) in cases {
            let segments = highlight(text, &idioms(&list));
            assert_eq!(rejoin(&segments), text);
        }
    }

    #[test]
    fn empty_idiom_list_yields_single_plain_segment() {
        let segments = highlight("hello world", &[]);
        assert_eq!(
            segments,
            vec![HighlightSegment::Plain("hello world".to_string())]
        );
    }

    #[test]
    fn empty_text_yields_empty_sequence() {
        assert!(highlight("", &idioms(&["break a leg"])).is_empty());
        assert!(highlight("", &[]).is_empty());
    }

    #[test]
    fn case_insensitive_match_preserves_original_casing() {
        let segments = highlight("Break a leg before the show", &idioms(&["break a leg"]));
        assert_eq!(
            segments,
            vec![
                HighlightSegment::Idiom {
                    text: "Break a leg".to_string(),
                    source: "break a leg".to_string(),
                },
                HighlightSegment::Plain(" before the show".to_string()),
            ]
        );
    }

    #[test]
    fn pattern_special_characters_match_literally() {
        let text = "that can cost an arm and a leg (ouch) these days";
        let segments = highlight(text, &idioms(&["cost an arm and a leg (ouch)"]));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].text(), "cost an arm and a leg (ouch)");
        assert!(segments[1].is_idiom());
        assert_eq!(rejoin(&segments), text);
    }

    #[test]
    fn unmatched_idioms_produce_no_highlight() {
        let segments = highlight("plain translation", &idioms(&["under the weather"]));
        assert_eq!(
            segments,
            vec![HighlightSegment::Plain("plain translation".to_string())]
        );
    }

    #[test]
    fn earliest_listed_idiom_wins_at_same_position() {
        let segments = highlight(
            "break a leg day",
            &idioms(&["break a leg", "break a leg day"]),
        );
        assert_eq!(
            segments[0],
            HighlightSegment::Idiom {
                text: "break a leg".to_string(),
                source: "break a leg".to_string(),
            }
        );
        assert_eq!(segments[1], HighlightSegment::Plain(" day".to_string()));
    }

    #[test]
    fn contained_idiom_is_not_highlighted_separately() {
        let segments = highlight(
            "she let the cat out of the bag today",
            &idioms(&["let the cat out of the bag", "the cat"]),
        );
        let highlighted: Vec<_> = segments.iter().filter(|s| s.is_idiom()).collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].text(), "let the cat out of the bag");
    }

    #[test]
    fn blank_idioms_are_ignored() {
        let segments = highlight("some text", &idioms(&["", "   "]));
        assert_eq!(
            segments,
            vec![HighlightSegment::Plain("some text".to_string())]
        );
    }

    #[test]
    fn duplicate_idioms_highlight_each_occurrence_once() {
        let text = "piece of cake, piece of cake";
        let segments = highlight(text, &idioms(&["piece of cake", "piece of cake"]));
        let highlighted = segments.iter().filter(|s| s.is_idiom()).count();
        assert_eq!(highlighted, 2);
        assert_eq!(rejoin(&segments), text);
    }
}
