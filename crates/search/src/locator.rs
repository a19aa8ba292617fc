use crate::profile::ScoringProfile;
use findcode_protocol::ElementDescriptor;

/// Which strategy located the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Id,
    Class,
    TagAndText,
    Tag,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id attribute",
            Self::Class => "class attribute",
            Self::TagAndText => "tag and text",
            Self::Tag => "tag",
        }
    }
}

/// 0-based line and column. The column counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub strategy: Strategy,
}

type StrategyFn = fn(&[&str], &ElementDescriptor, &ScoringProfile) -> Option<(usize, usize)>;

const STRATEGIES: &[(Strategy, StrategyFn)] = &[
    (Strategy::Id, by_id),
    (Strategy::Class, by_class),
    (Strategy::TagAndText, by_tag_and_text),
    (Strategy::Tag, by_tag),
];

/// Split on `\n`, dropping the `\r` of CRLF endings.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Run the strategies in priority order and return the first hit. Every
/// strategy scans top to bottom and stops at its first matching line.
pub fn locate(text: &str, descriptor: &ElementDescriptor, profile: &ScoringProfile) -> Option<Position> {
    let lines = split_lines(text);
    STRATEGIES.iter().find_map(|(strategy, run)| {
        run(&lines, descriptor, profile).map(|(line, column)| Position {
            line,
            column,
            strategy: *strategy,
        })
    })
}

fn by_id(lines: &[&str], descriptor: &ElementDescriptor, _: &ScoringProfile) -> Option<(usize, usize)> {
    let id = descriptor.id.as_deref()?;
    first_attribute_match(lines, "id", id)
}

fn by_class(
    lines: &[&str],
    descriptor: &ElementDescriptor,
    _: &ScoringProfile,
) -> Option<(usize, usize)> {
    descriptor
        .class_tokens()
        .find_map(|token| first_attribute_match(lines, "class", token))
}

fn by_tag_and_text(
    lines: &[&str],
    descriptor: &ElementDescriptor,
    profile: &ScoringProfile,
) -> Option<(usize, usize)> {
    let needle = descriptor.tag_needle()?;
    let prefix: String = descriptor
        .trimmed_text()
        .chars()
        .take(profile.text_prefix_chars())
        .collect();
    if prefix.is_empty() {
        return None;
    }
    lines.iter().enumerate().find_map(|(index, line)| {
        if !line.contains(prefix.as_str()) {
            return None;
        }
        line.find(&needle)
            .map(|byte| (index, char_column(line, byte)))
    })
}

fn by_tag(lines: &[&str], descriptor: &ElementDescriptor, _: &ScoringProfile) -> Option<(usize, usize)> {
    let needle = descriptor.tag_needle()?;
    lines.iter().enumerate().find_map(|(index, line)| {
        line.find(&needle)
            .map(|byte| (index, char_column(line, byte)))
    })
}

/// First line carrying `name="value"` or `name='value'`; the column is where
/// the earlier of the two starts.
fn first_attribute_match(lines: &[&str], name: &str, value: &str) -> Option<(usize, usize)> {
    let double = format!("{name}=\"{value}\"");
    let single = format!("{name}='{value}'");
    lines.iter().enumerate().find_map(|(index, line)| {
        let byte = match (line.find(&double), line.find(&single)) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return None,
        };
        Some((index, char_column(line, byte)))
    })
}

fn char_column(line: &str, byte: usize) -> usize {
    line[..byte].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn locate_default(text: &str, descriptor: &ElementDescriptor) -> Option<Position> {
        locate(text, descriptor, &ScoringProfile::default())
    }

    #[test]
    fn id_wins_over_everything_else() {
        let text = "<div class=\"card\">\n  <button>Send</button>\n  <button id=\"submit-btn\">Send</button>\n";
        let descriptor = ElementDescriptor::new("button")
            .id("submit-btn")
            .class_name("card")
            .text_content("Send");

        let position = locate_default(text, &descriptor).unwrap();
        assert_eq!(
            position,
            Position {
                line: 2,
                column: 10,
                strategy: Strategy::Id
            }
        );
    }

    #[test]
    fn id_line_is_found_for_every_placement() {
        for target in 0..20 {
            let mut lines = vec!["<p>filler</p>".to_string(); 20];
            lines[target] = format!("{}<a id=\"x{target}\">", " ".repeat(target % 5));
            let text = lines.join("\n");
            let descriptor = ElementDescriptor::new("a").id(format!("x{target}"));

            let position = locate_default(&text, &descriptor).unwrap();
            assert_eq!(position.line, target);
            assert_eq!(position.column, target % 5 + 3);
        }
    }

    #[test]
    fn single_quoted_attributes_report_their_own_column() {
        let text = "<span id='greeting'>hi</span>";
        let descriptor = ElementDescriptor::new("span").id("greeting");
        let position = locate_default(text, &descriptor).unwrap();
        assert_eq!((position.line, position.column), (0, 6));
    }

    #[test]
    fn class_tokens_are_tried_in_order() {
        let text = "<li class=\"second\">\n<li class=\"first\">";
        let descriptor = ElementDescriptor::new("li").class_name("first second");
        let position = locate_default(text, &descriptor).unwrap();
        assert_eq!(position.line, 1);
        assert_eq!(position.strategy, Strategy::Class);
    }

    #[test]
    fn tag_and_text_uses_a_bounded_prefix() {
        let long_text = "x".repeat(80);
        let text = format!("<p>other</p>\n<p>{}</p>", &long_text[..50]);
        let descriptor = ElementDescriptor::new("p").text_content(&long_text);

        let position = locate_default(&text, &descriptor).unwrap();
        assert_eq!(position.line, 1);
        assert_eq!(position.strategy, Strategy::TagAndText);
    }

    #[test]
    fn tag_only_is_the_last_resort() {
        let text = "const a = 1;\r\n  return <section>\r\n";
        let descriptor = ElementDescriptor::new("section").text_content("missing");
        let position = locate_default(text, &descriptor).unwrap();
        assert_eq!(
            position,
            Position {
                line: 1,
                column: 9,
                strategy: Strategy::Tag
            }
        );
    }

    #[test]
    fn columns_count_characters() {
        let text = "<p>héllo</p> <b id=\"k\">";
        let descriptor = ElementDescriptor::new("b").id("k");
        let position = locate_default(text, &descriptor).unwrap();
        assert_eq!(position.column, 16);
    }

    #[test]
    fn nothing_matches() {
        let descriptor = ElementDescriptor::new("div");
        assert_eq!(locate_default("<span></span>", &descriptor), None);
        assert_eq!(locate_default("", &ElementDescriptor::new("")), None);
    }
}
