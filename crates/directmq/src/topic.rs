/// 主题与主题模式
///
/// 主题由 `/` 分隔的段组成，模式中 `*` 匹配单个段，`**` 匹配一个或多个段

const SEPARATOR: char = '/';
const WILDCARD: &str = "*";
const SUPER_WILDCARD: &str = "**";

fn is_allowed_topic_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '@' | '$' | '_')
}

fn is_allowed_pattern_char(c: char) -> bool {
    is_allowed_topic_char(c) || c == '*'
}

fn has_valid_layout(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with(SEPARATOR)
        && !value.ends_with(SEPARATOR)
        && !value.contains("//")
}

/// 检查主题是否合法（不允许通配符）
pub fn is_correct_topic(topic: &str) -> bool {
    has_valid_layout(topic) && topic.chars().all(is_allowed_topic_char)
}

/// 检查主题模式是否合法
pub fn is_correct_topic_pattern(pattern: &str) -> bool {
    if !has_valid_layout(pattern) || !pattern.chars().all(is_allowed_pattern_char) {
        return false;
    }

    if pattern.contains("**/**") || pattern.contains("***") {
        return false;
    }

    // 通配符不能与普通字符混在同一段中，例如 "topic*"
    pattern
        .split(SEPARATOR)
        .filter(|segment| segment.contains('*'))
        .all(|segment| segment == WILDCARD || segment == SUPER_WILDCARD)
}

fn segments(value: &str) -> Vec<&str> {
    value.split(SEPARATOR).collect()
}

fn match_segments(pattern: &[&str], topic: &[&str]) -> bool {
    match pattern.split_first() {
        None => topic.is_empty(),
        Some((&SUPER_WILDCARD, rest)) => {
            if rest.is_empty() {
                return !topic.is_empty();
            }
            (1..=topic.len()).any(|skip| match_segments(rest, &topic[skip..]))
        }
        Some((head, rest)) => match topic.split_first() {
            Some((segment, topic_rest)) if *head == WILDCARD || head == segment => {
                match_segments(rest, topic_rest)
            }
            _ => false,
        },
    }
}

/// 判断主题是否匹配模式
pub fn match_topic_pattern(pattern: &str, topic: &str) -> bool {
    match_segments(&segments(pattern), &segments(topic))
}

fn covers_segments(top: &[&str], sub: &[&str]) -> bool {
    match top.split_first() {
        None => sub.is_empty(),
        Some((&SUPER_WILDCARD, rest)) => {
            if rest.is_empty() {
                return !sub.is_empty();
            }
            (1..=sub.len()).any(|skip| covers_segments(rest, &sub[skip..]))
        }
        Some((head, rest)) => match sub.split_first() {
            // `**` 可能代表多个段，单段通配符无法覆盖
            Some((&SUPER_WILDCARD, _)) => false,
            Some((_, sub_rest)) if *head == WILDCARD => covers_segments(rest, sub_rest),
            Some((segment, sub_rest)) if head == segment => covers_segments(rest, sub_rest),
            _ => false,
        },
    }
}

/// 判断 `sub` 匹配的所有主题是否都被 `top` 匹配
pub fn is_subtopic_pattern(top: &str, sub: &str) -> bool {
    covers_segments(&segments(top), &segments(sub))
}

/// 去除被其他主题覆盖的主题，保留首次出现的顺序
pub fn deduplicate_overlapping_topics<S: AsRef<str>>(topics: &[S]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for topic in topics {
        let topic = topic.as_ref();
        if result
            .iter()
            .any(|existing| existing == topic || is_subtopic_pattern(existing, topic))
        {
            continue;
        }

        result.retain(|existing| !is_subtopic_pattern(topic, existing));
        result.push(topic.to_string());
    }

    result
}

/// 去重后的主题差异
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicsDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// 计算两组主题去重后的差异
pub fn deduplicated_overlapping_topics_diff<S: AsRef<str>, T: AsRef<str>>(
    old_topics: &[S],
    new_topics: &[T],
) -> TopicsDiff {
    let old_topics = deduplicate_overlapping_topics(old_topics);
    let new_topics = deduplicate_overlapping_topics(new_topics);

    let removed = old_topics
        .iter()
        .filter(|topic| !new_topics.contains(topic))
        .cloned()
        .collect();
    let added = new_topics
        .iter()
        .filter(|topic| !old_topics.contains(topic))
        .cloned()
        .collect();

    TopicsDiff { added, removed }
}
