//! 知识点代码

/// 知识点代码分隔符
pub const CODE_SEPARATOR: char = '-';

/// 归一化知识点代码
///
/// 去除首尾空白，并把全角/长破折号及下划线统一为 `-`。
pub fn normalize_code(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '－' | '—' | '–' | '_' => CODE_SEPARATOR,
            other => other,
        })
        .collect()
}

/// 拼接子节点代码
///
/// 子节点代码已经以父路径开头时（模板里写的是完整代码），直接使用子节点代码。
pub fn join_code(parent: Option<&str>, child: &str) -> String {
    let child = normalize_code(child);
    match parent {
        None => child,
        Some(parent) => {
            let prefix = format!("{parent}{CODE_SEPARATOR}");
            if child.starts_with(&prefix) {
                child
            } else {
                format!("{prefix}{child}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_whitespace() {
        assert_eq!(normalize_code("  A－B_C "), "A-B-C");
        assert_eq!(normalize_code("A—B–C"), "A-B-C");
    }

    #[test]
    fn join_accepts_segment_or_full_path() {
        assert_eq!(join_code(None, "A"), "A");
        assert_eq!(join_code(Some("A"), "B"), "A-B");
        assert_eq!(join_code(Some("A-B"), "A-B-C"), "A-B-C");
        assert_eq!(join_code(Some("A-B"), "C"), "A-B-C");
    }
}
