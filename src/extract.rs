/// Pull the test code out of a raw model response, handling both markdown
/// and plain formats. Always returns something; with no fences the whole
/// response is returned trimmed.
pub fn extract_test_code(ai_response: &str) -> String {
    if ai_response.contains("```") {
        let parts: Vec<&str> = ai_response.split("```").collect();
        for (i, part) in parts.iter().enumerate() {
            if let Some(tagged) = part.strip_prefix("python") {
                return tagged.trim().to_string();
            } else if i % 2 == 1 {
                // A fenced block without a language tag.
                return part.trim().to_string();
            }
        }
    }
    ai_response.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_block_returns_inner_text() {
        let response = "Here are your tests:\n```python\ndef test_f():\n    assert f() == 1\n```\nLet me know!";
        assert_eq!(extract_test_code(response), "def test_f():\n    assert f() == 1");
    }

    #[test]
    fn untagged_block_returns_first_fenced_part() {
        let response = "Sure:\n```\nimport pytest\n```";
        assert_eq!(extract_test_code(response), "import pytest");
    }

    #[test]
    fn no_fences_returns_whole_text_trimmed() {
        assert_eq!(extract_test_code("  def test_f(): pass  \n"), "def test_f(): pass");
    }

    #[test]
    fn empty_input_returns_empty_string() {
        assert_eq!(extract_test_code(""), "");
    }

    #[test]
    fn multiple_blocks_only_first_is_kept() {
        let response = "```python\nfirst = 1\n```\nand also\n```python\nsecond = 2\n```";
        assert_eq!(extract_test_code(response), "first = 1");
    }

    #[test]
    fn unclosed_fence_still_returns_block() {
        let response = "```python\ndef test_f(): pass";
        assert_eq!(extract_test_code(response), "def test_f(): pass");
    }
}
