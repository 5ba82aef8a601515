/// Render the fixed instruction template around the submitted source.
/// Deterministic; the input is embedded verbatim, fences and all.
pub fn format_prompt(code: &str) -> String {
    format!(
        r#"Generate Python unit tests for the following code using pytest. Include assertions to verify the code's behavior. Make the tests comprehensive but practical. Here's the code to test:

```python
{code}
```

Requirements:
1. Use pytest fixtures where appropriate
2. Include docstrings explaining each test's purpose
3. Use descriptive test names
4. Test both valid and invalid inputs
5. Add type hints to test functions
6. Include necessary imports

Return ONLY the test code, no explanations."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_source_verbatim_in_a_fence() {
        let code = "def f():\n    return 1";
        let prompt = format_prompt(code);
        assert!(prompt.contains("```python\ndef f():\n    return 1\n```"));
    }

    #[test]
    fn lists_all_six_requirements() {
        let prompt = format_prompt("x = 1");
        for line in [
            "1. Use pytest fixtures where appropriate",
            "2. Include docstrings explaining each test's purpose",
            "3. Use descriptive test names",
            "4. Test both valid and invalid inputs",
            "5. Add type hints to test functions",
            "6. Include necessary imports",
        ] {
            assert!(prompt.contains(line), "missing requirement line: {}", line);
        }
        assert!(prompt.ends_with("Return ONLY the test code, no explanations."));
    }

    #[test]
    fn output_is_reproducible() {
        assert_eq!(format_prompt("def f(): pass"), format_prompt("def f(): pass"));
    }
}
