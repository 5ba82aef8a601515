use crate::config::Config;
use crate::extract::extract_test_code;
use crate::hf::{HfClient, Message};
use crate::prompt::format_prompt;
use crate::python;

const SYSTEM_PROMPT: &str =
    "You are a Python testing expert. Generate comprehensive pytest unit tests.";
const TEMPERATURE: f32 = 0.7;

/// Outcome of one AI generation call: generated source, or an error string.
#[derive(Debug, Clone)]
pub struct TestGenerationResult {
    pub test_code: String,
    pub error: Option<String>,
}

pub struct AiTestGenerator {
    client: HfClient,
    model: String,
}

impl AiTestGenerator {
    pub fn new(config: &Config) -> Self {
        AiTestGenerator {
            client: HfClient::new(&config.hf_base_url, &config.hf_token),
            model: config.model.clone(),
        }
    }

    /// Generate pytest tests for `code`. Every failure along the way is
    /// folded into a result with empty text and a prefixed error string.
    pub async fn generate_tests(&self, code: &str) -> TestGenerationResult {
        match self.try_generate(code).await {
            Ok(test_code) => TestGenerationResult {
                test_code,
                error: None,
            },
            Err(e) => TestGenerationResult {
                test_code: String::new(),
                error: Some(format!("Error generating tests: {}", e)),
            },
        }
    }

    async fn try_generate(&self, code: &str) -> Result<String, String> {
        python::check_syntax(code)?;

        let messages = vec![
            Message {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: format_prompt(code),
            },
        ];

        let raw_response = self.client.chat(messages, &self.model, TEMPERATURE).await?;
        let test_code = extract_test_code(&raw_response);

        if test_code.trim().is_empty() {
            return Err("Model returned no code".to_string());
        }
        python::check_syntax(&test_code)
            .map_err(|e| format!("Generated tests are invalid: {}", e))?;

        Ok(test_code)
    }
}
