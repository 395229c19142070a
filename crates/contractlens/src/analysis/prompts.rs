use serde::{Deserialize, Serialize};

/// The fixed analysis stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStage {
    Summary,
    Risks,
    Terms,
}

impl AnalysisStage {
    pub const ALL: [AnalysisStage; 3] = [Self::Summary, Self::Risks, Self::Terms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Risks => "risks",
            Self::Terms => "terms",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Summary => "Analyze this contract and extract key information.",
            Self::Risks => "Identify risks in this contract.",
            Self::Terms => "Extract key contract terms.",
        }
    }

    fn example_shape(&self) -> &'static str {
        match self {
            Self::Summary => SUMMARY_SHAPE,
            Self::Risks => RISKS_SHAPE,
            Self::Terms => TERMS_SHAPE,
        }
    }

    /// Builds the stage prompt around already-truncated contract text.
    pub fn prompt(&self, contract_text: &str) -> String {
        format!(
            "{instruction} Return ONLY valid JSON:\n\n{text}\n\n{shape}\n",
            instruction = self.instruction(),
            text = contract_text,
            shape = self.example_shape(),
        )
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SUMMARY_SHAPE: &str = r#"{
    "contract_type": "type of contract",
    "parties": ["Party 1", "Party 2"],
    "contract_value": "amount or Not specified",
    "purpose": "main purpose",
    "key_dates": ["date 1", "date 2"],
    "payment_terms": "payment info",
    "main_points": ["point 1", "point 2", "point 3"]
}"#;

const RISKS_SHAPE: &str = r#"{
    "overall_risk_level": "High/Medium/Low",
    "key_risks": ["risk 1", "risk 2", "risk 3"],
    "concerns": ["concern 1", "concern 2"],
    "recommendations": ["recommendation 1", "recommendation 2"]
}"#;

const TERMS_SHAPE: &str = r#"{
    "payment_terms": "payment details",
    "deadlines": ["deadline 1", "deadline 2"],
    "penalties": ["penalty 1", "penalty 2"],
    "obligations": ["obligation 1", "obligation 2"],
    "termination": "termination conditions"
}"#;

/// Prompt for answering a user question from stored analysis data.
pub fn question_prompt(question: &str, analysis_json: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "Answer this question about a contract using the analysis data provided.\n\n\
         Question: {question}\n\n\
         Contract Analysis Data:\n{analysis_json}\n\n"
    );

    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("Additional Context:\n{context}\n\n"));
    }

    prompt.push_str("Provide a direct, helpful answer based on the analysis data.\n");
    prompt
}
