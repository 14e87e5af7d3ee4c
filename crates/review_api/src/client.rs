use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{Map, Value};

use crate::config::ReviewApiConfig;
use crate::error::{parse_error_message, ReviewApiError};
use crate::types::RetrievalResult;

#[derive(Debug)]
pub struct ReviewApiClient {
    http: Client,
    config: ReviewApiConfig,
}

impl ReviewApiClient {
    pub fn new(config: ReviewApiConfig) -> Result<Self, ReviewApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ReviewApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ReviewApiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// GET `/questions` — evaluation questions generated from the prompt.
    pub async fn generate_questions(&self, prompt: &str) -> Result<Vec<String>, ReviewApiError> {
        let response = self
            .http
            .get(self.endpoint("questions"))
            .query(&[("prompt", prompt)])
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// GET `/answer_questions` — batch answers for the question list.
    ///
    /// The backend replies with a JSON object keyed by question text. Key
    /// order is not contractual, and the backend truncates each key at the
    /// first `?`, so answers are matched back onto the submitted questions
    /// and returned in submission order. Unmatched entries are appended.
    pub async fn answer_questions(
        &self,
        questions: &[String],
        prompt: &str,
        temperature: f64,
        num_sources: u32,
        model: &str,
    ) -> Result<Vec<(String, String)>, ReviewApiError> {
        let encoded = serde_json::to_string(questions)?;
        let response = self
            .http
            .get(self.endpoint("answer_questions"))
            .query(&[
                ("questions", encoded.as_str()),
                ("prompt", prompt),
                ("temperature", temperature.to_string().as_str()),
                ("num_sources", num_sources.to_string().as_str()),
                ("model", model),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut answers: Map<String, Value> = response.json().await?;
        let mut ordered = Vec::with_capacity(answers.len());
        for question in questions {
            let answer = answers
                .remove(question)
                .or_else(|| answers.remove(&canonical_question(question)));
            if let Some(answer) = answer {
                ordered.push((question.clone(), value_to_text(answer)));
            }
        }
        for (question, answer) in answers {
            ordered.push((question, value_to_text(answer)));
        }

        Ok(ordered)
    }

    /// GET `/document_qa` — passages and page numbers for augmentation.
    pub async fn document_qa(
        &self,
        prompt: &str,
        source_num: u32,
    ) -> Result<RetrievalResult, ReviewApiError> {
        let response = self
            .http
            .get(self.endpoint("document_qa"))
            .query(&[
                ("prompt", prompt),
                ("source_num", source_num.to_string().as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// POST `/add_reviewer` — ingest a reviewer PDF as a multipart upload.
    ///
    /// Only the status code is contractual: 2xx on success.
    pub async fn ingest_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ReviewApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.endpoint("add_reviewer"))
            .multipart(form)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ReviewApiError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, body = %body, "review backend request failed");
    Err(ReviewApiError::Status(
        status,
        parse_error_message(status, &body),
    ))
}

// The backend keys its answer map by the question truncated at the first
// question mark, with one appended when missing.
fn canonical_question(question: &str) -> String {
    match question.split_once('?') {
        Some((head, _)) => format!("{head}?"),
        None => format!("{question}?"),
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
