//! Practice flow: identify the student, then convert and deliver answers.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::audio::AudioFormat;
use crate::convert::Converter;
use crate::error::{PipelineError, Result};
use crate::recording::Recording;
use crate::session::{IdentificationPhoto, SessionStore, StudentSession};
use crate::telegram::{format_audio_caption, format_session_caption, TelegramSender};

/// Question categories, five questions each, in lesson order
pub const CATEGORIES: [&str; 20] = [
    "Hobbies & Interests",
    "Daily Life",
    "Activities & Sports",
    "Technology & Media",
    "People & Relationships",
    "Learning & Work",
    "Places & Travel",
    "Food & Cooking",
    "Weather & Seasons",
    "Shopping & Fashion",
    "Home & Living",
    "Arts & Entertainment",
    "Nature & Environment",
    "Transportation",
    "Health & Lifestyle",
    "Celebrations & Festivals",
    "Pets & Animals",
    "Language & Communication",
    "Memory & Childhood",
    "Time Management",
];

const QUESTIONS_PER_CATEGORY: usize = 5;

/// Category for a zero-based question index
pub fn category_for_index(index: usize) -> &'static str {
    CATEGORIES
        .get(index / QUESTIONS_PER_CATEGORY)
        .copied()
        .unwrap_or("General")
}

/// The question a recording answers
#[derive(Debug, Clone)]
pub struct QuestionContext {
    pub question: String,
    /// One-based position in the practice list
    pub number: usize,
    pub category: String,
}

impl QuestionContext {
    pub fn new(question: &str, number: usize, category: Option<&str>) -> Self {
        let category = category
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| category_for_index(number.saturating_sub(1)).to_string());

        Self {
            question: question.to_string(),
            number,
            category,
        }
    }
}

/// What was delivered for a submitted recording
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub file_name: String,
    pub format: AudioFormat,
    pub size: usize,
    pub session_id: String,
}

pub struct PracticePipeline {
    converter: Arc<Converter>,
    sender: Option<Arc<TelegramSender>>,
    sessions: Arc<SessionStore>,
    module_name: String,
}

impl PracticePipeline {
    pub fn new(
        converter: Arc<Converter>,
        sender: Option<Arc<TelegramSender>>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            converter,
            sender,
            sessions,
            module_name: "Module 2 - Finding Ideas Fast".to_string(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn converter(&self) -> &Arc<Converter> {
        &self.converter
    }

    pub fn sender(&self) -> Option<&Arc<TelegramSender>> {
        self.sender.as_ref()
    }

    /// Identify the student and announce the session to the instructor.
    ///
    /// The announcement is best-effort; the session stands even if it fails.
    pub async fn start_session(&self, name: &str, photo_data_url: &str) -> Result<StudentSession> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PipelineError::InvalidInput("Please enter your name".into()));
        }
        let photo = IdentificationPhoto::from_data_url(photo_data_url)
            .map_err(|e| PipelineError::InvalidInput(format!("Identification photo: {e:#}")))?;

        let session = self.sessions.create_session(name, photo_data_url).await?;

        if let Some(sender) = &self.sender {
            let caption = format_session_caption(
                name,
                &self.module_name,
                &session.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            let file_name = format!("{}_session.{}", name, photo.extension());
            if let Err(e) = sender
                .send_photo(photo.bytes, Some(&caption), &file_name, &photo.mime_type)
                .await
            {
                error!("Failed to announce session {}: {}", session.session_id, e);
            }
        }

        Ok(session)
    }

    pub async fn end_session(&self) -> Result<()> {
        self.sessions.clear_session().await
    }

    pub async fn require_active_session(&self) -> Result<StudentSession> {
        self.sessions
            .active_session()
            .await
            .ok_or(PipelineError::NoActiveSession)
    }

    /// Convert a recording and send it with a question caption.
    pub async fn submit_recording(
        &self,
        recording: &Recording,
        question: &QuestionContext,
    ) -> Result<SubmissionReceipt> {
        let session = self.require_active_session().await?;
        let sender = self
            .sender
            .as_ref()
            .ok_or(PipelineError::NotConfigured("Telegram"))?;

        let converted = self.converter.convert(recording).await;
        let caption = format_audio_caption(
            &question.question,
            question.number,
            &question.category,
            recording.duration_ms,
            Some(&session.name),
        );
        let file_name = converted.file_name(&format!("recording_q{}", question.number));
        let size = converted.payload.len();
        let format = converted.format;
        let mime_type = converted.mime_type();

        sender
            .send_audio(converted.payload, Some(&caption), &file_name, mime_type)
            .await?;

        info!(
            "Submitted answer to question {} for {} ({})",
            question.number, session.name, file_name
        );

        Ok(SubmissionReceipt {
            file_name,
            format,
            size,
            session_id: session.session_id,
        })
    }
}
