//! Mock repository implementation for testing
//!
//! Lets the pipeline and the HTTP layer be tested without a database.

use crate::VideoRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tubely_core::models::Video;
use tubely_core::AppError;
use uuid::Uuid;

/// In-memory video repository
#[derive(Clone, Default)]
pub struct MockVideoRepository {
    videos: Arc<Mutex<HashMap<Uuid, Video>>>,
    fail_updates: Arc<AtomicBool>,
}

impl MockVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record owned by `user_id` and return it.
    pub fn create_video(&self, user_id: Uuid, title: &str) -> Video {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: title.to_string(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            user_id,
        };
        self.videos
            .lock()
            .unwrap()
            .insert(video.id, video.clone());
        video
    }

    pub fn video(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }

    /// Make every subsequent `update_video` call fail.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoRepository for MockVideoRepository {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.video(id))
    }

    async fn update_video(&self, video: &Video) -> Result<(), AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("update rejected".to_string()));
        }
        let mut videos = self.videos.lock().unwrap();
        match videos.get_mut(&video.id) {
            Some(existing) => {
                *existing = video.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Video {} not found", video.id))),
        }
    }
}
