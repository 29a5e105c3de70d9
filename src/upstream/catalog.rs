use crate::{
    error::Result,
    models::{
        Hairstyle, ImageRef, JobHandle, JobState, JobStatus, Preferences, StyleHint,
        SuggestionList,
    },
    upstream::{GenerationService, RecommendationService},
};
use async_trait::async_trait;
use uuid::Uuid;

/// Built-in hairstyle catalog.
///
/// Stands in for both upstreams when none is configured: recommendations are
/// the fixed list, generation completes at once and echoes the original photo.
#[derive(Debug, Clone)]
pub struct Catalog {
    styles: Vec<Hairstyle>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        let styles = vec![
            Hairstyle::new(
                "1",
                "French Waves",
                "Elegant French-style waves, flattering on round and oval faces",
                "Softens the jawline and adds a gentle look",
                "https://images.unsplash.com/photo-1562322140-8baeececf3df?w=400&h=500&fit=crop",
            ),
            Hairstyle::new(
                "2",
                "Korean Short Cut",
                "A neat Korean short cut for square and diamond faces",
                "Brings out the facial features with a modern edge",
                "https://images.unsplash.com/photo-1595624794900-abd1d09c7083?w=400&h=500&fit=crop",
            ),
            Hairstyle::new(
                "3",
                "Airy Bangs with Long Hair",
                "Light see-through bangs over long hair, suits any face shape",
                "Looks younger and fresher",
                "https://images.unsplash.com/photo-1522139137660-38fb1c5a3d3a?w=400&h=500&fit=crop",
            ),
            Hairstyle::new(
                "4",
                "Top Bun",
                "A playful bun for round and long faces",
                "Lengthens the face and keeps things tidy",
                "https://images.unsplash.com/photo-1616683693504-3ea7e9ad6fec?w=400&h=500&fit=crop",
            ),
            Hairstyle::new(
                "5",
                "Natural Middle Part",
                "Long hair with a natural middle part",
                "Polished enough for the office",
                "https://images.unsplash.com/photo-1492106087820-71f1a00d2b11?w=400&h=500&fit=crop",
            ),
            Hairstyle::new(
                "6",
                "Fashion Highlights",
                "Bold highlights for people who like to stand out",
                "On trend and shows a distinct personal style",
                "https://images.unsplash.com/photo-1605497788044-5a32c7078486?w=400&h=500&fit=crop",
            ),
        ];
        Self { styles }
    }

    pub fn with_styles(styles: Vec<Hairstyle>) -> Self {
        Self { styles }
    }

    pub fn all(&self) -> &[Hairstyle] {
        &self.styles
    }

    pub fn find(&self, id: &str) -> Option<&Hairstyle> {
        self.styles.iter().find(|style| style.id == id)
    }
}

#[async_trait]
impl RecommendationService for Catalog {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn recommend(
        &self,
        _image: &ImageRef,
        _preferences: Option<&Preferences>,
    ) -> Result<SuggestionList> {
        Ok(SuggestionList {
            recommendations: self.styles.clone(),
            message: Some("Catalog recommendations (no recommendation upstream configured)".into()),
        })
    }
}

#[async_trait]
impl GenerationService for Catalog {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn start(
        &self,
        image: &ImageRef,
        _hairstyle_id: &str,
        _hint: Option<&StyleHint>,
    ) -> Result<JobHandle> {
        let mut handle = JobHandle::finished(
            Some(format!("catalog-{}", Uuid::new_v4())),
            image.as_str(),
        );
        handle.message = Some("Catalog result (no generation upstream configured)".into());
        Ok(handle)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let mut status = JobStatus::new(job_id, JobState::Completed);
        status.progress = Some(100);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recommend_returns_all_six() {
        let catalog = Catalog::new();
        let list = catalog
            .recommend(&ImageRef::new("https://x/face.jpg"), None)
            .await
            .unwrap();
        assert_eq!(list.recommendations.len(), 6);
        assert!(list.recommendations.iter().all(|s| !s.image.is_empty()));
    }

    #[tokio::test]
    async fn test_generation_echoes_original() {
        let catalog = Catalog::new();
        let handle = catalog
            .start(&ImageRef::new("Zm9v"), "3", None)
            .await
            .unwrap();
        assert_eq!(handle.immediate_result(), Some("data:image/jpeg;base64,Zm9v"));
        assert!(handle.job_id().unwrap().starts_with("catalog-"));

        let status = catalog.status("catalog-1").await.unwrap();
        assert!(status.status.is_completed());
    }

    #[test]
    fn test_find() {
        let catalog = Catalog::new();
        assert_eq!(catalog.find("4").map(|s| s.name.as_str()), Some("Top Bun"));
        assert!(catalog.find("99").is_none());
    }
}
