use crate::{
    error::{Result, StyleError},
    models::{Hairstyle, ImageRef, PreferenceField, Preferences, StyleHint},
    upstream::Catalog,
    workflow::{
        api::StyleApi,
        poll::{poll_until_complete, CancelToken, PollOutcome, PollPolicy},
        state::{GenerationOutcome, Session, Step},
    },
};

/// Drives one user through landing → upload → preferences → recommendations
/// → result. Owns its session; nothing is shared between controllers.
pub struct WorkflowController<A: StyleApi> {
    api: A,
    policy: PollPolicy,
    session: Session,
    cancel: CancelToken,
    fallback: Catalog,
}

impl<A: StyleApi> WorkflowController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            policy: PollPolicy::default(),
            session: Session::new(),
            cancel: CancelToken::new(),
            fallback: Catalog::new(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fallback(mut self, catalog: Catalog) -> Self {
        self.fallback = catalog;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn step(&self) -> Step {
        self.session.step
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Token that aborts the current or next generation wait. A cancel is
    /// consumed by the generation it ends; the handle stays attached across
    /// selections and restarts.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn expect_step(&self, allowed: &[Step], action: &str) -> Result<()> {
        if allowed.contains(&self.session.step) {
            Ok(())
        } else {
            Err(StyleError::invalid(format!(
                "cannot {} during step {}",
                action, self.session.step
            )))
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.expect_step(&[Step::Landing], "start")?;
        self.session.step = Step::Uploading;
        Ok(())
    }

    /// Store the captured photo: a storage URL, a data URI or bare base64.
    pub fn upload(&mut self, image: impl Into<String>) -> Result<()> {
        self.expect_step(&[Step::Landing, Step::Uploading], "upload")?;
        let image = image.into();
        if image.trim().is_empty() {
            return Err(StyleError::invalid("image is required"));
        }

        self.session.uploaded_image = Some(image);
        self.session.step = Step::SettingPreferences;
        Ok(())
    }

    pub fn set_preference(&mut self, field: PreferenceField, value: impl Into<String>) -> Result<()> {
        self.expect_step(&[Step::SettingPreferences], "set preferences")?;
        self.session.preferences.set(field, value);
        Ok(())
    }

    pub fn set_preferences(&mut self, preferences: Preferences) -> Result<()> {
        self.expect_step(&[Step::SettingPreferences], "set preferences")?;
        self.session.preferences = preferences;
        Ok(())
    }

    /// Ask for suggestions. An upstream failure falls back to the built-in
    /// catalog so the user can still pick something.
    pub async fn fetch_recommendations(&mut self) -> Result<&[Hairstyle]> {
        self.expect_step(
            &[Step::SettingPreferences, Step::AwaitingSelection],
            "fetch recommendations",
        )?;
        let image = self
            .session
            .uploaded_image
            .clone()
            .ok_or_else(|| StyleError::invalid("no image uploaded"))?;

        self.session.step = Step::FetchingRecommendations;
        let payload = ImageRef::normalize(&image);

        let recommendations = match self
            .api
            .request_recommendations(&payload, Some(&self.session.preferences))
            .await
        {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Recommendation request failed, using catalog: {}", e);
                self.fallback.all().to_vec()
            }
        };

        self.session.recommendations = recommendations;
        self.session.step = Step::AwaitingSelection;
        Ok(&self.session.recommendations)
    }

    /// Pick a suggestion and wait for its generated image. Always ends in
    /// `Step::Result`; the session's outcome says whether the image is real.
    /// Picking again from the result replaces the previous selection.
    pub async fn select(&mut self, hairstyle_id: &str) -> Result<&Session> {
        self.expect_step(&[Step::AwaitingSelection, Step::Result], "select a hairstyle")?;
        let hairstyle = self
            .session
            .recommendations
            .iter()
            .find(|style| style.id == hairstyle_id)
            .cloned()
            .ok_or_else(|| StyleError::invalid(format!("unknown hairstyle {}", hairstyle_id)))?;
        let image = self
            .session
            .uploaded_image
            .clone()
            .ok_or_else(|| StyleError::invalid("no image uploaded"))?;

        self.session.selected_hairstyle = Some(hairstyle.clone());
        self.session.job_id = None;
        self.session.result_image = None;
        self.session.outcome = None;
        self.session.step = Step::Generating;

        let generation = self.generate(&image, &hairstyle).await;
        self.cancel.reset();
        let fallback = self.session.fallback_image();

        log::info!(
            "Generation for {} ended: {:?}",
            hairstyle.id,
            generation.outcome
        );
        self.session.job_id = generation.job_id;
        self.session.result_image = generation.image.or(fallback);
        self.session.outcome = Some(generation.outcome);
        self.session.step = Step::Result;
        Ok(&self.session)
    }

    async fn generate(&self, image: &str, hairstyle: &Hairstyle) -> Generation {
        let payload = ImageRef::normalize(image);

        let handle = match self
            .api
            .request_generation(&payload, &hairstyle.id, Some(&StyleHint::from(hairstyle)))
            .await {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Generation request failed: {}", e);
                return Generation::fallback(None, GenerationOutcome::StartFailed {
                    reason: e.to_string(),
                });
            }
        };

        if let Some(url) = handle.immediate_result() {
            return Generation {
                job_id: handle.task_id.clone(),
                image: Some(url.to_string()),
                outcome: GenerationOutcome::Immediate,
            };
        }

        let Some(job_id) = handle.job_id() else {
            return Generation::fallback(None, GenerationOutcome::StartFailed {
                reason: "upstream returned no job handle".to_string(),
            });
        };

        let api = &self.api;
        let outcome = poll_until_complete(&self.policy, &self.cancel, move || {
            api.poll_job_status(job_id)
        })
        .await;

        let job_id = Some(job_id.to_string());
        match outcome {
            PollOutcome::Completed { status, attempts } => match status.result_image() {
                Some(url) => Generation {
                    job_id,
                    image: Some(url.to_string()),
                    outcome: GenerationOutcome::Completed { attempts },
                },
                None => {
                    log::warn!("Job completed without an image");
                    Generation::fallback(
                        job_id,
                        GenerationOutcome::CompletedWithoutImage { attempts },
                    )
                }
            },
            PollOutcome::Failed { status, .. } => Generation::fallback(
                job_id,
                GenerationOutcome::Failed {
                    reason: status
                        .error
                        .unwrap_or_else(|| "generation job failed".to_string()),
                },
            ),
            PollOutcome::TimedOut { attempts, .. } => {
                Generation::fallback(job_id, GenerationOutcome::TimedOut { attempts })
            }
            PollOutcome::Cancelled { attempts } => {
                Generation::fallback(job_id, GenerationOutcome::Cancelled { attempts })
            }
        }
    }

    /// Back to landing with an empty session.
    pub fn restart(&mut self) {
        self.cancel.reset();
        self.session.reset();
    }
}

struct Generation {
    job_id: Option<String>,
    image: Option<String>,
    outcome: GenerationOutcome,
}

impl Generation {
    fn fallback(job_id: Option<String>, outcome: GenerationOutcome) -> Self {
        Self {
            job_id,
            image: None,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobHandle, JobState, JobStatus};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted answers for each call.
    #[derive(Default)]
    struct ScriptedApi {
        recommendations: Mutex<Option<Result<Vec<Hairstyle>>>>,
        generation: Mutex<Option<Result<JobHandle>>>,
        polls: Mutex<VecDeque<Result<JobStatus>>>,
        seen_images: Mutex<Vec<String>>,
        seen_hints: Mutex<Vec<Option<StyleHint>>>,
        poll_count: Mutex<u32>,
    }

    impl ScriptedApi {
        fn with_styles() -> Self {
            let api = Self::default();
            *api.recommendations.lock().unwrap() = Some(Ok(vec![
                Hairstyle::new("a", "Pixie", "", "", "https://x/pixie.jpg"),
                Hairstyle::new("b", "Lob", "", "", "https://x/lob.jpg"),
            ]));
            api
        }

        fn generation(self, result: Result<JobHandle>) -> Self {
            *self.generation.lock().unwrap() = Some(result);
            self
        }

        fn polls(self, polls: Vec<Result<JobStatus>>) -> Self {
            *self.polls.lock().unwrap() = polls.into();
            self
        }
    }

    #[async_trait]
    impl StyleApi for ScriptedApi {
        async fn request_recommendations(
            &self,
            image_ref: &str,
            _preferences: Option<&Preferences>,
        ) -> Result<Vec<Hairstyle>> {
            self.seen_images.lock().unwrap().push(image_ref.to_string());
            self.recommendations
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(StyleError::RequestError("offline".into())))
        }

        async fn request_generation(
            &self,
            image_ref: &str,
            _hairstyle_id: &str,
            hint: Option<&StyleHint>,
        ) -> Result<JobHandle> {
            self.seen_images.lock().unwrap().push(image_ref.to_string());
            self.seen_hints.lock().unwrap().push(hint.cloned());
            self.generation
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(StyleError::RequestError("offline".into())))
        }

        async fn poll_job_status(&self, job_id: &str) -> Result<JobStatus> {
            *self.poll_count.lock().unwrap() += 1;
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(JobStatus::new(job_id, JobState::Processing)))
        }
    }

    async fn at_selection(api: ScriptedApi) -> WorkflowController<ScriptedApi> {
        let mut controller = WorkflowController::new(api);
        controller.start().unwrap();
        controller.upload("Zm9v").unwrap();
        controller
            .set_preference(PreferenceField::Length, "short")
            .unwrap();
        controller.fetch_recommendations().await.unwrap();
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_on_thirtieth_poll() {
        let mut polls: Vec<Result<JobStatus>> = (0..29)
            .map(|_| Ok(JobStatus::new("job", JobState::Processing)))
            .collect();
        polls.push(Ok(JobStatus::new("job", JobState::Completed).with_result("X")));
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::pending("job")))
            .polls(polls);

        let mut controller = at_selection(api).await;
        let session = controller.select("a").await.unwrap();

        assert_eq!(session.step, Step::Result);
        assert_eq!(session.result_image.as_deref(), Some("X"));
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Completed { attempts: 30 })
        );
        assert_eq!(*controller.api().poll_count.lock().unwrap(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_completes_uses_preview() {
        let api = ScriptedApi::with_styles().generation(Ok(JobHandle::pending("job")));
        let mut controller = at_selection(api).await;
        let session = controller.select("b").await.unwrap();

        assert_eq!(session.step, Step::Result);
        assert_eq!(session.result_image.as_deref(), Some("https://x/lob.jpg"));
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::TimedOut { attempts: 30 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_are_ignored() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::pending("job")))
            .polls(vec![
                Err(StyleError::upstream(502, "bad gateway")),
                Err(StyleError::RequestError("reset".into())),
                Ok(JobStatus::new("job", JobState::Completed).with_result("https://x/done.png")),
            ]);
        let mut controller = at_selection(api).await;
        let session = controller.select("a").await.unwrap();

        assert_eq!(session.result_image.as_deref(), Some("https://x/done.png"));
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Completed { attempts: 3 })
        );
    }

    #[tokio::test]
    async fn test_immediate_result_skips_polling() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::finished(Some("job".into()), "https://x/now.png")));
        let mut controller = at_selection(api).await;
        let session = controller.select("a").await.unwrap();

        assert_eq!(session.result_image.as_deref(), Some("https://x/now.png"));
        assert_eq!(session.outcome, Some(GenerationOutcome::Immediate));
        assert_eq!(*controller.api().poll_count.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_failure_degrades_to_preview() {
        let api = ScriptedApi::with_styles();
        let mut controller = at_selection(api).await;
        let session = controller.select("a").await.unwrap();

        assert_eq!(session.step, Step::Result);
        assert_eq!(session.result_image.as_deref(), Some("https://x/pixie.jpg"));
        assert!(matches!(
            session.outcome,
            Some(GenerationOutcome::StartFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_degrades() {
        let mut failed = JobStatus::new("job", JobState::Failed);
        failed.error = Some("model crashed".into());
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::pending("job")))
            .polls(vec![Ok(failed)]);
        let mut controller = at_selection(api).await;
        let session = controller.select("a").await.unwrap();

        assert_eq!(session.result_image.as_deref(), Some("https://x/pixie.jpg"));
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Failed {
                reason: "model crashed".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_handle_aborts_wait() {
        let api = ScriptedApi::with_styles().generation(Ok(JobHandle::pending("job")));
        let mut controller = at_selection(api).await;
        let cancel = controller.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
            cancel.cancel();
        });

        let session = controller.select("a").await.unwrap();
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Cancelled { attempts: 3 })
        );
        assert_eq!(session.result_image.as_deref(), Some("https://x/pixie.jpg"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_select_is_honoured() {
        let api = ScriptedApi::with_styles().generation(Ok(JobHandle::pending("job")));
        let mut controller = at_selection(api).await;
        let cancel = controller.cancel_handle();
        cancel.cancel();

        let session = controller.select("a").await.unwrap();
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Cancelled { attempts: 0 })
        );
        assert!(!cancel.is_cancelled());

        // The same handle still reaches the next generation.
        *controller.api().generation.lock().unwrap() = Some(Ok(JobHandle::pending("job")));
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
            trigger.cancel();
        });
        let session = controller.select("b").await.unwrap();
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Cancelled { attempts: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_survives_restart() {
        let api = ScriptedApi::with_styles().generation(Ok(JobHandle::pending("job")));
        let mut controller = WorkflowController::new(api);
        let cancel = controller.cancel_handle();
        controller.restart();

        controller.start().unwrap();
        controller.upload("Zm9v").unwrap();
        controller.fetch_recommendations().await.unwrap();
        cancel.cancel();
        let session = controller.select("a").await.unwrap();
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::Cancelled { attempts: 0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_image_is_not_generated() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::pending("job")))
            .polls(vec![Ok(JobStatus::new("job", JobState::Completed))]);
        let mut controller = at_selection(api).await;
        let session = controller.select("a").await.unwrap();

        assert_eq!(session.result_image.as_deref(), Some("https://x/pixie.jpg"));
        assert_eq!(
            session.outcome,
            Some(GenerationOutcome::CompletedWithoutImage { attempts: 1 })
        );
        assert!(!session.outcome.as_ref().unwrap().is_generated());
    }

    #[tokio::test]
    async fn test_selected_style_is_sent_with_generation() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::finished(None, "https://x/now.png")));
        let mut controller = at_selection(api).await;
        controller.select("b").await.unwrap();

        let hints = controller.api().seen_hints.lock().unwrap().clone();
        assert_eq!(
            hints,
            vec![Some(StyleHint::new("Lob").with_reference("https://x/lob.jpg"))]
        );
    }

    #[tokio::test]
    async fn test_recommendation_failure_falls_back_to_catalog() {
        let mut controller = WorkflowController::new(ScriptedApi::default());
        controller.start().unwrap();
        controller.upload("https://x/me.jpg").unwrap();
        let list = controller.fetch_recommendations().await.unwrap();
        assert_eq!(list.len(), Catalog::new().all().len());
        assert_eq!(controller.step(), Step::AwaitingSelection);
    }

    #[tokio::test]
    async fn test_images_are_normalized_at_call_sites() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::finished(None, "https://x/now.png")));
        let mut controller = at_selection(api).await;
        controller.select("a").await.unwrap();

        let seen = controller.api().seen_images.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "data:image/jpeg;base64,Zm9v".to_string(),
                "data:image/jpeg;base64,Zm9v".to_string()
            ]
        );
        assert_eq!(controller.session().uploaded_image.as_deref(), Some("Zm9v"));
    }

    #[tokio::test]
    async fn test_reselect_replaces_previous() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::finished(None, "https://x/first.png")));
        let mut controller = at_selection(api).await;
        controller.select("a").await.unwrap();

        *controller.api().generation.lock().unwrap() =
            Some(Ok(JobHandle::finished(None, "https://x/second.png")));
        let session = controller.select("b").await.unwrap();
        assert_eq!(
            session.selected_hairstyle.as_ref().map(|s| s.id.as_str()),
            Some("b")
        );
        assert_eq!(session.result_image.as_deref(), Some("https://x/second.png"));
    }

    #[tokio::test]
    async fn test_restart_resets_session() {
        let api = ScriptedApi::with_styles()
            .generation(Ok(JobHandle::finished(None, "https://x/now.png")));
        let mut controller = at_selection(api).await;
        controller.select("a").await.unwrap();
        assert_eq!(controller.step(), Step::Result);

        controller.restart();
        let session = controller.session();
        assert_eq!(session.step, Step::Landing);
        assert_eq!(session.uploaded_image, None);
        assert_eq!(session.selected_hairstyle, None);
        assert!(session.recommendations.is_empty());
        assert_eq!(session.preferences, Preferences::default());
        assert_eq!(session.result_image, None);
    }

    #[tokio::test]
    async fn test_step_guards() {
        let mut controller = WorkflowController::new(ScriptedApi::with_styles());
        assert!(controller.select("a").await.is_err());
        assert!(controller
            .set_preference(PreferenceField::Color, "red")
            .is_err());
        controller.start().unwrap();
        assert!(controller.start().is_err());
        assert!(controller.upload("  ").is_err());
        assert_eq!(controller.step(), Step::Uploading);

        let mut controller = at_selection(ScriptedApi::with_styles()).await;
        assert!(matches!(
            controller.select("zzz").await,
            Err(StyleError::InvalidInput(_))
        ));
        assert_eq!(controller.step(), Step::AwaitingSelection);
    }
}
