// src/wizard.rs
//! Per-session wizard state: selections, processing state, results and the
//! single error slot. Transitions are synchronous; the async drivers at the
//! bottom release the session lock while a remote call is in flight.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::composer::{ResolvedSelection, compose};
use crate::config::CredentialContext;
use crate::errors::{CabinetError, EMPTY_SELECTION_MESSAGE, Operation};
use crate::models::*;
use crate::services::{DesignService, ImageEncoder, image_encoder};

/// A user action that asks for a new image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Preset(ColorOption),
    OriginalFinish,
    Hardware(Hardware),
    ApplyTweak,
    ApplyCustomLook,
}

/// Everything the synthesis call needs, captured when generation starts.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    epoch: u64,
    pub image: EncodedImage,
    pub instruction: String,
}

pub struct Wizard {
    credentials: Arc<CredentialContext>,
    state: ProcessingState,
    selection: SelectionSnapshot,
    image: Option<EncodedImage>,
    analysis: Option<AnalysisResult>,
    artifact: Option<GeneratedArtifact>,
    error: Option<String>,
    // Bumped on upload and reset; results tagged with an older epoch are dropped.
    epoch: u64,
}

impl Wizard {
    pub fn new(credentials: Arc<CredentialContext>) -> Self {
        Self {
            credentials,
            state: ProcessingState::Idle,
            selection: SelectionSnapshot::default(),
            image: None,
            analysis: None,
            artifact: None,
            error: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selection(&self) -> &SelectionSnapshot {
        &self.selection
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn artifact(&self) -> Option<&GeneratedArtifact> {
        self.artifact.as_ref()
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            state: self.state,
            error: self.error.clone(),
            selection: self.selection.clone(),
            analysis: self.analysis.clone(),
            has_image: self.image.is_some(),
            artifact: self.artifact.as_ref().map(|artifact| ArtifactSummary {
                mime_type: artifact.image.mime_type.clone(),
                size: artifact.image.data.len(),
                prompt_used: artifact.prompt_used.clone(),
                created_at: artifact.created_at,
            }),
            credentials: self.credentials.status(),
        }
    }

    fn fail(&mut self, err: &CabinetError, operation: Operation) {
        // Hosted keys cannot be reselected, so only an interactive key is revoked.
        if err.is_authorization() && self.credentials.interactive_selection() {
            self.credentials.revoke();
        }
        self.error = Some(err.user_message(operation, self.credentials.interactive_selection()));
    }

    fn require_credentials(&mut self, operation: Operation) -> Result<(), CabinetError> {
        if self.credentials.has_valid_credential() {
            return Ok(());
        }
        let err = CabinetError::CredentialsRequired;
        self.fail(&err, operation);
        Err(err)
    }

    /// Starts analysing a new upload. A new upload while analysing restarts.
    pub fn begin_upload(&mut self, content_type: &str) -> Result<u64, CabinetError> {
        if self.state == ProcessingState::Generating {
            return Err(CabinetError::Busy(self.state));
        }
        if !image_encoder::is_image_content_type(content_type) {
            let err = CabinetError::InvalidInput(format!("Not an image: {}", content_type));
            self.fail(&err, Operation::Analyze);
            return Err(err);
        }
        self.require_credentials(Operation::Analyze)?;

        if self.state == ProcessingState::Analyzing {
            info!("New upload supersedes the analysis in progress");
        }
        self.selection = SelectionSnapshot::default();
        self.image = None;
        self.analysis = None;
        self.artifact = None;
        self.error = None;
        self.epoch += 1;
        self.state = ProcessingState::Analyzing;
        Ok(self.epoch)
    }

    /// Stores the encoded upload. Returns `None` when the upload was superseded.
    pub fn finish_encoding(
        &mut self,
        epoch: u64,
        result: Result<EncodedImage, CabinetError>,
    ) -> Result<Option<EncodedImage>, CabinetError> {
        if epoch != self.epoch {
            debug!("Dropping encoded image from superseded upload {}", epoch);
            return Ok(None);
        }
        match result {
            Ok(image) => {
                self.image = Some(image.clone());
                Ok(Some(image))
            }
            Err(err) => {
                warn!("Encoding upload failed: {}", err);
                self.fail(&err, Operation::Analyze);
                self.state = ProcessingState::Idle;
                Err(err)
            }
        }
    }

    pub fn finish_analysis(
        &mut self,
        epoch: u64,
        result: Result<AnalysisResult, CabinetError>,
    ) -> Result<(), CabinetError> {
        if epoch != self.epoch {
            debug!("Dropping analysis from superseded upload {}", epoch);
            return Ok(());
        }
        self.state = ProcessingState::Idle;
        match result {
            Ok(mut analysis) => {
                for color in &mut analysis.suggested_colors {
                    color.is_ai = true;
                }
                self.analysis = Some(analysis);
                self.error = None;
                Ok(())
            }
            Err(err) => {
                warn!("Analysis failed: {}", err);
                self.fail(&err, Operation::Analyze);
                Err(err)
            }
        }
    }

    /// Typing a custom color replaces any preset; clearing the text leaves a preset alone.
    pub fn edit_custom_color(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.selection.color = ColorChoice::Custom {
                text: text.to_string(),
            };
        } else if matches!(self.selection.color, ColorChoice::Custom { .. }) {
            self.selection.color = ColorChoice::Unset;
        }
    }

    pub fn select_sheen(&mut self, sheen: Sheen) {
        self.selection.sheen = sheen;
    }

    pub fn edit_tweak(&mut self, text: &str) {
        self.selection.tweak = text.to_string();
    }

    /// Validates the held selection merged with the trigger. The merge is kept
    /// and the wizard enters `Generating` only when the selection is accepted.
    pub fn begin_generation(&mut self, trigger: Trigger) -> Result<GenerationRequest, CabinetError> {
        if self.state.is_busy() {
            return Err(CabinetError::Busy(self.state));
        }
        let image = self.image.clone().ok_or(CabinetError::NoImage)?;
        self.require_credentials(Operation::Generate)?;

        let explicit_original = matches!(trigger, Trigger::OriginalFinish);
        let mut candidate = self.selection.clone();
        match trigger {
            Trigger::Preset(color) => candidate.color = ColorChoice::Preset(color),
            Trigger::OriginalFinish => candidate.color = ColorChoice::OriginalFinish,
            Trigger::Hardware(hardware) => candidate.hardware = hardware,
            Trigger::ApplyTweak | Trigger::ApplyCustomLook => {}
        }

        // A rejected trigger leaves the held selection untouched.
        let resolved = ResolvedSelection::from_snapshot(&candidate);
        if resolved.is_empty() && !explicit_original {
            let err = CabinetError::Validation(EMPTY_SELECTION_MESSAGE.to_string());
            self.fail(&err, Operation::Generate);
            self.state = ProcessingState::Idle;
            return Err(err);
        }

        let instruction = compose(&resolved);
        self.selection = candidate;
        self.error = None;
        self.state = ProcessingState::Generating;
        Ok(GenerationRequest {
            epoch: self.epoch,
            image,
            instruction,
        })
    }

    pub fn finish_generation(
        &mut self,
        request: GenerationRequest,
        result: Result<GeneratedImage, CabinetError>,
    ) -> Result<(), CabinetError> {
        if request.epoch != self.epoch {
            debug!("Dropping generation result from reset session");
            return Ok(());
        }
        match result {
            Ok(image) => {
                self.artifact = Some(GeneratedArtifact {
                    image,
                    prompt_used: request.instruction,
                    created_at: Utc::now(),
                });
                self.error = None;
                self.state = ProcessingState::Complete;
                Ok(())
            }
            Err(err) => {
                warn!("Generation failed: {}", err);
                self.fail(&err, Operation::Generate);
                self.state = ProcessingState::Idle;
                Err(err)
            }
        }
    }

    /// Start over.
    pub fn reset(&mut self) {
        self.state = ProcessingState::Idle;
        self.selection = SelectionSnapshot::default();
        self.image = None;
        self.analysis = None;
        self.artifact = None;
        self.error = None;
        self.epoch += 1;
    }
}

/// Encodes and analyses an upload without holding the lock across awaits.
pub async fn run_upload(
    wizard: &Mutex<Wizard>,
    encoder: &ImageEncoder,
    service: &dyn DesignService,
    data: Vec<u8>,
    content_type: &str,
) -> Result<(), CabinetError> {
    let epoch = wizard.lock().await.begin_upload(content_type)?;

    let encoded = encoder.encode(data, content_type).await;
    let Some(image) = wizard.lock().await.finish_encoding(epoch, encoded)? else {
        return Ok(());
    };

    let analysis = service.analyze(&image).await;
    wizard.lock().await.finish_analysis(epoch, analysis)
}

pub async fn run_generation(
    wizard: &Mutex<Wizard>,
    service: &dyn DesignService,
    trigger: Trigger,
) -> Result<(), CabinetError> {
    let request = wizard.lock().await.begin_generation(trigger)?;
    let result = service.generate(&request.image, &request.instruction).await;
    wizard.lock().await.finish_generation(request, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::popular_colors;
    use crate::errors::{
        GENERATION_FAILED_MESSAGE, HOSTED_AUTH_MESSAGE, INTERACTIVE_AUTH_MESSAGE, INVALID_IMAGE_MESSAGE,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy, PartialEq)]
    enum Outcome {
        Succeed,
        ServiceFailure,
        PermissionDenied,
    }

    struct FakeService {
        outcome: std::sync::Mutex<Outcome>,
        analyze_calls: AtomicUsize,
        generate_calls: AtomicUsize,
        instructions: std::sync::Mutex<Vec<String>>,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                outcome: std::sync::Mutex::new(Outcome::Succeed),
                analyze_calls: AtomicUsize::new(0),
                generate_calls: AtomicUsize::new(0),
                instructions: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn set_outcome(&self, outcome: Outcome) {
            *self.outcome.lock().unwrap() = outcome;
        }

        fn failure(&self) -> Option<CabinetError> {
            match *self.outcome.lock().unwrap() {
                Outcome::Succeed => None,
                Outcome::ServiceFailure => Some(CabinetError::Service("503 busy".to_string())),
                Outcome::PermissionDenied => Some(CabinetError::from_remote(403, "PERMISSION_DENIED")),
            }
        }

        fn last_instruction(&self) -> String {
            self.instructions.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl DesignService for FakeService {
        async fn analyze(&self, _image: &EncodedImage) -> Result<AnalysisResult, CabinetError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.failure() {
                return Err(err);
            }
            Ok(analysis())
        }

        async fn generate(
            &self,
            _image: &EncodedImage,
            instruction: &str,
        ) -> Result<GeneratedImage, CabinetError> {
            let call = self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.instructions.lock().unwrap().push(instruction.to_string());
            if let Some(err) = self.failure() {
                return Err(err);
            }
            Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                data: Bytes::from(format!("render-{}", call)),
            })
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            reasoning: "Cool slate floors suit muted tones.".to_string(),
            suggested_colors: popular_colors().into_iter().take(4).collect(),
        }
    }

    fn preset(name: &str) -> ColorOption {
        popular_colors()
            .into_iter()
            .find(|color| color.name == name)
            .unwrap()
    }

    fn kitchen() -> EncodedImage {
        EncodedImage {
            mime_type: "image/jpeg".to_string(),
            data: "a2l0Y2hlbg==".to_string(),
        }
    }

    fn credentials() -> Arc<CredentialContext> {
        Arc::new(CredentialContext::new(Some("key".to_string()), true))
    }

    /// A wizard that has finished analysing an upload.
    fn uploaded() -> Mutex<Wizard> {
        let mut wizard = Wizard::new(credentials());
        let epoch = wizard.begin_upload("image/jpeg").unwrap();
        wizard.finish_encoding(epoch, Ok(kitchen())).unwrap();
        wizard.finish_analysis(epoch, Ok(analysis())).unwrap();
        Mutex::new(wizard)
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_without_a_call() {
        let service = FakeService::new();
        let wizard = uploaded();

        for trigger in [Trigger::ApplyTweak, Trigger::ApplyCustomLook, Trigger::Hardware(Hardware::KeepExisting)] {
            let err = run_generation(&wizard, &service, trigger).await.unwrap_err();
            assert!(matches!(err, CabinetError::Validation(_)));
        }

        let wizard = wizard.lock().await;
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(wizard.state(), ProcessingState::Idle);
        assert_eq!(wizard.error(), Some(EMPTY_SELECTION_MESSAGE));
    }

    #[tokio::test]
    async fn original_finish_always_generates() {
        let service = FakeService::new();
        let wizard = uploaded();

        run_generation(&wizard, &service, Trigger::OriginalFinish)
            .await
            .unwrap();

        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
        let instruction = service.last_instruction();
        assert!(instruction.contains("Keep the existing cabinet color."));
        assert!(instruction.contains("Maintain existing finish details."));
        let wizard = wizard.lock().await;
        assert_eq!(wizard.state(), ProcessingState::Complete);
        assert_eq!(wizard.selection().color, ColorChoice::OriginalFinish);
    }

    #[tokio::test]
    async fn held_original_finish_does_not_bypass_guard() {
        let service = FakeService::new();
        let wizard = uploaded();
        run_generation(&wizard, &service, Trigger::OriginalFinish)
            .await
            .unwrap();

        let err = run_generation(&wizard, &service, Trigger::ApplyTweak)
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::Validation(_)));
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn preset_and_custom_text_are_exclusive() {
        let mut wizard = uploaded().into_inner();

        wizard.edit_custom_color("Hale Navy");
        wizard.begin_generation(Trigger::Preset(preset("Greige"))).unwrap();
        assert_eq!(wizard.selection().color.custom_text(), "");
        assert_eq!(wizard.selection().color.preset().map(|c| c.name.as_str()), Some("Greige"));

        wizard.edit_custom_color("Tricorn Black");
        assert_eq!(wizard.selection().color.preset(), None);
        assert_eq!(wizard.selection().color.custom_text(), "Tricorn Black");

        wizard.edit_custom_color("");
        assert_eq!(wizard.selection().color, ColorChoice::Unset);
    }

    #[test]
    fn blank_custom_text_keeps_preset() {
        let mut wizard = uploaded().into_inner();
        let request = wizard.begin_generation(Trigger::Preset(preset("Slate Blue"))).unwrap();
        wizard
            .finish_generation(request, Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                data: Bytes::from_static(b"png"),
            }))
            .unwrap();

        wizard.edit_custom_color("   ");

        assert_eq!(wizard.selection().color.preset().map(|c| c.hex.as_str()), Some("#5B7C99"));
    }

    #[tokio::test]
    async fn explicit_preset_overrides_typed_custom_color() {
        let service = FakeService::new();
        let wizard = uploaded();
        wizard.lock().await.edit_custom_color("Hale Navy");

        run_generation(&wizard, &service, Trigger::Preset(preset("Sage Green")))
            .await
            .unwrap();

        let instruction = service.last_instruction();
        assert!(instruction.contains("Sage Green (approximate hex: #8DA399)"));
        assert!(!instruction.contains("Hale Navy"));
    }

    #[tokio::test]
    async fn apply_custom_look_uses_typed_color_and_held_hardware() {
        let service = FakeService::new();
        let wizard = uploaded();

        run_generation(&wizard, &service, Trigger::Hardware(Hardware::MatteBlackHandles))
            .await
            .unwrap();
        {
            let mut wizard = wizard.lock().await;
            wizard.edit_custom_color("Hale Navy");
            wizard.select_sheen(Sheen::Satin);
            wizard.edit_tweak("leave the island wood");
        }
        run_generation(&wizard, &service, Trigger::ApplyCustomLook)
            .await
            .unwrap();

        let instruction = service.last_instruction();
        assert!(instruction.contains("Paint the kitchen cabinets Hale Navy."));
        assert!(instruction.contains("Apply a Satin finish"));
        assert!(instruction.contains("with Matte Black Handles."));
        assert!(instruction.contains("\"leave the island wood\""));
    }

    #[tokio::test]
    async fn hardware_only_change_keeps_color() {
        let service = FakeService::new();
        let wizard = uploaded();

        run_generation(&wizard, &service, Trigger::Hardware(Hardware::PolishedChromeKnobs))
            .await
            .unwrap();

        let instruction = service.last_instruction();
        assert!(instruction.contains("Keep the existing cabinet color."));
        assert!(instruction.contains("Polished Chrome Knobs"));
        assert_eq!(
            wizard.lock().await.selection().hardware,
            Hardware::PolishedChromeKnobs
        );
    }

    #[tokio::test]
    async fn failed_generation_keeps_previous_artifact() {
        let service = FakeService::new();
        let wizard = uploaded();
        run_generation(&wizard, &service, Trigger::Preset(preset("Pure White")))
            .await
            .unwrap();
        let previous = wizard.lock().await.artifact().cloned().unwrap();

        service.set_outcome(Outcome::ServiceFailure);
        let err = run_generation(&wizard, &service, Trigger::Preset(preset("Classic Navy")))
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::Service(_)));
        let wizard = wizard.lock().await;
        assert_eq!(wizard.state(), ProcessingState::Idle);
        assert_eq!(wizard.artifact(), Some(&previous));
        assert_eq!(wizard.error(), Some(GENERATION_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn success_replaces_artifact_and_clears_error() {
        let service = FakeService::new();
        let wizard = uploaded();
        let _ = run_generation(&wizard, &service, Trigger::ApplyTweak).await;

        run_generation(&wizard, &service, Trigger::Preset(preset("Greige")))
            .await
            .unwrap();
        run_generation(&wizard, &service, Trigger::Hardware(Hardware::FingerPulls))
            .await
            .unwrap();

        let wizard = wizard.lock().await;
        let artifact = wizard.artifact().unwrap();
        assert_eq!(wizard.state(), ProcessingState::Complete);
        assert_eq!(wizard.error(), None);
        assert_eq!(artifact.image.data, Bytes::from_static(b"render-1"));
        assert!(artifact.prompt_used.contains("Greige"));
        assert!(artifact.prompt_used.contains("Finger Pulls / Handleless"));
    }

    #[tokio::test]
    async fn reset_restores_initial_state() {
        let service = FakeService::new();
        let wizard = uploaded();
        run_generation(&wizard, &service, Trigger::Preset(preset("Matte Black")))
            .await
            .unwrap();
        let fresh = Wizard::new(credentials()).view();

        let mut wizard = wizard.lock().await;
        wizard.edit_tweak("brass toe kick");
        wizard.reset();

        assert_eq!(wizard.view(), fresh);
        assert!(wizard.artifact().is_none());
        assert!(wizard.analysis().is_none());
    }

    #[test]
    fn busy_states_reject_new_requests() {
        let mut wizard = uploaded().into_inner();
        let request = wizard.begin_generation(Trigger::OriginalFinish).unwrap();

        assert!(matches!(
            wizard.begin_generation(Trigger::Preset(preset("Greige"))),
            Err(CabinetError::Busy(ProcessingState::Generating))
        ));
        assert!(matches!(
            wizard.begin_upload("image/png"),
            Err(CabinetError::Busy(_))
        ));

        wizard
            .finish_generation(request, Err(CabinetError::Service("timeout".to_string())))
            .unwrap_err();
        let epoch = wizard.begin_upload("image/png").unwrap();
        assert!(matches!(
            wizard.begin_generation(Trigger::OriginalFinish),
            Err(CabinetError::Busy(ProcessingState::Analyzing))
        ));
        wizard.finish_encoding(epoch, Ok(kitchen())).unwrap();
    }

    #[test]
    fn generation_requires_an_image() {
        let mut wizard = Wizard::new(credentials());
        assert!(matches!(
            wizard.begin_generation(Trigger::OriginalFinish),
            Err(CabinetError::NoImage)
        ));
        assert_eq!(wizard.state(), ProcessingState::Idle);
    }

    #[test]
    fn new_upload_during_analysis_supersedes_old_one() {
        let mut wizard = Wizard::new(credentials());
        let first = wizard.begin_upload("image/jpeg").unwrap();
        wizard.finish_encoding(first, Ok(kitchen())).unwrap();

        let second = wizard.begin_upload("image/png").unwrap();
        wizard
            .finish_analysis(first, Ok(AnalysisResult {
                reasoning: "stale".to_string(),
                suggested_colors: Vec::new(),
            }))
            .unwrap();
        assert_eq!(wizard.state(), ProcessingState::Analyzing);
        assert!(wizard.analysis().is_none());

        wizard.finish_encoding(second, Ok(kitchen())).unwrap();
        wizard.finish_analysis(second, Ok(analysis())).unwrap();
        assert_eq!(wizard.state(), ProcessingState::Idle);
        let analysis = wizard.analysis().unwrap();
        assert_eq!(analysis.reasoning, "Cool slate floors suit muted tones.");
        assert!(analysis.suggested_colors.iter().all(|color| color.is_ai));
    }

    #[test]
    fn reset_during_generation_drops_late_result() {
        let mut wizard = uploaded().into_inner();
        let request = wizard.begin_generation(Trigger::Preset(preset("Greige"))).unwrap();

        wizard.reset();
        wizard
            .finish_generation(request, Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                data: Bytes::from_static(b"late"),
            }))
            .unwrap();

        assert_eq!(wizard.state(), ProcessingState::Idle);
        assert!(wizard.artifact().is_none());
    }

    #[test]
    fn upload_resets_selection() {
        let mut wizard = uploaded().into_inner();
        wizard.edit_custom_color("Hale Navy");
        wizard.select_sheen(Sheen::HighGloss);

        wizard.begin_upload("image/webp").unwrap();

        assert_eq!(wizard.selection(), &SelectionSnapshot::default());
        assert_eq!(wizard.state(), ProcessingState::Analyzing);
        assert!(!wizard.view().has_image);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected_before_any_call() {
        let service = FakeService::new();
        let wizard = uploaded();

        let err = run_upload(
            &wizard,
            &ImageEncoder::new(2048),
            &service,
            b"%PDF".to_vec(),
            "application/pdf",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CabinetError::InvalidInput(_)));
        assert_eq!(service.analyze_calls.load(Ordering::SeqCst), 0);
        let wizard = wizard.lock().await;
        assert_eq!(wizard.error(), Some(INVALID_IMAGE_MESSAGE));
        assert_eq!(wizard.state(), ProcessingState::Idle);
        assert!(wizard.analysis().is_some());
    }

    #[tokio::test]
    async fn upload_runs_encoding_and_analysis() {
        use image::{DynamicImage, ImageFormat, RgbImage};

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let service = FakeService::new();
        let wizard = Mutex::new(Wizard::new(credentials()));

        run_upload(&wizard, &ImageEncoder::new(2048), &service, png, "image/png")
            .await
            .unwrap();

        let wizard = wizard.lock().await;
        assert_eq!(service.analyze_calls.load(Ordering::SeqCst), 1);
        assert_eq!(wizard.state(), ProcessingState::Idle);
        assert!(wizard.view().has_image);
        assert_eq!(wizard.analysis().unwrap().suggested_colors.len(), 4);
    }

    #[tokio::test]
    async fn failed_analysis_keeps_uploaded_image() {
        let service = FakeService::new();
        service.set_outcome(Outcome::ServiceFailure);
        let mut inner = Wizard::new(credentials());
        let epoch = inner.begin_upload("image/jpeg").unwrap();
        inner.finish_encoding(epoch, Ok(kitchen())).unwrap();
        let analysis = service.analyze(&kitchen()).await;

        inner.finish_analysis(epoch, analysis).unwrap_err();

        assert_eq!(inner.state(), ProcessingState::Idle);
        assert!(inner.view().has_image);
        assert_eq!(
            inner.error(),
            Some("Failed to analyze the image. Please try a different photo.")
        );
    }

    #[tokio::test]
    async fn permission_denied_demotes_credentials() {
        let service = FakeService::new();
        let wizard = uploaded();
        service.set_outcome(Outcome::PermissionDenied);

        let err = run_generation(&wizard, &service, Trigger::Preset(preset("Greige")))
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::Authorization(_)));
        {
            let wizard = wizard.lock().await;
            assert_eq!(wizard.error(), Some(INTERACTIVE_AUTH_MESSAGE));
            assert!(!wizard.view().credentials.has_key);
        }

        let err = run_generation(&wizard, &service, Trigger::OriginalFinish)
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::CredentialsRequired));
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_preset_name_is_rejected_without_a_call() {
        let service = FakeService::new();
        let wizard = uploaded();
        let blank = ColorOption {
            name: "  ".to_string(),
            hex: String::new(),
            description: None,
            manufacturer: None,
            code: None,
            is_ai: false,
        };

        let err = run_generation(&wizard, &service, Trigger::Preset(blank))
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::Validation(_)));
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);
        let wizard = wizard.lock().await;
        assert_eq!(wizard.state(), ProcessingState::Idle);
        assert_eq!(wizard.error(), Some(EMPTY_SELECTION_MESSAGE));
        assert_eq!(wizard.selection().color, ColorChoice::Unset);
    }

    #[tokio::test]
    async fn rejected_hardware_trigger_keeps_held_hardware() {
        let service = FakeService::new();
        let wizard = uploaded();
        run_generation(&wizard, &service, Trigger::Hardware(Hardware::FingerPulls))
            .await
            .unwrap();

        let err = run_generation(&wizard, &service, Trigger::Hardware(Hardware::KeepExisting))
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::Validation(_)));
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
        let wizard = wizard.lock().await;
        assert_eq!(wizard.selection().hardware, Hardware::FingerPulls);
        assert_eq!(wizard.state(), ProcessingState::Idle);
    }

    #[tokio::test]
    async fn hosted_key_survives_permission_denied() {
        let service = FakeService::new();
        let credentials = Arc::new(CredentialContext::new(Some("key".to_string()), false));
        let mut inner = Wizard::new(credentials.clone());
        let epoch = inner.begin_upload("image/jpeg").unwrap();
        inner.finish_encoding(epoch, Ok(kitchen())).unwrap();
        inner.finish_analysis(epoch, Ok(analysis())).unwrap();
        let wizard = Mutex::new(inner);
        service.set_outcome(Outcome::PermissionDenied);

        let err = run_generation(&wizard, &service, Trigger::Preset(preset("Greige")))
            .await
            .unwrap_err();

        assert!(matches!(err, CabinetError::Authorization(_)));
        assert_eq!(wizard.lock().await.error(), Some(HOSTED_AUTH_MESSAGE));
        assert!(credentials.has_valid_credential());

        service.set_outcome(Outcome::Succeed);
        run_generation(&wizard, &service, Trigger::OriginalFinish)
            .await
            .unwrap();
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 2);
    }
}
